//! Search tree nodes and the arena that owns them.
//!
//! Nodes live in a [`Tree`] and refer to each other by [`NodeId`]: a child
//! slot holds the id of the expanded child, and every node but the root keeps
//! a [`ParentLink`] back to the slot it was expanded from.
//!
//! Per-action statistics sit behind one mutex per node. The "claimed" flags
//! that guard expansion are plain atomics so the hot path can test them
//! without taking the lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

/// Index of a node in its [`Tree`].
pub type NodeId = usize;

/// Id of the root node of every tree.
pub const ROOT: NodeId = 0;

/// Where a node hangs in the tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParentLink {
    pub node: NodeId,
    /// Slot of the parent's action that produced this node
    pub action_idx: usize,
}

/// Selection policy of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// `Q + c * sqrt(ln(total) / N)`, unvisited actions first.
    Uct,
    /// `Q + c * P * sqrt(total) / (1 + N)`.
    Puct { priors: Vec<f64> },
}

#[derive(Debug)]
struct Stats {
    total_visits: u32,
    /// Visit count per action
    n: Vec<u32>,
    /// Mean value per action, from the point of view of the player to move
    q: Vec<f64>,
}

/// Copy of a node's statistics taken under its lock.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSnapshot {
    pub total_visits: u32,
    pub n: Vec<u32>,
    pub q: Vec<f64>,
}

#[derive(Debug)]
pub struct SearchNode {
    parent: Option<ParentLink>,
    selection: Selection,
    stats: Mutex<Stats>,
    claimed: Vec<AtomicBool>,
    children: Vec<OnceLock<NodeId>>,
}

impl SearchNode {
    /// Node with UCT selection over `num_actions` actions.
    pub fn uct(num_actions: usize, parent: Option<ParentLink>) -> Self {
        Self::with_selection(num_actions, parent, Selection::Uct)
    }

    /// Node with PUCT selection.
    ///
    /// Priors of the wrong length, or that do not sum to a positive value,
    /// are replaced by a uniform distribution.
    pub fn puct(num_actions: usize, parent: Option<ParentLink>, priors: Vec<f64>) -> Self {
        let priors = normalize_priors(priors, num_actions);
        Self::with_selection(num_actions, parent, Selection::Puct { priors })
    }

    fn with_selection(num_actions: usize, parent: Option<ParentLink>, selection: Selection) -> Self {
        Self {
            parent,
            selection,
            stats: Mutex::new(Stats {
                total_visits: 0,
                n: vec![0; num_actions],
                q: vec![0.0; num_actions],
            }),
            claimed: (0..num_actions).map(|_| AtomicBool::new(false)).collect(),
            children: (0..num_actions).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn parent(&self) -> Option<ParentLink> {
        self.parent
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn num_actions(&self) -> usize {
        self.children.len()
    }

    fn stats(&self) -> MutexGuard<'_, Stats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pick the action with the best selection score and apply a virtual
    /// loss to it. Ties go to the lowest index.
    pub fn select_best_child_index(&self, exploration: f64) -> usize {
        let mut stats = self.stats();
        let total = stats.total_visits as f64;

        let mut best_idx = 0;
        let mut best_value = f64::NEG_INFINITY;
        for idx in 0..stats.n.len() {
            let visits = stats.n[idx] as f64;
            let bonus = match &self.selection {
                Selection::Uct if stats.n[idx] == 0 => f64::INFINITY,
                Selection::Uct => exploration * (total.ln() / visits).sqrt(),
                Selection::Puct { priors } => {
                    exploration * priors[idx] * total.sqrt() / (1.0 + visits)
                }
            };
            let value = stats.q[idx] + bonus;
            if value > best_value {
                best_value = value;
                best_idx = idx;
            }
        }

        // Virtual loss: count the visit now, as if it had been lost.
        stats.total_visits += 1;
        stats.n[best_idx] += 1;
        let n = stats.n[best_idx] as f64;
        stats.q[best_idx] += (-1.0 - stats.q[best_idx]) / n;
        best_idx
    }

    /// Replace the virtual loss recorded for `action_idx` with `value`.
    pub fn update_stats(&self, value: f64, action_idx: usize) {
        let mut stats = self.stats();
        let n = stats.n[action_idx] as f64;
        stats.q[action_idx] += (value + 1.0) / n;
    }

    /// Withdraw a virtual loss whose result will never arrive.
    pub fn revert_virtual_loss(&self, action_idx: usize) {
        let mut stats = self.stats();
        let n = stats.n[action_idx];
        if n == 0 {
            return;
        }
        stats.q[action_idx] = if n == 1 {
            0.0
        } else {
            (stats.q[action_idx] * n as f64 + 1.0) / (n - 1) as f64
        };
        stats.n[action_idx] = n - 1;
        stats.total_visits -= 1;
    }

    /// Claim the right to expand `action_idx`. Exactly one caller wins.
    pub fn try_claim(&self, action_idx: usize) -> bool {
        self.claimed[action_idx]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give a claim back without expanding.
    pub fn release_claim(&self, action_idx: usize) {
        self.claimed[action_idx].store(false, Ordering::Release);
    }

    pub fn is_claimed(&self, action_idx: usize) -> bool {
        self.claimed[action_idx].load(Ordering::Acquire)
    }

    pub fn child(&self, action_idx: usize) -> Option<NodeId> {
        self.children[action_idx].get().copied()
    }

    /// Install the expanded child of `action_idx`.
    ///
    /// # Panics
    /// If the slot already holds a child.
    pub fn set_child(&self, action_idx: usize, child: NodeId) {
        if self.children[action_idx].set(child).is_err() {
            panic!("SearchNode::set_child: slot {action_idx} expanded twice");
        }
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let stats = self.stats();
        NodeSnapshot {
            total_visits: stats.total_visits,
            n: stats.n.clone(),
            q: stats.q.clone(),
        }
    }
}

fn normalize_priors(priors: Vec<f64>, num_actions: usize) -> Vec<f64> {
    let sum: f64 = priors.iter().sum();
    let valid = priors.len() == num_actions
        && sum > 0.0
        && sum.is_finite()
        && priors.iter().all(|&p| p >= 0.0);
    if valid {
        priors.into_iter().map(|p| p / sum).collect()
    } else {
        uniform_priors(num_actions)
    }
}

/// Uniform distribution over `num_actions` actions.
pub fn uniform_priors(num_actions: usize) -> Vec<f64> {
    vec![1.0 / num_actions.max(1) as f64; num_actions]
}

/// Append-only arena of search nodes.
#[derive(Debug)]
pub struct Tree {
    nodes: RwLock<Vec<Arc<SearchNode>>>,
}

impl Tree {
    pub fn new(root: SearchNode) -> Self {
        Self {
            nodes: RwLock::new(vec![Arc::new(root)]),
        }
    }

    /// # Panics
    /// If `id` was not handed out by this tree.
    pub fn get(&self, id: NodeId) -> Arc<SearchNode> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&nodes[id])
    }

    pub fn root(&self) -> Arc<SearchNode> {
        self.get(ROOT)
    }

    pub fn insert(&self, node: SearchNode) -> NodeId {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        nodes.push(Arc::new(node));
        nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: f64 = std::f64::consts::SQRT_2;

    #[test]
    fn test_uct_prefers_unvisited_in_order() {
        let node = SearchNode::uct(2, None);

        assert_eq!(node.select_best_child_index(C), 0);
        let s = node.snapshot();
        assert_eq!(s.total_visits, 1);
        assert_eq!(s.n, vec![1, 0]);
        assert_eq!(s.q, vec![-1.0, 0.0]);

        assert_eq!(node.select_best_child_index(C), 1);
        let s = node.snapshot();
        assert_eq!(s.total_visits, 2);
        assert_eq!(s.n, vec![1, 1]);
        assert_eq!(s.q, vec![-1.0, -1.0]);
    }

    #[test]
    fn test_update_stats_replaces_virtual_loss() {
        let node = SearchNode::uct(2, None);
        let idx = node.select_best_child_index(C);
        node.update_stats(1.0, idx);
        assert_eq!(node.snapshot().q[idx], 1.0);

        // Second visit to the same action, which then draws.
        node.select_best_child_index(C);
        let idx = node.select_best_child_index(C);
        assert_eq!(idx, 0);
        let s = node.snapshot();
        assert_eq!(s.n[0], 2);
        assert_eq!(s.q[0], 0.0);
        node.update_stats(0.0, 0);
        assert_eq!(node.snapshot().q[0], 0.5);
    }

    #[test]
    fn test_revert_virtual_loss() {
        let node = SearchNode::uct(3, None);
        let first = node.select_best_child_index(C);
        node.update_stats(0.5, first);

        // Pending second visit on the same slot, then withdrawn.
        node.select_best_child_index(C);
        node.select_best_child_index(C);
        let again = node.select_best_child_index(C);
        assert_eq!(again, first);
        node.revert_virtual_loss(again);

        let s = node.snapshot();
        assert_eq!(s.n[first], 1);
        assert!((s.q[first] - 0.5).abs() < 1e-12);
        assert_eq!(s.total_visits, 3);

        node.revert_virtual_loss(1);
        let s = node.snapshot();
        assert_eq!(s.n[1], 0);
        assert_eq!(s.q[1], 0.0);
    }

    #[test]
    fn test_puct_follows_priors() {
        let node = SearchNode::puct(3, None, vec![0.1, 0.7, 0.2]);
        // No visits yet: every score is 0, lowest index wins.
        assert_eq!(node.select_best_child_index(1.0), 0);
        // Now sqrt(total) = 1 and the strongest prior dominates.
        assert_eq!(node.select_best_child_index(1.0), 1);
    }

    #[test]
    fn test_puct_bad_priors_become_uniform() {
        let node = SearchNode::puct(4, None, vec![]);
        assert_eq!(
            node.selection(),
            &Selection::Puct {
                priors: vec![0.25; 4]
            }
        );
        let node = SearchNode::puct(2, None, vec![2.0, 6.0]);
        assert_eq!(
            node.selection(),
            &Selection::Puct {
                priors: vec![0.25, 0.75]
            }
        );
    }

    #[test]
    fn test_claim_exactly_once() {
        let node = SearchNode::uct(2, None);
        assert!(node.try_claim(1));
        assert!(!node.try_claim(1));
        assert!(node.is_claimed(1));
        node.release_claim(1);
        assert!(node.try_claim(1));
    }

    #[test]
    fn test_claim_across_threads() {
        let node = SearchNode::uct(1, None);
        let wins = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| node.try_claim(0))).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|&won| won)
                .count()
        });
        assert_eq!(wins, 1);
    }

    #[test]
    fn test_tree_links() {
        let tree = Tree::new(SearchNode::uct(3, None));
        let link = ParentLink {
            node: ROOT,
            action_idx: 2,
        };
        let child = tree.insert(SearchNode::uct(5, Some(link)));
        tree.root().set_child(2, child);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root().child(2), Some(child));
        assert_eq!(tree.root().child(0), None);
        assert_eq!(tree.get(child).parent(), Some(link));
        assert_eq!(tree.get(child).num_actions(), 5);
    }

    #[test]
    #[should_panic(expected = "expanded twice")]
    fn test_double_expansion_panics() {
        let node = SearchNode::uct(1, None);
        node.set_child(0, 1);
        node.set_child(0, 2);
    }
}
