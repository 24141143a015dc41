//! Union-find over occupied cells, tracking one liberty count per group.
//!
//! Each group is keyed by its root [`Position`]. Liberty counts are kept as
//! adjacency counts: one per (stone, empty neighbour) pair. Placing a stone
//! next to a friendly group and merging subtracts `2 * shared` (the new stone
//! counted the friendly stones as liberties and the group counted the new
//! cell), and emptying a cell adds one per adjacent friendly stone. Under
//! these rules a count reaches zero exactly when the group has no empty
//! neighbour, which is all capture and suicide detection need.

use std::collections::HashMap;

use crate::board::Position;

/// A connected group of same-coloured stones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub root: Position,
    pub rank: u32,
    pub liberties: i32,
}

impl Group {
    fn new(root: Position, liberties: i32) -> Self {
        Self {
            root,
            rank: 0,
            liberties,
        }
    }
}

/// Disjoint-set forest over stone positions.
#[derive(Clone, Debug, Default)]
pub struct UnionFind {
    /// Parent of every occupied position (a root is its own parent).
    parents: HashMap<Position, Position>,
    /// Group record per root.
    groups: HashMap<Position, Group>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly placed stone as a singleton group.
    pub fn add_stone(&mut self, pos: Position, liberties: i32) {
        self.parents.insert(pos, pos);
        self.groups.insert(pos, Group::new(pos, liberties));
    }

    /// Root of the group containing `pos`, compressing the path on the way.
    ///
    /// # Panics
    /// If `pos` was never added (or was already removed).
    pub fn find(&mut self, pos: Position) -> Position {
        let root = self.root_of(pos).unwrap_or_else(|| {
            panic!(
                "UnionFind::find: no stone at ({}, {})",
                pos.row, pos.col
            )
        });
        let mut cur = pos;
        while cur != root {
            let next = self.parents[&cur];
            self.parents.insert(cur, root);
            cur = next;
        }
        root
    }

    /// Root of the group containing `pos` without mutating the forest.
    pub fn root_of(&self, pos: Position) -> Option<Position> {
        let mut cur = pos;
        loop {
            let parent = *self.parents.get(&cur)?;
            if parent == cur {
                return Some(cur);
            }
            cur = parent;
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.parents.contains_key(&pos)
    }

    pub fn group(&self, root: Position) -> Option<&Group> {
        self.groups.get(&root)
    }

    /// Liberty count of the group rooted at `root`.
    ///
    /// # Panics
    /// If `root` is not the root of a live group.
    pub fn liberties(&self, root: Position) -> i32 {
        self.group_ref(root).liberties
    }

    /// Adjust the liberty count of the group rooted at `root` by `delta`.
    pub fn add_liberties(&mut self, root: Position, delta: i32) {
        self.group_mut(root).liberties += delta;
    }

    /// Merge the groups rooted at `a` and `b` by rank and return the new root.
    ///
    /// The loser's liberties move into the winner minus `2 * shared`, where
    /// `shared` is the number of boundary adjacencies between the newly placed
    /// stone and the other group.
    pub fn union(&mut self, a: Position, b: Position, shared: i32) -> Position {
        let rank_a = self.group_ref(a).rank;
        let rank_b = self.group_ref(b).rank;
        let (winner, loser) = if rank_a < rank_b { (b, a) } else { (a, b) };

        let loser_group = self
            .groups
            .remove(&loser)
            .unwrap_or_else(|| panic!("UnionFind::union: {loser:?} is not a root"));
        self.parents.insert(loser, winner);

        let group = self.group_mut(winner);
        group.liberties += loser_group.liberties - 2 * shared;
        if rank_a == rank_b {
            group.rank += 1;
        }
        winner
    }

    /// Drop the bookkeeping entry of a single stone.
    ///
    /// # Panics
    /// If `pos` was never added.
    pub fn remove_stone(&mut self, pos: Position) {
        if self.parents.remove(&pos).is_none() {
            panic!(
                "UnionFind::remove_stone: no stone at ({}, {})",
                pos.row, pos.col
            );
        }
    }

    /// Drop the group record rooted at `root`.
    pub fn remove_group(&mut self, root: Position) {
        self.groups.remove(&root);
    }

    /// Number of live groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn group_ref(&self, root: Position) -> &Group {
        self.groups
            .get(&root)
            .unwrap_or_else(|| panic!("UnionFind: no group rooted at {root:?}"))
    }

    fn group_mut(&mut self, root: Position) -> &mut Group {
        self.groups
            .get_mut(&root)
            .unwrap_or_else(|| panic!("UnionFind: no group rooted at {root:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn test_add_and_find_singleton() {
        let mut uf = UnionFind::new();
        uf.add_stone(p(1, 1), 4);
        assert_eq!(uf.find(p(1, 1)), p(1, 1));
        assert_eq!(uf.liberties(p(1, 1)), 4);
        assert_eq!(uf.group_count(), 1);
    }

    #[test]
    #[should_panic(expected = "no stone")]
    fn test_find_missing_panics() {
        let mut uf = UnionFind::new();
        uf.find(p(0, 0));
    }

    #[test]
    fn test_union_transfers_liberties() {
        // Two horizontally adjacent stones in open space: (1,1) then (1,2).
        // (1,1) alone: 4 empty neighbours. (1,2) counts 3 empty + 1 friendly.
        let mut uf = UnionFind::new();
        uf.add_stone(p(1, 1), 4);
        uf.add_stone(p(1, 2), 4);
        let root = uf.union(p(1, 1), p(1, 2), 1);
        assert_eq!(root, p(1, 1));
        // 3 + 3 empty adjacencies
        assert_eq!(uf.liberties(root), 6);
        assert_eq!(uf.find(p(1, 2)), p(1, 1));
        assert_eq!(uf.group_count(), 1);
        assert_eq!(uf.group(root).map(|g| g.rank), Some(1));
    }

    #[test]
    fn test_union_by_rank_keeps_higher_rank_root() {
        let mut uf = UnionFind::new();
        uf.add_stone(p(0, 0), 2);
        uf.add_stone(p(0, 1), 3);
        let big = uf.union(p(0, 0), p(0, 1), 1);
        uf.add_stone(p(0, 2), 3);
        // The singleton is passed first but the ranked group wins.
        let root = uf.union(p(0, 2), big, 1);
        assert_eq!(root, big);
        assert_eq!(uf.find(p(0, 2)), big);
    }

    #[test]
    fn test_path_compression_and_root_of() {
        let mut uf = UnionFind::new();
        uf.add_stone(p(0, 0), 2);
        uf.add_stone(p(0, 1), 3);
        let r1 = uf.union(p(0, 0), p(0, 1), 1);
        uf.add_stone(p(1, 0), 3);
        uf.add_stone(p(1, 1), 4);
        let r2 = uf.union(p(1, 0), p(1, 1), 1);
        let root = uf.union(r1, r2, 2);
        for pos in [p(0, 0), p(0, 1), p(1, 0), p(1, 1)] {
            assert_eq!(uf.root_of(pos), Some(root));
            assert_eq!(uf.find(pos), root);
        }
        assert_eq!(uf.root_of(p(3, 3)), None);
    }

    #[test]
    fn test_remove_stone_and_group() {
        let mut uf = UnionFind::new();
        uf.add_stone(p(2, 2), 4);
        uf.remove_stone(p(2, 2));
        uf.remove_group(p(2, 2));
        assert!(!uf.contains(p(2, 2)));
        assert_eq!(uf.group_count(), 0);
    }

    #[test]
    #[should_panic(expected = "remove_stone")]
    fn test_remove_missing_stone_panics() {
        let mut uf = UnionFind::new();
        uf.remove_stone(p(0, 0));
    }
}
