use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle, opt_format};

/// Start logging to stderr; stdout belongs to the text protocol.
///
/// `RUST_LOG` wins over `level` when set. Keep the handle alive for as long
/// as logging is wanted.
pub fn setup_logging(level: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(level)?
        .log_to_stderr()
        .format(opt_format)
        .start()
}
