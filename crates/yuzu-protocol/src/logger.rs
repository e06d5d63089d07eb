//! Instance-scoped session logging.
//!
//! Each server and client instance carries its own verbosity threshold
//! instead of a process-wide toggle. Emission goes through `tracing`, so the
//! host's subscriber still controls formatting and final filtering.

use tracing::{debug, error, info, warn};

/// Verbosity threshold for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Everything, including per-message traffic.
    Debug,
    /// Lifecycle events (connects, handshakes).
    #[default]
    Info,
    /// Recoverable trouble (reconnects, dropped sends).
    Warn,
    /// Malformed messages, transport failures.
    Error,
    /// Nothing.
    Off,
}

/// A leveled logger owned by one session instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionLogger {
    level: LogLevel,
}

impl SessionLogger {
    /// Create a logger with the given threshold.
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// The configured threshold.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Whether messages at `level` pass the threshold.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level && self.level != LogLevel::Off && level != LogLevel::Off
    }

    /// Log at debug level.
    pub fn debug(&self, msg: &str) {
        if self.enabled(LogLevel::Debug) {
            debug!(target: "yuzu", "{msg}");
        }
    }

    /// Log at info level.
    pub fn info(&self, msg: &str) {
        if self.enabled(LogLevel::Info) {
            info!(target: "yuzu", "{msg}");
        }
    }

    /// Log at warn level.
    pub fn warn(&self, msg: &str) {
        if self.enabled(LogLevel::Warn) {
            warn!(target: "yuzu", "{msg}");
        }
    }

    /// Log at error level.
    pub fn error(&self, msg: &str) {
        if self.enabled(LogLevel::Error) {
            error!(target: "yuzu", "{msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Off);
    }

    #[test]
    fn test_threshold_gating() {
        let logger = SessionLogger::new(LogLevel::Warn);
        assert!(!logger.enabled(LogLevel::Debug));
        assert!(!logger.enabled(LogLevel::Info));
        assert!(logger.enabled(LogLevel::Warn));
        assert!(logger.enabled(LogLevel::Error));
    }

    #[test]
    fn test_off_silences_everything() {
        let logger = SessionLogger::new(LogLevel::Off);
        assert!(!logger.enabled(LogLevel::Debug));
        assert!(!logger.enabled(LogLevel::Error));
        assert!(!logger.enabled(LogLevel::Off));
    }

    #[test]
    fn test_default_is_info() {
        let logger = SessionLogger::default();
        assert_eq!(logger.level(), LogLevel::Info);
        assert!(logger.enabled(LogLevel::Info));
        assert!(!logger.enabled(LogLevel::Debug));
    }
}
