//! Log severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a log entry, most severe first.
///
/// The ordinal doubles as the filter: a call is emitted when its ordinal is
/// less than or equal to the configured level's ordinal.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[serde(alias = "error")]
    Error = 0,
    #[serde(alias = "warn")]
    Warn = 1,
    #[serde(alias = "info")]
    Info = 2,
    #[serde(alias = "debug")]
    Debug = 3,
}

impl LogLevel {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Whether a call at `level` passes a logger configured with `self`.
    pub fn allows(self, level: LogLevel) -> bool {
        level.ordinal() <= self.ordinal()
    }

    /// Only WARN and ERROR entries ever leave the process.
    pub fn is_remote_eligible(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Warn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtering() {
        assert!(LogLevel::Warn.allows(LogLevel::Error));
        assert!(LogLevel::Warn.allows(LogLevel::Warn));
        assert!(!LogLevel::Warn.allows(LogLevel::Info));
        assert!(!LogLevel::Warn.allows(LogLevel::Debug));
        assert!(LogLevel::Debug.allows(LogLevel::Debug));
        assert!(!LogLevel::Error.allows(LogLevel::Warn));
    }

    #[test]
    fn test_remote_eligibility() {
        assert!(LogLevel::Error.is_remote_eligible());
        assert!(LogLevel::Warn.is_remote_eligible());
        assert!(!LogLevel::Info.is_remote_eligible());
        assert!(!LogLevel::Debug.is_remote_eligible());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"WARN\"");
        let parsed: LogLevel = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(parsed, LogLevel::Debug);
        assert_eq!("Warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    }
}
