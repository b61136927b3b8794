// Configuration error types

use crate::error::ErrorCode;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 5001-5002
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// A tunable is outside its meaningful range
    pub const INVALID_VALUE: i32 = 5001;

    /// Config file could not be read or written
    pub const IO: i32 = 5002;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Field value rejected by validation
    InvalidValue { field: &'static str, reason: String },

    /// Filesystem failure
    Io { reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidValue { .. } => ConfigErrorCodes::INVALID_VALUE,
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                format!("Invalid config value for {}: {}", field, reason)
            }
            ConfigError::Io { reason } => format!("Config I/O failed: {}", reason),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_codes() {
        let err = ConfigError::InvalidValue {
            field: "reps.up_fraction",
            reason: "must be below down_fraction".to_string(),
        };
        assert_eq!(err.code(), ConfigErrorCodes::INVALID_VALUE);
        assert!(err.message().contains("reps.up_fraction"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ConfigError = io_err.into();
        assert_eq!(err.code(), ConfigErrorCodes::IO);
        assert!(err.message().contains("missing"));
    }
}
