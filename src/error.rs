//! Error types for oc-client operations.

use thiserror::Error;

/// Main error type for oc-client operations
#[derive(Error, Debug)]
pub enum OcError {
    /// The program could not be started (not found, not executable, ...)
    #[error("failed to launch '{0}': {1}")]
    Spawn(String, #[source] std::io::Error),

    /// The program ran but exited unsuccessfully
    #[error("'{command}' exited with {}: {}", exit_label(.code), .stderr.trim())]
    Execution {
        command: String,
        /// `None` when the process was terminated by a signal
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Reading the program's output or waiting for it failed
    #[error("I/O error while running '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    /// The program did not finish within the configured timeout and was killed
    #[error("'{0}' timed out after {1:?}")]
    Timeout(String, std::time::Duration),

    /// Captured output was not valid JSON
    #[error("invalid JSON output: {0}")]
    Parse(#[source] serde_json::Error),

    /// Invalid client configuration
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A config file could not be read or parsed
    #[error("failed to load config file '{0}': {1}")]
    ConfigRead(String, String),

    /// A credentials script exported a value that is not valid UTF-8
    #[error("credentials script exported a {0} that is not valid UTF-8")]
    NonUtf8Credential(&'static str),

    /// The OS random source failed while generating a delimiter
    #[error("failed to generate random delimiter: {0}")]
    Entropy(String),
}

impl OcError {
    /// True for the execution error family: the process could not be run to a successful exit.
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            OcError::Spawn(..)
                | OcError::Io(..)
                | OcError::Execution { .. }
                | OcError::Timeout(..)
        )
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// Result type alias for oc-client operations
pub type Result<T> = std::result::Result<T, OcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_display() {
        let err = OcError::Execution {
            command: "oc".to_string(),
            code: Some(2),
            stdout: String::new(),
            stderr: "no such resource\n".to_string(),
        };
        assert_eq!(err.to_string(), "'oc' exited with exit code 2: no such resource");
    }

    #[test]
    fn test_execution_killed_by_signal_display() {
        let err = OcError::Execution {
            command: "oc".to_string(),
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "'oc' exited with a signal: ");
    }

    #[test]
    fn test_timeout_display() {
        let err = OcError::Timeout("oc".to_string(), std::time::Duration::from_secs(5));
        assert_eq!(err.to_string(), "'oc' timed out after 5s");
    }

    #[test]
    fn test_non_utf8_credential_display() {
        let err = OcError::NonUtf8Credential("password");
        assert_eq!(
            err.to_string(),
            "credentials script exported a password that is not valid UTF-8"
        );
    }

    #[test]
    fn test_execution_family() {
        let spawn = OcError::Spawn(
            "oc".to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(spawn.is_execution_error());
        assert!(OcError::Timeout("oc".to_string(), std::time::Duration::from_secs(1)).is_execution_error());
        assert!(!OcError::InvalidConfig("x".to_string()).is_execution_error());
        assert!(!OcError::NonUtf8Credential("password").is_execution_error());
    }
}
