use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a network device.
#[derive(Debug, Error)]
pub enum Error {
    /// Could not establish the session
    #[error("failed to connect to {address}: {message}")]
    ConnectFailed {
        /// Device address
        address: String,
        /// Details from the transport
        message: String,
    },

    /// Session was used after `close()`
    #[error("session to {0} is closed")]
    Closed(String),

    /// A read (show) command failed
    #[error("command `{command}` failed on {address}: {stderr}")]
    CommandFailed {
        /// Device address
        address: String,
        /// The command that was sent
        command: String,
        /// Error output from the transport or device
        stderr: String,
    },

    /// A configuration push was rejected or the transport failed mid-push
    #[error("configuration push to {address} failed: {message}")]
    PushFailed {
        /// Device address
        address: String,
        /// What went wrong
        message: String,
    },

    /// A configuration push did not finish within its bound
    #[error("configuration push to {address} timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Device address
        address: String,
        /// The bound that was exceeded
        timeout: Duration,
    },

    /// A required external program is missing
    #[error("`{0}` not found in PATH")]
    ToolNotFound(&'static str),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the device may have applied part of a configuration batch.
    pub fn may_be_partial(&self) -> bool {
        matches!(self, Error::PushFailed { .. } | Error::Timeout { .. })
    }

    /// Returns true if this error happened before any configuration was sent.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectFailed { .. } | Error::Closed(_) | Error::ToolNotFound(_)
        )
    }

    /// Classify device output from a configuration push.
    ///
    /// IOS-style CLIs report rejected lines with a leading `%` marker rather
    /// than a non-zero exit status. Returns `None` when no rejection is found.
    pub fn from_push_output(address: &str, output: &str) -> Option<Self> {
        output
            .lines()
            .map(str::trim)
            .find(|line| {
                line.starts_with("% Invalid")
                    || line.starts_with("% Incomplete")
                    || line.starts_with("% Ambiguous")
                    || line.starts_with("% Unknown")
            })
            .map(|line| Error::PushFailed {
                address: address.to_string(),
                message: line.to_string(),
            })
    }
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let timeout = Error::Timeout {
            address: "10.0.0.1".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert!(timeout.may_be_partial());
        assert!(!timeout.is_connection_error());

        let closed = Error::Closed("10.0.0.1".to_string());
        assert!(closed.is_connection_error());
        assert!(!closed.may_be_partial());
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::Timeout {
            address: "10.0.0.1".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "configuration push to 10.0.0.1 timed out after 60s"
        );
    }

    #[test]
    fn test_from_push_output_detects_rejection() {
        let output = "router(config)#interface Gi0/0/1\n\
                      router(config-if)# servce instance 5 ethernet\n\
                      % Invalid input detected at '^' marker.\n";
        let err = Error::from_push_output("10.0.0.1", output).unwrap();
        assert!(matches!(err, Error::PushFailed { .. }));
        assert!(err.to_string().contains("% Invalid input"));
    }

    #[test]
    fn test_from_push_output_clean() {
        let output = "router(config)#ip sla 1\nrouter(config-ip-sla)#end\n";
        assert!(Error::from_push_output("10.0.0.1", output).is_none());
    }
}
