//! Error types for circuit provisioning.
//!
//! Every error here is fatal to the run that hit it. Nothing is retried and
//! nothing is rolled back; the variants exist so the operator can tell which
//! step failed and what state was left behind.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Side;

/// Errors that can occur while provisioning or deprovisioning circuits.
#[derive(Debug, Error)]
pub enum Error {
    /// No free identifier left in the allowed range
    #[error("no free {resource} in range {min}..={max}")]
    AllocationExhausted {
        /// What was being allocated
        resource: &'static str,
        /// Lowest allowed value
        min: u64,
        /// Highest allowed value
        max: u64,
    },

    /// Deprovision found no ledger for a device
    #[error("ledger not found: {} (nothing to remove, or it was already consumed)", .0.display())]
    LedgerNotFound(PathBuf),

    /// A ledger line could not be decoded
    #[error("corrupt ledger {} at line {line}: {message}", path.display())]
    LedgerCorrupt {
        /// Ledger file
        path: PathBuf,
        /// 1-indexed line number
        line: usize,
        /// Decoder message
        message: String,
    },

    /// A template could not be rendered
    #[error("template `{template}`: {message}")]
    Template {
        /// Template name
        template: String,
        /// What went wrong
        message: String,
    },

    /// A configuration push to one side failed
    #[error("push to {side} side ({address}) failed: {source}")]
    Push {
        /// Which end of the circuit
        side: Side,
        /// Device address
        address: String,
        /// Transport or device error
        #[source]
        source: devicekit::Error,
    },

    /// The A side was pushed and recorded but the Z side failed.
    ///
    /// The A side is left provisioned; its ledger holds the removal fragment.
    #[error(
        "circuit {circuit_id} is half provisioned: A side pushed and recorded, Z side failed: {source}"
    )]
    AsymmetricProvision {
        /// Circuit that is half provisioned
        circuit_id: String,
        /// Why the Z side failed
        #[source]
        source: Box<Error>,
    },

    /// Device session error outside a push (reads, close)
    #[error("device error: {0}")]
    Device(#[from] devicekit::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if devices were left in different states.
    pub fn is_asymmetric(&self) -> bool {
        matches!(self, Error::AsymmetricProvision { .. })
    }

    /// Returns true if the error means there was nothing to deprovision.
    pub fn is_ledger_missing(&self) -> bool {
        matches!(self, Error::LedgerNotFound(_))
    }

    /// The device-level cause, if a device operation failed.
    pub fn device_error(&self) -> Option<&devicekit::Error> {
        match self {
            Error::Push { source, .. } | Error::Device(source) => Some(source),
            Error::AsymmetricProvision { source, .. } => source.device_error(),
            _ => None,
        }
    }
}

/// Result type for circuit operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let missing = Error::LedgerNotFound(PathBuf::from("10.0.0.1_removal.jsonl"));
        assert!(missing.is_ledger_missing());
        assert!(!missing.is_asymmetric());

        let half = Error::AsymmetricProvision {
            circuit_id: "0001".to_string(),
            source: Box::new(Error::Push {
                side: Side::Z,
                address: "10.0.0.2".to_string(),
                source: devicekit::Error::Closed("10.0.0.2".to_string()),
            }),
        };
        assert!(half.is_asymmetric());
        assert!(!half.is_ledger_missing());
        assert!(half.device_error().is_some_and(devicekit::Error::is_connection_error));
        assert!(missing.device_error().is_none());
    }

    #[test]
    fn test_messages_name_the_failing_step() {
        let exhausted = Error::AllocationExhausted {
            resource: "service instance id",
            min: 1,
            max: 4093,
        };
        assert_eq!(
            exhausted.to_string(),
            "no free service instance id in range 1..=4093"
        );

        let missing = Error::LedgerNotFound(PathBuf::from("/tmp/10.0.0.1_removal.jsonl"));
        assert!(missing.to_string().starts_with("ledger not found: /tmp/10.0.0.1_removal.jsonl"));

        let push = Error::Push {
            side: Side::A,
            address: "10.0.0.1".to_string(),
            source: devicekit::Error::Closed("10.0.0.1".to_string()),
        };
        assert!(push.to_string().contains("A side (10.0.0.1)"));
    }
}
