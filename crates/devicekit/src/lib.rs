//! # devicekit
//!
//! Sessions to network devices for configuration automation.
//!
//! A [`Device`] wraps one [`Session`](backend::Session) and exposes the three
//! operations automation needs:
//!
//! - **Read**: run a show command and get its raw text back
//! - **Push**: send a batch of configuration lines, bounded by a timeout
//! - **Close**: tear the session down
//!
//! ## Example
//!
//! ```no_run
//! use devicekit::{Credentials, Device, SshOptions, DEFAULT_PUSH_TIMEOUT};
//!
//! let credentials = Credentials::new("netops", "secret");
//! let mut device = Device::connect("192.0.2.10", &credentials, &SshOptions::default())
//!     .expect("Failed to connect");
//!
//! let version = device.run_read_command("show version").expect("Read failed");
//! println!("{version}");
//!
//! device
//!     .push_config(&["ip sla 10".to_string()], DEFAULT_PUSH_TIMEOUT)
//!     .expect("Push failed");
//! device.close().expect("Close failed");
//! ```
//!
//! ## Backends
//!
//! - `ssh` (default): the system OpenSSH client over a control-master socket
//! - `mock`: an in-memory simulated device, always available for tests

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

/// Session backends.
pub mod backend;
/// Error types for device operations.
pub mod error;
/// Credentials and transport options.
pub mod types;

pub use backend::mock::{MockDevice, MockMode, RunningConfig};
pub use error::{Error, Result};
pub use types::{Credentials, DEFAULT_PUSH_TIMEOUT, DEFAULT_SSH_PORT, SshOptions};

use backend::Session;
use std::time::Duration;

/// One open session to one device.
pub struct Device {
    address: String,
    session: Box<dyn Session>,
}

impl Device {
    /// Connect to a device over SSH.
    #[cfg(feature = "ssh")]
    pub fn connect(address: &str, credentials: &Credentials, options: &SshOptions) -> Result<Self> {
        let session = backend::ssh::SshSession::connect(address, credentials, options)?;
        Ok(Self::with_session(address, Box::new(session)))
    }

    /// Wrap an existing session (useful for testing).
    pub fn with_session(address: impl Into<String>, session: Box<dyn Session>) -> Self {
        Self {
            address: address.into(),
            session,
        }
    }

    /// The address this device was opened with.
    ///
    /// Used as the device's identity for per-device files.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Run a read-only command and return its raw output.
    pub fn run_read_command(&self, command: &str) -> Result<String> {
        self.session.run_read_command(command)
    }

    /// Push configuration lines as one batch.
    pub fn push_config(&self, lines: &[String], timeout: Duration) -> Result<()> {
        self.session.push_config(lines, timeout)
    }

    /// Close the session.
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_delegates_to_session() {
        let mock = MockDevice::new("10.0.0.1").with_ip_slas([3]);
        let mut device = Device::with_session("10.0.0.1", Box::new(mock.clone()));

        assert_eq!(device.address(), "10.0.0.1");
        let out = device
            .run_read_command("show running-config | include ^ip sla [0-9]")
            .unwrap();
        assert_eq!(out, "ip sla 3\n");

        device
            .push_config(&["no ip sla 3".to_string()], DEFAULT_PUSH_TIMEOUT)
            .unwrap();
        assert!(mock.running_config().ip_slas.is_empty());

        device.close().unwrap();
        assert!(mock.is_closed());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("netops", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("netops"));
        assert!(!debug.contains("hunter2"));
    }
}
