//! Session backends.
//!
//! The [`Session`] trait is the whole contract a device has to honor:
//! answer show commands, accept a configuration batch within a time bound,
//! and shut down cleanly.

use std::time::Duration;

use crate::error::Result;

pub mod mock;
#[cfg(feature = "ssh")]
pub mod ssh;

/// Backend trait for device sessions
///
/// This trait abstracts the transport, allowing:
/// - The system `ssh` client for real devices
/// - An in-memory simulated device for tests
pub trait Session: Send {
    /// Run a read-only command and return its raw text output
    fn run_read_command(&self, command: &str) -> Result<String>;

    /// Push a batch of configuration lines in one configuration session.
    ///
    /// The whole batch must complete within `timeout`.
    fn push_config(&self, lines: &[String], timeout: Duration) -> Result<()>;

    /// Close the session. Further calls fail with `Error::Closed`.
    fn close(&mut self) -> Result<()>;
}
