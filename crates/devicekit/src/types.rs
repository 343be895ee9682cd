use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default bound on a single configuration push.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Login credentials shared by both devices of a run.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account with access to the devices
    pub username: String,
    /// Password for the account
    pub password: String,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs and panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transport options for SSH sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshOptions {
    /// Port to connect to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Extra `-o Key=Value` options passed to ssh
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            options: Vec::new(),
        }
    }
}
