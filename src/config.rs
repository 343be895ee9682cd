use anyhow::{Context, Result, bail};
use devicekit::{Credentials, DEFAULT_PUSH_TIMEOUT, SshOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable holding the device username
pub const ENV_USERNAME: &str = "CIRCUITGEN_USERNAME";

/// Environment variable holding the device password
pub const ENV_PASSWORD: &str = "CIRCUITGEN_PASSWORD";

// ============================================================================
// Settings
// ============================================================================

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub credentials: Option<CredentialSettings>,
    /// Where ledgers and dry-run files are written (default: current directory)
    pub ledger_dir: Option<String>,
    /// Where l2vpn.tmpl / l2vpn_removal.tmpl are looked up
    pub template_dir: Option<String>,
    pub push_timeout_secs: Option<u64>,
    pub ssh: SshOptions,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Settings {
    /// Load `config.toml` from the config directory, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = paths::config_dir()?.join(CONFIG_FILE);
        Self::load_from(&path)
    }

    /// Load settings from a specific file, or defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid {} format", path.display()))
    }

    pub fn ledger_dir(&self) -> PathBuf {
        self.ledger_dir
            .as_deref()
            .map_or_else(|| PathBuf::from("."), paths::expand)
    }

    pub fn template_dir(&self) -> Result<PathBuf> {
        match self.template_dir.as_deref() {
            Some(dir) => Ok(paths::expand(dir)),
            None => Ok(paths::config_dir()?.join("templates")),
        }
    }

    pub fn push_timeout(&self) -> Duration {
        self.push_timeout_secs
            .map_or(DEFAULT_PUSH_TIMEOUT, Duration::from_secs)
    }

    /// Credentials from the environment, falling back to the config file
    pub fn credentials(&self) -> Result<Credentials> {
        resolve_credentials(|key| std::env::var(key).ok(), self.credentials.as_ref())
    }
}

/// Resolve credentials, preferring the environment over the config file.
///
/// Each field is resolved on its own, so a username in the file can be paired
/// with a password from the environment.
pub fn resolve_credentials(
    env: impl Fn(&str) -> Option<String>,
    file: Option<&CredentialSettings>,
) -> Result<Credentials> {
    let pick = |key: &str, from_file: Option<&String>| {
        env(key)
            .filter(|v| !v.is_empty())
            .or_else(|| from_file.filter(|v| !v.is_empty()).cloned())
    };

    let username = pick(ENV_USERNAME, file.and_then(|c| c.username.as_ref()));
    let password = pick(ENV_PASSWORD, file.and_then(|c| c.password.as_ref()));

    match (username, password) {
        (Some(username), Some(password)) => Ok(Credentials::new(username, password)),
        _ => bail!(
            "Device credentials are not configured. Either export {ENV_USERNAME} and \
             {ENV_PASSWORD}, or add a [credentials] section with username and password \
             to {CONFIG_FILE} in the config directory (see {})",
            paths::ENV_CONFIG_DIR
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn file_creds(username: &str, password: &str) -> CredentialSettings {
        CredentialSettings {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_credentials_from_env() {
        let env = |key: &str| match key {
            ENV_USERNAME => Some("env-user".to_string()),
            ENV_PASSWORD => Some("env-pass".to_string()),
            _ => None,
        };
        let creds = resolve_credentials(env, Some(&file_creds("file-user", "file-pass"))).unwrap();
        assert_eq!(creds.username, "env-user");
        assert_eq!(creds.password, "env-pass");
    }

    #[test]
    fn test_credentials_fall_back_to_file() {
        let creds = resolve_credentials(no_env, Some(&file_creds("netops", "secret"))).unwrap();
        assert_eq!(creds.username, "netops");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn test_credentials_mixed_sources() {
        let env = |key: &str| (key == ENV_PASSWORD).then(|| "env-pass".to_string());
        let file = CredentialSettings {
            username: Some("netops".to_string()),
            password: None,
        };
        let creds = resolve_credentials(env, Some(&file)).unwrap();
        assert_eq!(creds.username, "netops");
        assert_eq!(creds.password, "env-pass");
    }

    #[test]
    fn test_missing_credentials_explain_both_sources() {
        let err = resolve_credentials(no_env, None).unwrap_err().to_string();
        assert!(err.contains(ENV_USERNAME));
        assert!(err.contains(ENV_PASSWORD));
        assert!(err.contains("config.toml"));
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let env = |_: &str| Some(String::new());
        assert!(resolve_credentials(env, Some(&file_creds("", ""))).is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(settings.credentials.is_none());
        assert_eq!(settings.ledger_dir(), PathBuf::from("."));
        assert_eq!(settings.push_timeout(), DEFAULT_PUSH_TIMEOUT);
        assert_eq!(settings.ssh.port, 22);
    }

    #[test]
    fn test_load_full_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
ledger_dir = "/var/lib/circuitgen"
template_dir = "/etc/circuitgen/templates"
push_timeout_secs = 120

[credentials]
username = "netops"
password = "secret"

[ssh]
port = 2222
options = ["StrictHostKeyChecking=no"]
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.ledger_dir(), PathBuf::from("/var/lib/circuitgen"));
        assert_eq!(
            settings.template_dir().unwrap(),
            PathBuf::from("/etc/circuitgen/templates")
        );
        assert_eq!(settings.push_timeout(), Duration::from_secs(120));
        assert_eq!(settings.ssh.port, 2222);
        assert_eq!(settings.ssh.options, vec!["StrictHostKeyChecking=no"]);

        let creds = resolve_credentials(no_env, settings.credentials.as_ref()).unwrap();
        assert_eq!(creds.username, "netops");
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "push_timeout_secs = \"soon\"").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid"));
    }
}
