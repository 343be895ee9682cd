//! SSH backend implementation.
//!
//! Shells out to the system OpenSSH client. A control-master connection is
//! opened once in [`SshSession::connect`] and every read and push runs as a
//! multiplexed channel over it, so a run authenticates to each device once.
//!
//! Password authentication goes through `sshpass -e`, which reads the
//! password from the `SSHPASS` environment variable of the child process
//! only. The password never appears on a command line.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::types::{Credentials, SshOptions};

use super::Session;

/// How often a running push is checked against its deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Session backed by an OpenSSH control-master connection.
pub struct SshSession {
    address: String,
    destination: String,
    password: String,
    options: SshOptions,
    control_path: PathBuf,
    open: bool,
}

impl SshSession {
    /// Open a session to `address`.
    ///
    /// Returns an error if `ssh` or `sshpass` are missing or if the initial
    /// connection fails (unreachable host, bad credentials).
    pub fn connect(address: &str, credentials: &Credentials, options: &SshOptions) -> Result<Self> {
        if !Self::is_available() {
            return Err(Error::ToolNotFound("ssh"));
        }
        if !command_exists("sshpass") {
            return Err(Error::ToolNotFound("sshpass"));
        }

        let mut session = Self::unconnected(address, credentials, options);

        let output = session
            .ssh()
            .args(["-o", "ControlMaster=yes", "-o", "ControlPersist=yes", "-N", "-f"])
            .arg(&session.destination)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(Error::ConnectFailed {
                address: address.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        session.open = true;
        Ok(session)
    }

    fn unconnected(address: &str, credentials: &Credentials, options: &SshOptions) -> Self {
        let control_path =
            std::env::temp_dir().join(format!("devicekit-{}-%C", std::process::id()));
        Self {
            address: address.to_string(),
            destination: format!("{}@{}", credentials.username, address),
            password: credentials.password.clone(),
            options: options.clone(),
            control_path,
            open: false,
        }
    }

    /// Check if the ssh client is available on this system.
    pub fn is_available() -> bool {
        command_exists("ssh")
    }

    /// Base ssh invocation shared by every operation.
    fn ssh(&self) -> Command {
        let mut cmd = Command::new("sshpass");
        cmd.arg("-e").arg("ssh").env("SSHPASS", &self.password);
        cmd.arg("-p").arg(self.options.port.to_string());
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()));
        for option in &self.options.options {
            cmd.arg("-o").arg(option);
        }
        cmd
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Closed(self.address.clone()))
        }
    }
}

impl Session for SshSession {
    fn run_read_command(&self, command: &str) -> Result<String> {
        self.ensure_open()?;

        let output = self
            .ssh()
            .arg(&self.destination)
            .arg(command)
            .stdin(Stdio::null())
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(Error::CommandFailed {
                address: self.address.clone(),
                command: command.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn push_config(&self, lines: &[String], timeout: Duration) -> Result<()> {
        self.ensure_open()?;

        // The bound covers sending the batch too; a device that stops
        // reading must not hold the push past its deadline.
        let deadline = Instant::now() + timeout;

        let mut child = self
            .ssh()
            .arg("-T")
            .arg(&self.destination)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);
        let writer = child
            .stdin
            .take()
            .map(|stdin| spawn_writer(stdin, config_script(lines)));

        let Some(status) = wait_until(&mut child, deadline)? else {
            return Err(Error::Timeout {
                address: self.address.clone(),
                timeout,
            });
        };

        let sent = writer
            .and_then(|h| h.join().ok())
            .unwrap_or(Ok(()));
        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);

        if !status.success() {
            let message = if stderr.trim().is_empty() {
                format!("ssh exited with {status}")
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::PushFailed {
                address: self.address.clone(),
                message,
            });
        }
        if let Err(e) = sent {
            return Err(Error::PushFailed {
                address: self.address.clone(),
                message: format!("could not send configuration: {e}"),
            });
        }

        match Error::from_push_output(&self.address, &stdout) {
            Some(rejected) => Err(rejected),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        self.ssh()
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        Ok(())
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Wrap configuration lines in a configuration-mode session.
fn config_script(lines: &[String]) -> String {
    let mut script = String::from("configure terminal\n");
    for line in lines {
        script.push_str(line);
        script.push('\n');
    }
    script.push_str("end\n");
    script
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    })
}

/// Feed `input` to a child and close its stdin when done.
fn spawn_writer<W: Write + Send + 'static>(
    mut writer: W,
    input: String,
) -> JoinHandle<std::io::Result<()>> {
    thread::spawn(move || writer.write_all(input.as_bytes()))
}

/// Wait for `child` until `deadline`.
///
/// Returns `None` after killing and reaping a child that outlived it.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SshSession {
        SshSession::unconnected(
            "10.0.0.1",
            &Credentials::new("netops", "secret"),
            &SshOptions {
                port: 2222,
                options: vec!["StrictHostKeyChecking=no".to_string()],
            },
        )
    }

    #[test]
    fn test_config_script_wraps_lines() {
        let lines = vec!["interface Gi0/0/1".to_string(), " shutdown".to_string()];
        assert_eq!(
            config_script(&lines),
            "configure terminal\ninterface Gi0/0/1\n shutdown\nend\n"
        );
    }

    #[test]
    fn test_config_script_empty_batch() {
        assert_eq!(config_script(&[]), "configure terminal\nend\n");
    }

    #[test]
    fn test_destination_and_control_path() {
        let s = session();
        assert_eq!(s.destination, "netops@10.0.0.1");
        let path = s.control_path.display().to_string();
        assert!(path.contains(&std::process::id().to_string()));
        assert!(path.ends_with("%C"));
    }

    #[test]
    fn test_ssh_command_keeps_password_off_argv() {
        let s = session();
        let cmd = s.ssh();
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert!(!args.iter().any(|a| a.contains("secret")));
        assert!(args.contains(&"2222".to_string()));
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_until_kills_child_past_deadline() {
        let mut child = Command::new("sleep")
            .arg("5")
            .stdin(Stdio::piped())
            .spawn()
            .unwrap();
        // Far more than a pipe buffer, and `sleep` never reads it.
        let writer = child
            .stdin
            .take()
            .map(|stdin| spawn_writer(stdin, "x".repeat(4 << 20)));

        let started = Instant::now();
        let status = wait_until(&mut child, started + Duration::from_millis(200)).unwrap();
        assert!(status.is_none());
        assert!(started.elapsed() < Duration::from_secs(3));

        // The killed child closed the pipe, so the writer gives up.
        let sent = writer.unwrap().join().unwrap();
        assert!(sent.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_until_returns_exit_status() {
        let mut child = Command::new("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().map(spawn_reader);
        let script = config_script(&vec![" no shutdown".to_string(); 50_000]);
        let writer = child
            .stdin
            .take()
            .map(|stdin| spawn_writer(stdin, script.clone()));

        let status = wait_until(&mut child, Instant::now() + Duration::from_secs(10)).unwrap();
        assert!(status.is_some_and(|s| s.success()));
        assert!(writer.unwrap().join().unwrap().is_ok());
        assert_eq!(join_reader(stdout), script);
    }

    #[test]
    fn test_unconnected_session_rejects_operations() {
        let mut s = session();
        assert!(matches!(
            s.run_read_command("show version"),
            Err(Error::Closed(_))
        ));
        assert!(matches!(
            s.push_config(&[], Duration::from_secs(1)),
            Err(Error::Closed(_))
        ));
        // Closing a session that never opened is a no-op
        assert!(s.close().is_ok());
    }
}
