//! In-memory simulated device.
//!
//! [`MockDevice`] answers the show commands used for identifier allocation
//! from a simulated running configuration. In [`MockMode::SelfUpdating`]
//! pushed configuration is interpreted, so service instances and IP SLA
//! entries appear and disappear the way they would on a real device. In
//! [`MockMode::Static`] pushes are recorded but never change what reads
//! return.
//!
//! Clones share state, so a test can hand one clone to the code under test
//! and inspect the other afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use regex::Regex;

use crate::error::{Error, Result};

use super::Session;

static SHOW_SERVICE_INSTANCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^show running-config interface (\S+) \| include service instance$")
        .expect("valid regex")
});
const SHOW_IP_SLA: &str = "show running-config | include ^ip sla [0-9]";

static SERVICE_INSTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^service instance (\d+) ethernet\b").expect("valid regex"));
static NO_SERVICE_INSTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^no service instance (\d+)\b").expect("valid regex"));
static IP_SLA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ip sla (\d+)$").expect("valid regex"));
static NO_IP_SLA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^no ip sla (\d+)$").expect("valid regex"));

/// How a mock device reacts to pushed configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockMode {
    /// Pushed lines update the running configuration
    #[default]
    SelfUpdating,
    /// Pushed lines are recorded only
    Static,
}

/// The parts of a running configuration the mock tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningConfig {
    /// Service instance ids per interface
    pub service_instances: BTreeMap<String, BTreeSet<u32>>,
    /// Configured IP SLA probe ids
    pub ip_slas: BTreeSet<u32>,
}

impl RunningConfig {
    /// Render the lines a device would return for the service-instance query.
    fn show_service_instances(&self, interface: &str) -> String {
        self.service_instances
            .get(interface)
            .map(|ids| {
                ids.iter()
                    .map(|id| format!(" service instance {id} ethernet\n"))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn show_ip_slas(&self) -> String {
        self.ip_slas.iter().map(|id| format!("ip sla {id}\n")).collect()
    }

    /// Interpret a configuration batch the way an IOS-style parser would,
    /// for the commands the mock tracks. Everything else is accepted and
    /// ignored.
    fn apply(&mut self, lines: &[String]) {
        let mut interface: Option<String> = None;

        for raw in lines {
            let command = raw.trim();
            if command.is_empty() || command == "!" {
                continue;
            }
            let indented = raw.starts_with(char::is_whitespace);

            if let Some(ctx) = &interface {
                if let Some(id) = capture_id(&SERVICE_INSTANCE, command) {
                    self.service_instances
                        .entry(ctx.clone())
                        .or_default()
                        .insert(id);
                    continue;
                }
                if let Some(id) = capture_id(&NO_SERVICE_INSTANCE, command) {
                    if let Some(ids) = self.service_instances.get_mut(ctx) {
                        ids.remove(&id);
                        if ids.is_empty() {
                            self.service_instances.remove(ctx);
                        }
                    }
                    continue;
                }
            }

            if indented {
                continue;
            }

            interface = command
                .strip_prefix("interface ")
                .map(|name| name.trim().to_string());

            if let Some(id) = capture_id(&IP_SLA, command) {
                self.ip_slas.insert(id);
            } else if let Some(id) = capture_id(&NO_IP_SLA, command) {
                self.ip_slas.remove(&id);
            }
        }
    }
}

fn capture_id(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug)]
struct State {
    address: String,
    mode: MockMode,
    config: RunningConfig,
    reads: Vec<String>,
    pushes: Vec<Vec<String>>,
    fail_next_push: Option<String>,
    closed: bool,
}

/// Simulated device for tests.
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<State>>,
}

impl MockDevice {
    /// Create an empty self-updating device.
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_mode(address, MockMode::SelfUpdating)
    }

    /// Create an empty device whose reads never reflect pushes.
    pub fn static_device(address: impl Into<String>) -> Self {
        Self::with_mode(address, MockMode::Static)
    }

    /// Create an empty device with the given mode.
    pub fn with_mode(address: impl Into<String>, mode: MockMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                address: address.into(),
                mode,
                config: RunningConfig::default(),
                reads: Vec::new(),
                pushes: Vec::new(),
                fail_next_push: None,
                closed: false,
            })),
        }
    }

    /// Pre-configure service instances on an interface.
    #[must_use]
    pub fn with_service_instances(
        self,
        interface: &str,
        ids: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.lock()
            .config
            .service_instances
            .entry(interface.to_string())
            .or_default()
            .extend(ids);
        self
    }

    /// Pre-configure IP SLA probes.
    #[must_use]
    pub fn with_ip_slas(self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.lock().config.ip_slas.extend(ids);
        self
    }

    /// Make the next push fail with `message` without touching state.
    pub fn fail_next_push(&self, message: impl Into<String>) {
        self.lock().fail_next_push = Some(message.into());
    }

    /// Snapshot of the simulated running configuration.
    pub fn running_config(&self) -> RunningConfig {
        self.lock().config.clone()
    }

    /// Every read command received, in order.
    pub fn reads(&self) -> Vec<String> {
        self.lock().reads.clone()
    }

    /// Every successfully accepted configuration batch, in order.
    pub fn pushes(&self) -> Vec<Vec<String>> {
        self.lock().pushes.clone()
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Session for MockDevice {
    fn run_read_command(&self, command: &str) -> Result<String> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Closed(state.address.clone()));
        }
        state.reads.push(command.to_string());

        if command == SHOW_IP_SLA {
            return Ok(state.config.show_ip_slas());
        }
        if let Some(caps) = SHOW_SERVICE_INSTANCES.captures(command) {
            return Ok(state.config.show_service_instances(&caps[1]));
        }
        Ok(String::new())
    }

    fn push_config(&self, lines: &[String], _timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Closed(state.address.clone()));
        }
        if let Some(message) = state.fail_next_push.take() {
            return Err(Error::PushFailed {
                address: state.address.clone(),
                message,
            });
        }

        state.pushes.push(lines.to_vec());
        if state.mode == MockMode::SelfUpdating {
            state.config.apply(lines);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}
