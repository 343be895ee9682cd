//! Provisioning and deprovisioning of circuit pairs.
//!
//! A provision run repeats, per circuit: allocate ids from live device state,
//! build the mirrored descriptors, render, then either write dry-run files or
//! commit each side. Committing a side means pushing its configuration and
//! recording its removal fragment in that device's ledger.
//!
//! Sides are committed A then Z. Nothing is rolled back: if Z fails after A
//! was committed, the run stops with [`Error::AsymmetricProvision`] and A's
//! ledger already holds what is needed to remove the half that exists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use devicekit::{DEFAULT_PUSH_TIMEOUT, Device};

use crate::allocator::{allocate_probe_id_pair, allocate_service_instance_id};
use crate::descriptor::CircuitPair;
use crate::dry_run::DryRunFile;
use crate::error::{Error, Result};
use crate::ledger::{LedgerRecord, RemovalLedger};
use crate::render::{Renderer, Template};
use crate::types::{CircuitEnd, Monitoring, ProbeIds, Side};

/// What to provision.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// Number of circuits
    pub count: usize,
    /// A end termination
    pub a_end: CircuitEnd,
    /// Z end termination
    pub z_end: CircuitEnd,
    /// CFM settings
    pub monitoring: Monitoring,
    /// Write dry-run files instead of pushing
    pub dry_run: bool,
}

/// How a circuit was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitMode {
    /// Pushed to both devices and recorded in both ledgers
    Pushed,
    /// Written to the dry-run files only
    DryRun,
}

/// One circuit of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedCircuit {
    /// Shared circuit id
    pub circuit_id: String,
    /// Shared pseudowire id
    pub vcid: String,
    /// Service instance id and VLAN
    pub vlan: u16,
    /// Probe ids
    pub probes: ProbeIds,
    /// Pushed or dry run
    pub mode: CircuitMode,
}

/// Result of a provision run.
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    /// Circuits in the order they were handled
    pub circuits: Vec<ProvisionedCircuit>,
    /// Dry-run files written, if any
    pub dry_run_files: Vec<PathBuf>,
}

impl ProvisionReport {
    /// VLAN ids in order.
    pub fn vlans(&self) -> Vec<u16> {
        self.circuits.iter().map(|c| c.vlan).collect()
    }
}

/// Result of a deprovision run.
#[derive(Debug, Clone, Default)]
pub struct DeprovisionReport {
    /// Records removed from the A device
    pub a: Vec<LedgerRecord>,
    /// Records removed from the Z device
    pub z: Vec<LedgerRecord>,
}

/// Progress callbacks for a provision run.
pub trait ProvisionObserver {
    /// Called before circuit `index` (1-based) of `count` is allocated.
    fn circuit_started(&self, _index: usize, _count: usize) {}

    /// Called after a side was pushed and recorded.
    fn side_committed(&self, _side: Side, _circuit_id: &str) {}

    /// Called once a circuit is complete.
    fn circuit_finished(&self, _circuit: &ProvisionedCircuit) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl ProvisionObserver for NoObserver {}

/// Drives provisioning between one A device and one Z device.
pub struct Orchestrator<'a> {
    a: &'a Device,
    z: &'a Device,
    renderer: &'a dyn Renderer,
    ledger_dir: PathBuf,
    push_timeout: Duration,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator. Ledgers and dry-run files live in `ledger_dir`.
    pub fn new(
        a: &'a Device,
        z: &'a Device,
        renderer: &'a dyn Renderer,
        ledger_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            a,
            z,
            renderer,
            ledger_dir: ledger_dir.into(),
            push_timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }

    /// Bound every push by `timeout`.
    #[must_use]
    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Directory holding ledgers and dry-run files.
    pub fn ledger_dir(&self) -> &Path {
        &self.ledger_dir
    }

    /// Ledger of one side.
    pub fn ledger(&self, side: Side) -> RemovalLedger {
        RemovalLedger::new(&self.ledger_dir, self.device(side).address())
    }

    fn device(&self, side: Side) -> &'a Device {
        match side {
            Side::A => self.a,
            Side::Z => self.z,
        }
    }

    /// Provision `request.count` circuits.
    pub fn provision(
        &self,
        request: &ProvisionRequest,
        observer: &dyn ProvisionObserver,
    ) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        for index in 1..=request.count {
            observer.circuit_started(index, request.count);

            let vlan = allocate_service_instance_id(
                self.a,
                &request.a_end.interface,
                self.z,
                &request.z_end.interface,
            )?;
            let probes = allocate_probe_id_pair(self.a, self.z)?;

            if request.dry_run && report.circuits.iter().any(|c| c.vlan == vlan) {
                log::warn!(
                    "Dry run reuses service instance {vlan}: devices are not updated between iterations"
                );
            }

            let pair = CircuitPair::build(
                vlan,
                probes,
                &request.a_end,
                &request.z_end,
                &request.monitoring,
            );
            let mode = if request.dry_run {
                for side in [Side::A, Side::Z] {
                    let config = self.renderer.render(Template::Provision, pair.side(side))?;
                    let file = DryRunFile::new(&self.ledger_dir, self.device(side).address());
                    file.append(&config)?;
                    if !report.dry_run_files.iter().any(|p| p == file.path()) {
                        report.dry_run_files.push(file.path().to_path_buf());
                    }
                }
                CircuitMode::DryRun
            } else {
                self.commit_side(Side::A, &pair)?;
                observer.side_committed(Side::A, pair.circuit_id());

                self.commit_side(Side::Z, &pair)
                    .map_err(|source| Error::AsymmetricProvision {
                        circuit_id: pair.circuit_id().to_string(),
                        source: Box::new(source),
                    })?;
                observer.side_committed(Side::Z, pair.circuit_id());
                CircuitMode::Pushed
            };

            let circuit = ProvisionedCircuit {
                circuit_id: pair.circuit_id().to_string(),
                vcid: pair.a.vcid.clone(),
                vlan,
                probes,
                mode,
            };
            log::info!(
                "Circuit {} ({:?}): vlan {}, probes {}/{}",
                circuit.circuit_id,
                mode,
                vlan,
                probes.slm,
                probes.dmm
            );
            observer.circuit_finished(&circuit);
            report.circuits.push(circuit);
        }

        Ok(report)
    }

    /// Push one side's configuration and record its removal fragment.
    ///
    /// Both templates are rendered and the ledger is validated before
    /// anything is pushed, so neither a template problem nor a corrupt
    /// ledger leaves an unrecorded circuit on the device.
    pub fn commit_side(&self, side: Side, pair: &CircuitPair) -> Result<LedgerRecord> {
        let device = self.device(side);
        let descriptor = pair.side(side);
        let config = self.renderer.render(Template::Provision, descriptor)?;
        let removal = self.renderer.render(Template::Removal, descriptor)?;
        let lines: Vec<String> = config.lines().map(str::to_string).collect();

        let ledger = self.ledger(side);
        let seq = ledger.next_seq()?;

        log::debug!(
            "Pushing {} lines to {} side ({})",
            lines.len(),
            side,
            device.address()
        );
        device
            .push_config(&lines, self.push_timeout)
            .map_err(|source| Error::Push {
                side,
                address: device.address().to_string(),
                source,
            })?;

        ledger.append(seq, &descriptor.circuit_id, &removal)
    }

    /// Remove every recorded circuit from both devices, A first.
    ///
    /// Each side reads its ledger before touching its device. A missing
    /// ledger stops the run at that side.
    pub fn deprovision(&self) -> Result<DeprovisionReport> {
        let a = self.deprovision_side(Side::A)?;
        let z = self.deprovision_side(Side::Z)?;
        Ok(DeprovisionReport { a, z })
    }

    /// Replay and delete one side's ledger.
    pub fn deprovision_side(&self, side: Side) -> Result<Vec<LedgerRecord>> {
        let device = self.device(side);
        self.ledger(side)
            .consume(device, self.push_timeout)
            .map_err(|e| match e {
                Error::Device(source) => Error::Push {
                    side,
                    address: device.address().to_string(),
                    source,
                },
                other => other,
            })
    }
}
