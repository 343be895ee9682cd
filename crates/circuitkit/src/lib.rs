//! # circuitkit
//!
//! Provision paired L2VPN test circuits between two devices and remove them
//! again later.
//!
//! Each circuit is an Ethernet service instance plus a pseudowire between
//! the two devices, monitored by CFM and a pair of Y.1731 IP SLA probes.
//! Identifiers are allocated from the devices' live running configuration,
//! never from local state. The only thing kept locally is the removal
//! ledger: for every circuit pushed, the configuration that undoes it.
//!
//! ## Example
//!
//! ```no_run
//! use circuitkit::{CircuitEnd, Monitoring, NoObserver, Orchestrator, ProvisionRequest, TemplateRenderer};
//! use devicekit::{Credentials, Device, SshOptions};
//!
//! let credentials = Credentials::new("netops", "secret");
//! let options = SshOptions::default();
//! let a = Device::connect("10.0.0.1", &credentials, &options).expect("connect A");
//! let z = Device::connect("10.0.0.2", &credentials, &options).expect("connect Z");
//!
//! let renderer = TemplateRenderer::builtin();
//! let orchestrator = Orchestrator::new(&a, &z, &renderer, ".");
//! let request = ProvisionRequest {
//!     count: 1,
//!     a_end: CircuitEnd::new("10.0.0.1", "GigabitEthernet0/0/1"),
//!     z_end: CircuitEnd::new("10.0.0.2", "GigabitEthernet0/0/1"),
//!     monitoring: Monitoring::default(),
//!     dry_run: false,
//! };
//!
//! let report = orchestrator.provision(&request, &NoObserver).expect("provision");
//! println!("provisioned vlans {:?}", report.vlans());
//!
//! orchestrator.deprovision().expect("deprovision");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

/// Identifier allocation from live device state.
pub mod allocator;
/// Per-device circuit descriptors.
pub mod descriptor;
/// Dry-run output files.
pub mod dry_run;
/// Error types.
pub mod error;
/// Removal ledger.
pub mod ledger;
/// Provisioning orchestration.
pub mod provision;
/// Configuration rendering.
pub mod render;
/// Shared types and identifier ranges.
pub mod types;

pub use allocator::{DeviceState, IdCursor, allocate_probe_id_pair, allocate_service_instance_id};
pub use descriptor::{CircuitDescriptor, CircuitPair};
pub use dry_run::DryRunFile;
pub use error::{Error, Result};
pub use ledger::{LedgerRecord, RemovalLedger};
pub use provision::{
    CircuitMode, DeprovisionReport, NoObserver, Orchestrator, ProvisionObserver,
    ProvisionReport, ProvisionRequest, ProvisionedCircuit,
};
pub use render::{Renderer, Template, TemplateRenderer};
pub use types::{CircuitEnd, Monitoring, ProbeIds, Side};
