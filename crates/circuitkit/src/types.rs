use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest usable service instance / VLAN id.
pub const VLAN_MIN: u16 = 1;
/// Highest usable service instance / VLAN id.
pub const VLAN_MAX: u16 = 4093;

/// Lowest usable IP SLA probe id.
pub const PROBE_ID_MIN: u32 = 1;
/// Highest usable IP SLA probe id.
pub const PROBE_ID_MAX: u32 = 2_147_483_647;

/// Prefix of every pseudowire VCID.
pub const VCID_PREFIX: &str = "500";

/// One end of a test circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The A end
    A,
    /// The Z end
    Z,
}

impl Side {
    /// CFM endpoint ids as `(local, remote)` for this end.
    pub fn mpids(self) -> (u8, u8) {
        match self {
            Self::A => (1, 2),
            Self::Z => (2, 1),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Z => write!(f, "Z"),
        }
    }
}

/// The pair of IP SLA probe ids shared by both ends of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeIds {
    /// Synthetic loss measurement probe
    pub slm: u32,
    /// Delay measurement probe
    pub dmm: u32,
}

/// Where a circuit terminates on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitEnd {
    /// Loopback address the peer's pseudowire targets
    pub loopback: String,
    /// Interface the service instance is created under
    pub interface: String,
}

impl CircuitEnd {
    /// Create a circuit end
    pub fn new(loopback: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            loopback: loopback.into(),
            interface: interface.into(),
        }
    }
}

/// CFM settings applied to every circuit of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitoring {
    /// CCM transmit interval in seconds
    pub ccm_interval_secs: u32,
    /// Maintenance domain name
    pub cfm_domain: String,
    /// Maintenance domain level
    pub cfm_level: u8,
    /// Offload CCM to hardware
    pub hw_offload: bool,
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            ccm_interval_secs: 10,
            cfm_domain: "OPERATOR".to_string(),
            cfm_level: 1,
            hw_offload: false,
        }
    }
}
