//! Mirrored per-device circuit records.

use serde::Serialize;

use crate::types::{CircuitEnd, Monitoring, ProbeIds, Side, VCID_PREFIX};

/// Everything needed to render one end of a circuit.
///
/// Field names are the placeholder names available to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitDescriptor {
    /// Zero-padded 4-digit circuit id, shared by both ends
    pub circuit_id: String,
    /// Pseudowire id, shared by both ends
    pub vcid: String,
    /// Local interface the service instance lives under
    pub interface: String,
    /// Service instance id and VLAN tag
    pub vlan: u16,
    /// Loopback of the other end
    pub peer_loopback: String,
    /// CFM endpoint id of this end
    pub local_mpid: u8,
    /// CFM endpoint id of the other end
    pub remote_mpid: u8,
    /// SLM probe id
    pub slm_probe_id: u32,
    /// DMM probe id
    pub dmm_probe_id: u32,
    /// CCM interval as the device expects it, e.g. `10s`
    pub ccm_interval: String,
    /// CFM maintenance domain
    pub cfm_domain: String,
    /// CFM maintenance level
    pub cfm_level: u8,
    /// CCM hardware offload
    pub hw_offload: bool,
}

/// The A and Z descriptors of one circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitPair {
    /// A end
    pub a: CircuitDescriptor,
    /// Z end
    pub z: CircuitDescriptor,
}

impl CircuitPair {
    /// Build both ends from one allocation.
    ///
    /// Each end points its pseudowire at the other end's loopback and uses
    /// its own endpoint ids from [`Side::mpids`].
    pub fn build(
        vlan: u16,
        probes: ProbeIds,
        a_end: &CircuitEnd,
        z_end: &CircuitEnd,
        monitoring: &Monitoring,
    ) -> Self {
        Self {
            a: describe(Side::A, vlan, probes, a_end, z_end, monitoring),
            z: describe(Side::Z, vlan, probes, z_end, a_end, monitoring),
        }
    }

    /// Shared circuit id.
    pub fn circuit_id(&self) -> &str {
        &self.a.circuit_id
    }

    /// Descriptor for one side.
    pub fn side(&self, side: Side) -> &CircuitDescriptor {
        match side {
            Side::A => &self.a,
            Side::Z => &self.z,
        }
    }
}

fn describe(
    side: Side,
    vlan: u16,
    probes: ProbeIds,
    local: &CircuitEnd,
    peer: &CircuitEnd,
    monitoring: &Monitoring,
) -> CircuitDescriptor {
    let (local_mpid, remote_mpid) = side.mpids();
    CircuitDescriptor {
        circuit_id: circuit_id(vlan),
        vcid: vcid(vlan),
        interface: local.interface.clone(),
        vlan,
        peer_loopback: peer.loopback.clone(),
        local_mpid,
        remote_mpid,
        slm_probe_id: probes.slm,
        dmm_probe_id: probes.dmm,
        ccm_interval: format!("{}s", monitoring.ccm_interval_secs),
        cfm_domain: monitoring.cfm_domain.clone(),
        cfm_level: monitoring.cfm_level,
        hw_offload: monitoring.hw_offload,
    }
}

/// Circuit id for a VLAN: the VLAN zero-padded to 4 digits.
pub fn circuit_id(vlan: u16) -> String {
    format!("{vlan:04}")
}

/// VCID for a VLAN.
pub fn vcid(vlan: u16) -> String {
    format!("{VCID_PREFIX}{}", circuit_id(vlan))
}
