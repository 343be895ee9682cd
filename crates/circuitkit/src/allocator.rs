//! Identifier allocation from live device state.
//!
//! Nothing is cached between calls: every allocation re-reads both devices,
//! so identifiers configured by anything else (another tool, an operator,
//! a previous iteration of this run) are always seen.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use devicekit::Device;
use regex::Regex;

use crate::error::{Error, Result};
use crate::types::{PROBE_ID_MAX, PROBE_ID_MIN, ProbeIds, VLAN_MAX, VLAN_MIN};

/// Show command listing every configured IP SLA probe.
pub const PROBE_QUERY: &str = "show running-config | include ^ip sla [0-9]";

static SERVICE_INSTANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]+service instance (\d+) ethernet\b").expect("valid regex")
});
static PROBE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*ip sla (\d+)\b").expect("valid regex"));

/// Show command listing the service instances under one interface.
pub fn service_instance_query(interface: &str) -> String {
    format!("show running-config interface {interface} | include service instance")
}

/// Observed identifier state of one device.
///
/// Implemented for [`Device`] by querying its running configuration. Tests
/// can implement it directly to simulate any device.
pub trait DeviceState {
    /// Address used in log and error messages
    fn address(&self) -> &str;

    /// Service instance ids currently configured under `interface`
    fn service_instance_ids(&self, interface: &str) -> Result<BTreeSet<u16>>;

    /// IP SLA probe ids currently configured anywhere on the device
    fn probe_ids(&self) -> Result<BTreeSet<u32>>;
}

impl DeviceState for Device {
    fn address(&self) -> &str {
        Device::address(self)
    }

    fn service_instance_ids(&self, interface: &str) -> Result<BTreeSet<u16>> {
        let output = self.run_read_command(&service_instance_query(interface))?;
        Ok(parse_service_instance_ids(&output))
    }

    fn probe_ids(&self) -> Result<BTreeSet<u32>> {
        let output = self.run_read_command(PROBE_QUERY)?;
        Ok(parse_probe_ids(&output))
    }
}

/// Extract service instance ids from show output.
pub fn parse_service_instance_ids(output: &str) -> BTreeSet<u16> {
    SERVICE_INSTANCE_RE
        .captures_iter(output)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Extract IP SLA probe ids from show output.
pub fn parse_probe_ids(output: &str) -> BTreeSet<u32> {
    PROBE_RE
        .captures_iter(output)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Ascending walk over the free identifiers of a range.
///
/// Every value the cursor hands out joins its exclusion set, so successive
/// draws from one cursor are always distinct.
#[derive(Debug, Clone)]
pub struct IdCursor {
    next: u64,
    max: u64,
    used: BTreeSet<u64>,
}

impl IdCursor {
    /// Cursor over `min..=max` skipping `used`.
    pub fn new(min: u64, max: u64, used: impl IntoIterator<Item = u64>) -> Self {
        Self {
            next: min,
            max,
            used: used.into_iter().collect(),
        }
    }

    /// Whether `id` is excluded (pre-existing or already drawn).
    pub fn is_excluded(&self, id: u64) -> bool {
        self.used.contains(&id)
    }
}

impl Iterator for IdCursor {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while self.next <= self.max {
            let candidate = self.next;
            self.next += 1;
            if !self.is_excluded(candidate) {
                self.used.insert(candidate);
                return Some(candidate);
            }
        }
        None
    }
}

/// Smallest service instance id in `1..=4093` free on both target interfaces.
pub fn allocate_service_instance_id(
    a: &dyn DeviceState,
    a_interface: &str,
    z: &dyn DeviceState,
    z_interface: &str,
) -> Result<u16> {
    let mut used = a.service_instance_ids(a_interface)?;
    let z_used = z.service_instance_ids(z_interface)?;
    log::debug!(
        "service instances in use: {} on {} {}, {} on {} {}",
        used.len(),
        a.address(),
        a_interface,
        z_used.len(),
        z.address(),
        z_interface
    );
    used.extend(z_used);

    IdCursor::new(
        VLAN_MIN.into(),
        VLAN_MAX.into(),
        used.into_iter().map(u64::from),
    )
    .next()
    .and_then(|id| u16::try_from(id).ok())
    .ok_or(Error::AllocationExhausted {
        resource: "service instance id",
        min: VLAN_MIN.into(),
        max: VLAN_MAX.into(),
    })
}

/// The two smallest probe ids free on both devices, ascending.
pub fn allocate_probe_id_pair(a: &dyn DeviceState, z: &dyn DeviceState) -> Result<ProbeIds> {
    let mut used = a.probe_ids()?;
    used.extend(z.probe_ids()?);
    log::debug!(
        "IP SLA ids in use across {} and {}: {}",
        a.address(),
        z.address(),
        used.len()
    );

    let mut cursor = IdCursor::new(
        PROBE_ID_MIN.into(),
        PROBE_ID_MAX.into(),
        used.into_iter().map(u64::from),
    );
    let mut draw = || {
        cursor
            .next()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or(Error::AllocationExhausted {
                resource: "IP SLA id",
                min: PROBE_ID_MIN.into(),
                max: PROBE_ID_MAX.into(),
            })
    };

    let slm = draw()?;
    let dmm = draw()?;
    Ok(ProbeIds { slm, dmm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicekit::{DEFAULT_PUSH_TIMEOUT, MockDevice};

    /// A device whose state is fixed in memory.
    struct FixedState {
        service_instances: BTreeSet<u16>,
        probes: BTreeSet<u32>,
    }

    impl FixedState {
        fn empty() -> Self {
            Self {
                service_instances: BTreeSet::new(),
                probes: BTreeSet::new(),
            }
        }

        fn service_instances(ids: impl IntoIterator<Item = u16>) -> Self {
            Self {
                service_instances: ids.into_iter().collect(),
                ..Self::empty()
            }
        }

        fn probes(ids: impl IntoIterator<Item = u32>) -> Self {
            Self {
                probes: ids.into_iter().collect(),
                ..Self::empty()
            }
        }
    }

    impl DeviceState for FixedState {
        fn address(&self) -> &str {
            "fixed"
        }

        fn service_instance_ids(&self, _interface: &str) -> Result<BTreeSet<u16>> {
            Ok(self.service_instances.clone())
        }

        fn probe_ids(&self) -> Result<BTreeSet<u32>> {
            Ok(self.probes.clone())
        }
    }

    #[test]
    fn test_parse_service_instance_ids() {
        let output = " service instance 10 ethernet EVC0010\n\
                      \x20service instance 2 ethernet\n\
                      \x20description service instance 99 ethernet\n\
                      service instance 77 ethernet\n";
        assert_eq!(parse_service_instance_ids(output), BTreeSet::from([2, 10]));
    }

    #[test]
    fn test_parse_service_instance_ids_empty() {
        assert!(parse_service_instance_ids("").is_empty());
        assert!(parse_service_instance_ids("% Invalid input detected\n").is_empty());
    }

    #[test]
    fn test_parse_probe_ids() {
        let output = "ip sla 1\nip sla 20\nip sla schedule 1 life forever\nip sla 3\n";
        assert_eq!(parse_probe_ids(output), BTreeSet::from([1, 3, 20]));
    }

    #[test]
    fn test_service_instance_query() {
        assert_eq!(
            service_instance_query("GigabitEthernet0/0/1"),
            "show running-config interface GigabitEthernet0/0/1 | include service instance"
        );
    }

    #[test]
    fn test_cursor_second_draw_excludes_first() {
        let mut cursor = IdCursor::new(1, 10, [2, 4]);
        assert_eq!(cursor.next(), Some(1));
        assert!(cursor.is_excluded(1));
        assert_eq!(cursor.next(), Some(3));
        assert_eq!(cursor.next(), Some(5));
    }

    #[test]
    fn test_cursor_exhaustion() {
        let mut cursor = IdCursor::new(1, 3, [1, 3]);
        assert_eq!(cursor.next(), Some(2));
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_service_instance_is_min_of_complement() {
        let cases: Vec<(Vec<u16>, Vec<u16>, u16)> = vec![
            (vec![], vec![], 1),
            (vec![1, 2, 3], vec![], 4),
            (vec![1, 3], vec![2], 4),
            (vec![2, 3], vec![5], 1),
            (vec![1], vec![1, 2, 4], 3),
        ];

        for (a_used, z_used, expected) in cases {
            let a = FixedState::service_instances(a_used.clone());
            let z = FixedState::service_instances(z_used.clone());
            let got = allocate_service_instance_id(&a, "Gi0/0/1", &z, "Gi0/0/2").unwrap();
            assert_eq!(got, expected, "a={a_used:?} z={z_used:?}");
        }
    }

    #[test]
    fn test_service_instance_last_free_slot() {
        let a = FixedState::service_instances((1..4093).filter(|id| *id != 4093));
        let z = FixedState::empty();
        assert_eq!(
            allocate_service_instance_id(&a, "Gi0/0/1", &z, "Gi0/0/2").unwrap(),
            4093
        );
    }

    #[test]
    fn test_service_instance_exhausted() {
        let a = FixedState::service_instances(1..=2000);
        let z = FixedState::service_instances(2001..=4093);
        let err = allocate_service_instance_id(&a, "Gi0/0/1", &z, "Gi0/0/2").unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationExhausted {
                min: 1,
                max: 4093,
                ..
            }
        ));
    }

    #[test]
    fn test_ids_above_range_do_not_block_allocation() {
        let a = FixedState::service_instances([4094, 4095]);
        let z = FixedState::empty();
        assert_eq!(
            allocate_service_instance_id(&a, "Gi0/0/1", &z, "Gi0/0/2").unwrap(),
            1
        );
    }

    #[test]
    fn test_probe_pair_fresh_devices() {
        let pair =
            allocate_probe_id_pair(&FixedState::empty(), &FixedState::empty()).unwrap();
        assert_eq!(pair, ProbeIds { slm: 1, dmm: 2 });
    }

    #[test]
    fn test_probe_pair_skips_union_of_both_devices() {
        let a = FixedState::probes([1, 4]);
        let z = FixedState::probes([2, 6]);
        let pair = allocate_probe_id_pair(&a, &z).unwrap();
        assert_eq!(pair, ProbeIds { slm: 3, dmm: 5 });
        assert!(pair.slm < pair.dmm);
    }

    #[test]
    fn test_probe_pair_adjacent_gap() {
        let a = FixedState::probes([1, 2, 3]);
        let z = FixedState::probes([6]);
        assert_eq!(
            allocate_probe_id_pair(&a, &z).unwrap(),
            ProbeIds { slm: 4, dmm: 5 }
        );
    }

    #[test]
    fn test_allocation_requeries_device() {
        let mock = MockDevice::new("10.0.0.1");
        let a = Device::with_session("10.0.0.1", Box::new(mock.clone()));
        let z = Device::with_session("10.0.0.2", Box::new(MockDevice::new("10.0.0.2")));

        assert_eq!(
            allocate_service_instance_id(&a, "Gi0/0/1", &z, "Gi0/0/1").unwrap(),
            1
        );

        a.push_config(
            &[
                "interface Gi0/0/1".to_string(),
                " service instance 1 ethernet".to_string(),
            ],
            DEFAULT_PUSH_TIMEOUT,
        )
        .unwrap();

        assert_eq!(
            allocate_service_instance_id(&a, "Gi0/0/1", &z, "Gi0/0/1").unwrap(),
            2
        );
        assert_eq!(
            mock.reads()
                .iter()
                .filter(|cmd| cmd.contains("service instance"))
                .count(),
            2
        );
    }

    #[test]
    fn test_allocation_scoped_to_interface() {
        let a = Device::with_session(
            "10.0.0.1",
            Box::new(MockDevice::new("10.0.0.1").with_service_instances("Gi0/0/2", [1, 2])),
        );
        let z = Device::with_session("10.0.0.2", Box::new(MockDevice::new("10.0.0.2")));
        assert_eq!(
            allocate_service_instance_id(&a, "Gi0/0/1", &z, "Gi0/0/1").unwrap(),
            1
        );
    }
}
