pub mod deprovision;
pub mod provision;
pub mod status;

use anyhow::{Context as _, Result};
use devicekit::Device;

use crate::cli::DevicePair;
use crate::config::Settings;
use crate::progress;

/// Open one session per device. Credentials are resolved before either
/// device is contacted.
fn connect_pair(devices: &DevicePair, settings: &Settings, quiet: bool) -> Result<(Device, Device)> {
    let credentials = settings.credentials()?;

    let connect = |address: &str| -> Result<Device> {
        let pb = (!quiet).then(|| progress::spinner(&format!("Connecting to {address}...")));
        let result = Device::connect(address, &credentials, &settings.ssh)
            .with_context(|| format!("Could not connect to {address}"));
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        result
    };

    let a = connect(&devices.a_address)?;
    let z = connect(&devices.z_address)?;
    Ok((a, z))
}

/// What a failed device operation may have left behind.
fn device_error_hint(err: &circuitkit::Error) -> Option<&'static str> {
    let device = err.device_error()?;
    if device.may_be_partial() {
        Some("The device may have applied part of the batch; check its running config")
    } else if device.is_connection_error() {
        Some("Nothing was sent to the device")
    } else {
        None
    }
}

fn explain_device_error(err: &circuitkit::Error) {
    if let Some(hint) = device_error_hint(err) {
        crate::ui::dim(hint);
    }
}

/// Close both sessions; failures are logged, not returned.
fn close_pair(a: &mut Device, z: &mut Device) {
    for device in [a, z] {
        if let Err(e) = device.close() {
            log::warn!("Failed to close session to {}: {}", device.address(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuitkit::Side;

    fn push_error(source: devicekit::Error) -> circuitkit::Error {
        circuitkit::Error::Push {
            side: Side::A,
            address: "10.0.0.1".to_string(),
            source,
        }
    }

    #[test]
    fn test_device_error_hint() {
        let rejected = push_error(devicekit::Error::PushFailed {
            address: "10.0.0.1".to_string(),
            message: "% Invalid input".to_string(),
        });
        assert!(device_error_hint(&rejected).is_some_and(|h| h.contains("part of the batch")));

        let closed = push_error(devicekit::Error::Closed("10.0.0.1".to_string()));
        assert_eq!(device_error_hint(&closed), Some("Nothing was sent to the device"));

        let half = circuitkit::Error::AsymmetricProvision {
            circuit_id: "0001".to_string(),
            source: Box::new(closed),
        };
        assert_eq!(device_error_hint(&half), Some("Nothing was sent to the device"));

        let missing = circuitkit::Error::LedgerNotFound("10.0.0.1_removal.jsonl".into());
        assert_eq!(device_error_hint(&missing), None);
    }
}
