//! Input device enumeration through the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use turn_capture_core::models::error::CaptureError;

/// An input device and its default capture format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rate: u32,
    pub channels: u16,
}

/// List input devices that report a default input configuration.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::Unknown(format!("failed to enumerate input devices: {e}")))?;

    let mut infos = Vec::new();
    for (i, device) in devices.enumerate() {
        let config = match device.default_input_config() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("skipping input device {i}: {e}");
                continue;
            }
        };
        let name = device.name().unwrap_or_else(|_| format!("Input {i}"));
        infos.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        });
    }
    Ok(infos)
}

/// The named input device, or the default one when `name` is `None`.
pub(crate) fn find_input_device(
    host: &cpal::Host,
    name: Option<&str>,
) -> Result<cpal::Device, CaptureError> {
    let Some(name) = name else {
        return host.default_input_device().ok_or(CaptureError::DeviceNotAvailable);
    };
    let mut devices = host
        .input_devices()
        .map_err(|e| CaptureError::Unknown(format!("failed to enumerate input devices: {e}")))?;
    devices
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .ok_or(CaptureError::DeviceNotAvailable)
}
