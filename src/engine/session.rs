//! Output device activation
//!
//! Resolves the cpal host, the configured (or default) output device, and a
//! stream configuration at the requested sample rate. cpal opens streams in
//! shared mode, so tones mix with whatever else the host is playing.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};

use super::sink::SinkError;
use crate::config::AudioConfig;

/// An output device ready for a stream to be built on it
pub struct ActiveOutput {
    pub device: Device,
    pub device_name: String,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
}

/// Open the configured output device
///
/// Falls back to the device's default configuration when it can't run at
/// the requested sample rate.
pub fn activate(audio: &AudioConfig) -> Result<ActiveOutput, SinkError> {
    let host = cpal::default_host();

    let device = match &audio.device {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
            .ok_or_else(|| SinkError::DeviceNotFound(name.clone()))?,
        None => host.default_output_device().ok_or(SinkError::NoDevice)?,
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let default = device.default_output_config()?;
    let wanted = SampleRate(audio.sample_rate);
    let supported = device
        .supported_output_configs()
        .ok()
        .and_then(|mut configs| {
            configs.find(|c| {
                c.sample_format() == default.sample_format()
                    && c.channels() == default.channels()
                    && c.min_sample_rate() <= wanted
                    && wanted <= c.max_sample_rate()
            })
        })
        .map(|c| c.with_sample_rate(wanted))
        .unwrap_or(default);

    if supported.sample_rate() != wanted {
        log::warn!(
            "{} can't run at {} Hz, using {} Hz",
            device_name,
            audio.sample_rate,
            supported.sample_rate().0
        );
    }

    let buffer_size = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            BufferSize::Fixed((audio.buffer_size as u32).clamp(*min, *max))
        }
        SupportedBufferSize::Unknown => BufferSize::Default,
    };

    let sample_format = supported.sample_format();
    let mut config: StreamConfig = supported.into();
    config.buffer_size = buffer_size;

    Ok(ActiveOutput {
        device,
        device_name,
        config,
        sample_format,
    })
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}
