//! Audio output using cpal
//!
//! Owns the output device and, once started, the single playback stream.
//! The stream pulls one [`AudioFrame`] at a time from a callback on the
//! cpal audio thread.

use crate::audio::AudioFrame;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Count of stream errors reported by the audio thread
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available audio output devices.
    ///
    /// # Returns
    /// Vector of device names
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device). A name
    ///   that is not found falls back to the default device.
    /// - `preferred_rate`: Sample rate to request if the device supports it,
    ///   so the waveform can skip resampling.
    ///
    /// # Errors
    /// - No default output device
    /// - Failed to query the device configuration
    pub fn new(device_name: Option<&str>, preferred_rate: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host.output_devices().map_err(|e| {
                    Error::AudioOutput(format!("Failed to enumerate devices: {}", e))
                })?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!(
                            "Requested device '{}' not found, falling back to default device",
                            name
                        );
                        Self::default_device(&host)?
                    }
                }
            }
            None => Self::default_device(&host)?,
        };

        let (config, sample_format) = Self::get_best_config(&device, preferred_rate)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    fn default_device(host: &cpal::Host) -> Result<Device> {
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("Unable to open default device".to_string()))?;

        info!(
            "Using default audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        Ok(device)
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers stereo f32 at `preferred_rate`; otherwise the device default.
    fn get_best_config(
        device: &Device,
        preferred_rate: Option<u32>,
    ) -> Result<(StreamConfig, SampleFormat)> {
        if let Some(rate) = preferred_rate {
            let mut supported_configs = device
                .supported_output_configs()
                .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

            let preferred = supported_configs.find(|config| {
                config.channels() == 2
                    && config.min_sample_rate().0 <= rate
                    && config.max_sample_rate().0 >= rate
                    && config.sample_format() == SampleFormat::F32
            });

            if let Some(supported_config) = preferred {
                let sample_format = supported_config.sample_format();
                let config = supported_config
                    .with_sample_rate(cpal::SampleRate(rate))
                    .config();
                return Ok((config, sample_format));
            }
        }

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        Ok((supported_config.config(), sample_format))
    }

    /// Start the output stream.
    ///
    /// `callback` runs on the real-time audio thread once per output frame
    /// and must not block.
    pub fn start<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut() -> AudioFrame + Send + 'static,
    {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32, F>(callback)?,
            SampleFormat::I16 => self.build_stream::<i16, F>(callback)?,
            SampleFormat::U16 => self.build_stream::<u16, F>(callback)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);

        info!("Audio stream started successfully");
        Ok(())
    }

    /// Build an output stream converting f32 frames to the device sample type.
    fn build_stream<T, F>(&self, mut callback: F) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
        F: FnMut() -> AudioFrame + Send + 'static,
    {
        let channels = self.config.channels as usize;
        let error_count = Arc::clone(&self.error_count);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let audio_frame = callback();
                        let left = audio_frame.left.clamp(-1.0, 1.0);
                        let right = audio_frame.right.clamp(-1.0, 1.0);

                        frame[0] = T::from_sample(left);
                        if channels > 1 {
                            frame[1] = T::from_sample(right);
                        }
                        // Extra channels beyond stereo stay silent
                        for extra in frame.iter_mut().skip(2) {
                            *extra = T::EQUILIBRIUM;
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_count.fetch_add(1, Ordering::Relaxed);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Stop audio playback.
    ///
    /// Pauses the stream and drops it; the device stays open.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            debug!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
            drop(stream);
        }

        Ok(())
    }

    /// Get device name.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get channel count.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Number of stream errors reported since the stream started
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Relaxed)
    }
}

/// Print the device list banner.
///
/// Enumeration failure is not fatal: it is logged, the frame is printed
/// empty and the default device is still opened afterwards.
pub fn write_device_list<W: Write>(out: &mut W, devices: Result<Vec<String>>) -> io::Result<()> {
    writeln!(out, "Devices list:")?;
    writeln!(out, "----------")?;
    match devices {
        Ok(names) => {
            for name in names {
                writeln!(out, "{}", name)?;
            }
        }
        Err(e) => warn!("Device enumeration not available: {}", e),
    }
    writeln!(out, "----------")
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        // Ensure stream is stopped on drop
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_error_is_audio_output() {
        // Hosts without audio hardware may fail enumeration
        match AudioOutput::list_devices() {
            Ok(_) => {}
            Err(e) => assert!(matches!(e, Error::AudioOutput(_)), "unexpected error: {}", e),
        }
    }

    #[test]
    fn test_device_list_framed() {
        let mut out = Vec::new();
        let devices = Ok(vec!["Speakers".to_string(), "Headphones".to_string()]);
        write_device_list(&mut out, devices).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Devices list:\n----------\nSpeakers\nHeadphones\n----------\n"
        );
    }

    #[test]
    fn test_device_list_enumeration_failure_is_not_fatal() {
        let mut out = Vec::new();
        let devices = Err(Error::AudioOutput("no backend".to_string()));
        write_device_list(&mut out, devices).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Devices list:\n----------\n----------\n"
        );
    }
}
