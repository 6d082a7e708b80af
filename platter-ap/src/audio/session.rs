//! Audio output session
//!
//! Setup order: open the output device, configure the listener, create the
//! source and buffer, upload the waveform, attach it and start playback.
//! Dropping the session tears everything down in order: source, buffer,
//! stream, device.

use crate::audio::output::AudioOutput;
use crate::audio::resampler::Resampler;
use crate::audio::source::{Listener, LoopingSource, SourceHandle, SourceParams, SourceSlot};
use crate::audio::types::{PcmFormat, SoundBuffer};
use crate::audio::WaveData;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session options
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Output device name (None = default device)
    pub device_name: Option<String>,
    /// Source gain, 0.0 - 1.0
    pub gain: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            device_name: None,
            gain: 1.0,
        }
    }
}

/// A single looping waveform playing on an open output device.
pub struct AudioSession {
    output: Option<AudioOutput>,
    slot: SourceSlot,
    handle: SourceHandle,
    buffer: Option<Arc<SoundBuffer>>,
}

impl AudioSession {
    /// Open the output device and start `wave` playing in a loop.
    ///
    /// # Errors
    /// - The wave layout has no PCM format mapping
    /// - The PCM data is malformed
    /// - No output device, or the stream cannot be built or started
    pub fn open(config: &SessionConfig, wave: &WaveData) -> Result<Self> {
        let format = PcmFormat::from_layout(wave.channels, wave.bits_per_sample).ok_or(
            Error::UnsupportedFormat {
                channels: wave.channels,
                bits_per_sample: wave.bits_per_sample,
            },
        )?;

        // More than two channels map to stereo, but the bytes would not line up
        if format.channels() != wave.channels {
            return Err(Error::UnsupportedFormat {
                channels: wave.channels,
                bits_per_sample: wave.bits_per_sample,
            });
        }

        let mut output =
            AudioOutput::new(config.device_name.as_deref(), Some(wave.sample_rate))?;

        let listener = Listener::default();
        debug!(
            "Listener at {:?}, facing {:?}, up {:?}",
            listener.position, listener.at, listener.up
        );

        let params = SourceParams {
            gain: config.gain,
            ..SourceParams::default()
        };

        let uploaded = SoundBuffer::from_pcm(format, &wave.data, wave.sample_rate)?;
        info!(
            "Buffer uploaded: {:?}, {} frames, {} ms",
            format,
            uploaded.frames(),
            uploaded.duration_ms()
        );

        let buffer = Arc::new(Resampler::resample_buffer(&uploaded, output.sample_rate())?);

        let mut source = LoopingSource::new(Arc::clone(&buffer), &params, &listener);
        let handle = source.handle();
        source.play();

        let slot = SourceSlot::new(source);
        let render = slot.clone();
        output.start(move || render.render())?;

        Ok(Self {
            output: Some(output),
            slot,
            handle,
            buffer: Some(buffer),
        })
    }

    /// Pitch control for the playing source
    pub fn pitch_control(&self) -> SourceHandle {
        self.handle.clone()
    }

    pub fn device_name(&self) -> String {
        self.output
            .as_ref()
            .map(AudioOutput::device_name)
            .unwrap_or_else(|| "Closed".to_string())
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        if self.slot.delete() {
            debug!("Source deleted");
        }

        // The slot held the only other reference, so this frees the samples
        if self.buffer.take().is_some() {
            debug!("Buffer deleted");
        }

        if let Some(mut output) = self.output.take() {
            if output.error_count() > 0 {
                warn!("Audio stream reported {} error(s)", output.error_count());
            }
            if let Err(e) = output.stop() {
                warn!("Failed to stop audio stream: {}", e);
            }
            debug!("Stream destroyed");
            drop(output);
            debug!("Device closed");
        }

        info!("Audio session closed");
    }
}
