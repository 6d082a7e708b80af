//! Sample rate matching using rubato
//!
//! The output device rarely runs at the waveform's own rate. The buffer is
//! converted once at session setup so that a pitch of 1.0 advances exactly
//! one buffer frame per device frame.

use crate::audio::types::SoundBuffer;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio from `input_rate` to `output_rate`.
    ///
    /// # Returns
    /// Resampled interleaved audio. If the rates already match, a copy of the
    /// input is returned without resampling.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        if channels == 0 || input_rate == 0 || output_rate == 0 {
            return Err(Error::Decode(format!(
                "Cannot resample {} channel(s) from {}Hz to {}Hz",
                channels, input_rate, output_rate
            )));
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        // rubato expects planar input
        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();

        if input_frames == 0 {
            return Ok(Vec::new());
        }

        let mut resampler =
            Self::create_resampler(input_rate, output_rate, channels, input_frames)?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        let interleaved_output = Self::interleave(planar_output);

        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            interleaved_output.len() / channels as usize
        );

        Ok(interleaved_output)
    }

    /// Return a copy of `buffer` at `output_rate`.
    pub fn resample_buffer(buffer: &SoundBuffer, output_rate: u32) -> Result<SoundBuffer> {
        let samples = Self::resample(
            buffer.samples(),
            buffer.sample_rate(),
            output_rate,
            buffer.channels(),
        )?;

        Ok(SoundBuffer::from_samples(
            samples,
            buffer.channels(),
            output_rate,
        ))
    }

    /// Create a rubato resampler sized to process the whole input in one chunk.
    fn create_resampler(
        input_rate: u32,
        output_rate: u32,
        channels: u16,
        chunk_size: usize,
    ) -> Result<FastFixedIn<f32>> {
        FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // fixed ratio; pitch is applied later by the source
            PolynomialDegree::Septic,
            chunk_size,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))
    }

    /// De-interleave samples into per-channel vectors
    fn deinterleave(input: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let channels = channels as usize;
        let frames = input.len() / channels;
        let mut planar = vec![Vec::with_capacity(frames); channels];

        for frame in input.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                planar[ch].push(sample);
            }
        }

        planar
    }

    /// Re-interleave per-channel vectors
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        let channels = planar.len();
        let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        let mut output = Vec::with_capacity(frames * channels);

        for frame_idx in 0..frames {
            for channel in &planar {
                output.push(channel[frame_idx]);
            }
        }

        output
    }
}
