//! Looping playback source with a live pitch parameter
//!
//! The source owns a read position into a shared [`SoundBuffer`] and is
//! driven from the audio callback. Pitch is a playback-rate multiplier: the
//! read position advances `pitch` buffer frames per output frame, with
//! linear interpolation between neighbouring frames.
//!
//! The control side never touches the source directly. It holds a
//! [`SourceHandle`] whose pitch and play state are atomics, so the audio
//! thread never waits on a lock.

use crate::audio::types::{AudioFrame, SoundBuffer};
use crate::control::PitchSink;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// A point or direction in listener space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn distance(self, other: Vec3) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// The single listener of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Facing direction
    pub at: Vec3,
    pub up: Vec3,
}

impl Default for Listener {
    /// One unit in front of the origin, looking along +z with +y up
    fn default() -> Self {
        Listener {
            position: Vec3::new(0.0, 0.0, 1.0),
            velocity: Vec3::default(),
            at: Vec3::new(0.0, 0.0, 1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

impl Listener {
    /// Inverse-distance-clamped attenuation for a source at `source_position`.
    ///
    /// Reference distance and rolloff are both 1, so anything within one
    /// unit of the listener plays at full gain.
    pub fn distance_gain(&self, source_position: Vec3) -> f32 {
        const REFERENCE_DISTANCE: f32 = 1.0;
        const ROLLOFF: f32 = 1.0;

        let distance = self
            .position
            .distance(source_position)
            .max(REFERENCE_DISTANCE);

        REFERENCE_DISTANCE / (REFERENCE_DISTANCE + ROLLOFF * (distance - REFERENCE_DISTANCE))
    }
}

/// Initial parameters of a playback source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceParams {
    pub pitch: f32,
    pub gain: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub looping: bool,
}

impl Default for SourceParams {
    fn default() -> Self {
        SourceParams {
            pitch: 1.0,
            gain: 1.0,
            position: Vec3::default(),
            velocity: Vec3::default(),
            looping: true,
        }
    }
}

/// Cloneable control handle for a playing source.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    pitch: Arc<AtomicU32>,
    playing: Arc<AtomicBool>,
}

impl SourceHandle {
    fn new(pitch: f32) -> Self {
        SourceHandle {
            pitch: Arc::new(AtomicU32::new(pitch.to_bits())),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Assign the source pitch. Lock-free, callable from any thread.
    pub fn set_pitch(&self, pitch: f32) {
        self.pitch.store(pitch.to_bits(), Ordering::Relaxed);
    }

    /// Current source pitch
    pub fn pitch(&self) -> f32 {
        f32::from_bits(self.pitch.load(Ordering::Relaxed))
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Stop the source; the audio callback outputs silence from then on.
    pub fn stop(&self) {
        self.playing.store(false, Ordering::Release);
    }
}

impl PitchSink for SourceHandle {
    fn set_pitch(&self, pitch: f32) {
        SourceHandle::set_pitch(self, pitch);
    }
}

/// A buffer-backed source rendered frame by frame in the audio callback.
pub struct LoopingSource {
    buffer: Arc<SoundBuffer>,
    /// Read position in buffer frames
    position: f64,
    gain: f32,
    looping: bool,
    handle: SourceHandle,
}

impl LoopingSource {
    /// Attach `buffer` to a new, stopped source.
    ///
    /// `listener` only affects the source through distance attenuation,
    /// which is folded into the gain once here.
    pub fn new(buffer: Arc<SoundBuffer>, params: &SourceParams, listener: &Listener) -> Self {
        let attenuation = listener.distance_gain(params.position);
        debug!(
            "Source created: pitch={}, gain={}, attenuation={}, looping={}",
            params.pitch, params.gain, attenuation, params.looping
        );

        LoopingSource {
            buffer,
            position: 0.0,
            gain: params.gain * attenuation,
            looping: params.looping,
            handle: SourceHandle::new(params.pitch),
        }
    }

    /// Control handle sharing this source's pitch and play state
    pub fn handle(&self) -> SourceHandle {
        self.handle.clone()
    }

    /// Start (or restart) playback from the current position
    pub fn play(&mut self) {
        self.handle.playing.store(true, Ordering::Release);
    }

    /// Read position in buffer frames
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Effective gain after distance attenuation
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Render the next output frame and advance by the current pitch.
    pub fn next_frame(&mut self) -> AudioFrame {
        if !self.handle.is_playing() {
            return AudioFrame::zero();
        }

        let frames = self.buffer.frames();
        if frames == 0 {
            return AudioFrame::zero();
        }

        let index = self.position as usize;
        let fraction = (self.position - index as f64) as f32;

        let current = self.buffer.frame(index).unwrap_or_else(AudioFrame::zero);
        let next_index = if index + 1 < frames {
            index + 1
        } else if self.looping {
            0
        } else {
            index
        };
        let next = self.buffer.frame(next_index).unwrap_or(current);

        let mut frame = current.lerp(next, fraction);
        frame.apply_volume(self.gain);

        let step = self.handle.pitch().max(0.0) as f64;
        self.position += step;

        let end = frames as f64;
        if self.position >= end {
            if self.looping {
                self.position %= end;
            } else {
                self.position = end;
                self.handle.stop();
            }
        }

        frame
    }
}

/// Shared home of the source between the session and the audio callback.
///
/// The callback renders through the slot; the session empties it on
/// teardown, which releases the source and its buffer reference before the
/// stream is destroyed.
#[derive(Clone)]
pub struct SourceSlot {
    inner: Arc<Mutex<Option<LoopingSource>>>,
}

impl SourceSlot {
    pub fn new(source: LoopingSource) -> Self {
        SourceSlot {
            inner: Arc::new(Mutex::new(Some(source))),
        }
    }

    /// Render one frame; silence once deleted or while the session holds the lock.
    pub fn render(&self) -> AudioFrame {
        match self.inner.try_lock() {
            Ok(mut slot) => slot
                .as_mut()
                .map(LoopingSource::next_frame)
                .unwrap_or_else(AudioFrame::zero),
            Err(_) => AudioFrame::zero(),
        }
    }

    /// Stop and drop the source. Returns false if it was already deleted.
    pub fn delete(&self) -> bool {
        let source = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match source {
            Some(source) => {
                source.handle.stop();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_buffer(frames: usize) -> Arc<SoundBuffer> {
        let samples = (0..frames).map(|i| i as f32 / frames as f32).collect();
        Arc::new(SoundBuffer::from_samples(samples, 1, 8000))
    }

    fn ramp_source(frames: usize) -> LoopingSource {
        LoopingSource::new(
            ramp_buffer(frames),
            &SourceParams::default(),
            &Listener::default(),
        )
    }

    #[test]
    fn test_default_listener_gain_is_unity() {
        let listener = Listener::default();
        assert_eq!(listener.distance_gain(SourceParams::default().position), 1.0);
    }

    #[test]
    fn test_distance_gain_falls_off() {
        let listener = Listener::default();
        let gain = listener.distance_gain(Vec3::new(0.0, 0.0, -1.0));
        assert!((gain - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stopped_source_is_silent() {
        let mut source = ramp_source(4);
        assert_eq!(source.next_frame(), AudioFrame::zero());
        assert_eq!(source.position(), 0.0);
    }

    #[test]
    fn test_unit_pitch_reads_frames_in_order() {
        let mut source = ramp_source(4);
        source.play();

        let lefts: Vec<f32> = (0..4).map(|_| source.next_frame().left).collect();
        assert_eq!(lefts, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_looping_wraps_to_start() {
        let mut source = ramp_source(4);
        source.play();

        for _ in 0..4 {
            source.next_frame();
        }
        assert_eq!(source.position(), 0.0);
        assert_eq!(source.next_frame().left, 0.0);
        assert!(source.handle().is_playing());
    }

    #[test]
    fn test_non_looping_source_stops_at_end() {
        let params = SourceParams {
            looping: false,
            ..SourceParams::default()
        };
        let mut source = LoopingSource::new(ramp_buffer(2), &params, &Listener::default());
        source.play();

        source.next_frame();
        source.next_frame();
        assert!(!source.handle().is_playing());
        assert_eq!(source.next_frame(), AudioFrame::zero());
    }

    #[test]
    fn test_pitch_two_skips_every_other_frame() {
        let mut source = ramp_source(8);
        let handle = source.handle();
        handle.set_pitch(2.0);
        source.play();

        let lefts: Vec<f32> = (0..4).map(|_| source.next_frame().left).collect();
        assert_eq!(lefts, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_half_pitch_interpolates() {
        let mut source = ramp_source(4);
        source.handle().set_pitch(0.5);
        source.play();

        let lefts: Vec<f32> = (0..3).map(|_| source.next_frame().left).collect();
        assert_eq!(lefts, vec![0.0, 0.125, 0.25]);
    }

    #[test]
    fn test_gain_scales_output() {
        let params = SourceParams {
            gain: 0.5,
            ..SourceParams::default()
        };
        let mut source = LoopingSource::new(ramp_buffer(4), &params, &Listener::default());
        source.play();
        source.next_frame();
        assert_eq!(source.next_frame().left, 0.125);
    }

    #[test]
    fn test_handle_pitch_roundtrip() {
        let source = ramp_source(4);
        let handle = source.handle();
        assert_eq!(handle.pitch(), 1.0);
        handle.set_pitch(1.3);
        assert_eq!(handle.pitch(), 1.3);
    }

    #[test]
    fn test_slot_delete_releases_buffer() {
        let buffer = ramp_buffer(4);
        let mut source = LoopingSource::new(
            Arc::clone(&buffer),
            &SourceParams::default(),
            &Listener::default(),
        );
        source.play();
        let handle = source.handle();

        let slot = SourceSlot::new(source);
        let callback_side = slot.clone();
        callback_side.render();
        assert_eq!(callback_side.render().left, 0.25);
        assert_eq!(Arc::strong_count(&buffer), 2);

        assert!(slot.delete());
        assert_eq!(Arc::strong_count(&buffer), 1);
        assert!(!handle.is_playing());
        assert_eq!(callback_side.render(), AudioFrame::zero());
        assert!(!slot.delete());
    }
}
