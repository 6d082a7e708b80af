//! Platter speed control
//!
//! The controller turns a stream of pulse events into a playback speed.
//! A pulse sets the speed from the spacing to the previous pulse: the tighter
//! the spacing, the further from nominal. Between pulses the speed drifts back
//! toward 1.0 at `reflex` per elapsed millisecond.
//!
//! [`SpeedController::step`] is a pure function of the previous state and one
//! event; the async loop that feeds it lives in [`runner`].

pub mod runner;

use crate::input::Pulse;

pub use runner::{LoopSummary, SpeedLoop};

/// Speed delta scale: a pulse `gap` ms after the previous one moves the speed
/// `factor / gap` away from nominal.
pub const DEFAULT_FACTOR: f64 = 30.0;

/// Return-to-nominal rate in speed units per idle millisecond
pub const DEFAULT_REFLEX: f64 = 0.001;

/// Pulse byte meaning "platter pushed forward"
pub const DEFAULT_SPEED_UP_BYTE: u8 = b'2';

/// Lowest speed ever applied
pub const SPEED_FLOOR: f64 = 0.001;

/// Round half up to three decimal places.
///
/// `floor(x * 1000 + 0.5) / 1000`, so `1.0005` rounds to `1.001` rather than
/// to even.
pub fn round_thousandth(x: f64) -> f64 {
    (x * 1000.0 + 0.5).floor() / 1000.0
}

/// Something that accepts the computed pitch every iteration.
pub trait PitchSink {
    fn set_pitch(&self, pitch: f32);
}

/// Tuning of the speed response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedParams {
    pub factor: f64,
    pub reflex: f64,
    pub speed_up_byte: u8,
}

impl Default for SpeedParams {
    fn default() -> Self {
        SpeedParams {
            factor: DEFAULT_FACTOR,
            reflex: DEFAULT_REFLEX,
            speed_up_byte: DEFAULT_SPEED_UP_BYTE,
        }
    }
}

/// Controller state carried from one iteration to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedState {
    /// Unrounded speed multiplier, nominal 1.0
    pub speed: f64,
    /// Timestamp of the previous pulse in milliseconds
    pub prev_tick_ms: i64,
}

impl SpeedState {
    /// Nominal speed, with the first pulse measured against `start_ms`
    pub fn new(start_ms: i64) -> Self {
        SpeedState {
            speed: 1.0,
            prev_tick_ms: start_ms,
        }
    }

    /// Pitch to apply for this state
    pub fn pitch(&self) -> f32 {
        round_thousandth(self.speed) as f32
    }
}

/// One controller input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// No pulse arrived; `elapsed_ms` passed since the previous iteration
    Idle { elapsed_ms: f64 },
    /// A pulse arrived
    Pulse(Pulse),
}

/// Pure speed state machine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeedController {
    params: SpeedParams,
}

impl SpeedController {
    pub fn new(params: SpeedParams) -> Self {
        SpeedController { params }
    }

    pub fn params(&self) -> &SpeedParams {
        &self.params
    }

    /// Advance `state` by one event.
    pub fn step(&self, state: SpeedState, event: ControlEvent) -> SpeedState {
        let mut next = state;

        match event {
            ControlEvent::Idle { elapsed_ms } => {
                next.speed = self.decay(state.speed, elapsed_ms);
            }
            ControlEvent::Pulse(pulse) => {
                let gap = pulse.at_ms - state.prev_tick_ms;
                next.prev_tick_ms = pulse.at_ms;
                next.speed = self.pulse_speed(pulse.byte, gap);
            }
        }

        next.speed = sanitize(next.speed);
        next
    }

    /// Speed implied by one pulse arriving `gap_ms` after the previous one.
    ///
    /// A zero gap divides by zero and yields a non-finite speed, which
    /// [`sanitize`] snaps back to nominal.
    pub fn pulse_speed(&self, byte: u8, gap_ms: i64) -> f64 {
        let direction = if byte == self.params.speed_up_byte {
            self.params.factor
        } else {
            -self.params.factor
        };

        round_thousandth(1.0 + (1.0 / gap_ms as f64) * direction)
    }

    /// Move `speed` toward 1.0 by `reflex` per elapsed millisecond.
    fn decay(&self, speed: f64, elapsed_ms: f64) -> f64 {
        let delta = self.params.reflex * elapsed_ms.max(0.0);
        let rounded = round_thousandth(speed);

        if rounded < 1.0 {
            (speed + delta).min(1.0)
        } else if rounded > 1.0 {
            (speed - delta).max(1.0)
        } else {
            speed
        }
    }
}

/// Clamp a raw speed into the range the source accepts.
///
/// Snaps to exactly 1.0 when it rounds to 1.0 or is not finite, then floors
/// anything rounding to zero or below at [`SPEED_FLOOR`].
pub fn sanitize(speed: f64) -> f64 {
    let mut speed = speed;

    if round_thousandth(speed) == 1.0 || !speed.is_finite() {
        speed = 1.0;
    }
    if round_thousandth(speed) <= 0.0 {
        speed = SPEED_FLOOR;
    }

    speed
}
