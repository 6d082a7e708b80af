//! Speed control loop
//!
//! Each iteration waits at most one poll interval for a pulse. A timeout
//! becomes an Idle event carrying the time since the previous iteration; a
//! pulse becomes a Pulse event. Either way the new pitch is pushed to the
//! sink and the speed readout is refreshed, every iteration.

use crate::control::{ControlEvent, PitchSink, SpeedController, SpeedState};
use crate::input::PulseInput;
use platter_common::time::current_timestamp_ms;
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default upper bound on one iteration's wait for a pulse
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What a finished loop did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub iterations: u64,
    pub pulses: u64,
    pub final_state: SpeedState,
}

/// The control loop: controller, pitch sink and readout writer.
pub struct SpeedLoop<S, W> {
    controller: SpeedController,
    sink: S,
    readout: W,
    poll_interval: Duration,
}

impl<S, W> SpeedLoop<S, W>
where
    S: PitchSink,
    W: Write,
{
    pub fn new(controller: SpeedController, sink: S, readout: W, poll_interval: Duration) -> Self {
        SpeedLoop {
            controller,
            sink,
            readout,
            poll_interval,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn readout(&self) -> &W {
        &self.readout
    }

    /// Run from nominal speed until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, input: &mut PulseInput, shutdown: F) -> LoopSummary
    where
        F: Future<Output = ()>,
    {
        self.run_from(SpeedState::new(current_timestamp_ms()), input, shutdown)
            .await
    }

    /// Run from `state` until `shutdown` resolves.
    ///
    /// Shutdown is checked before every wait, so a resolved shutdown future
    /// ends the loop without another iteration.
    pub async fn run_from<F>(
        &mut self,
        mut state: SpeedState,
        input: &mut PulseInput,
        shutdown: F,
    ) -> LoopSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Speed control running (poll {:?}, factor {}, reflex {}/ms)",
            self.poll_interval,
            self.controller.params().factor,
            self.controller.params().reflex
        );

        let mut iterations = 0u64;
        let mut pulses = 0u64;
        let mut last_iteration = Instant::now();

        loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                pulse = input.recv_timeout(self.poll_interval) => pulse,
            };

            let now = Instant::now();
            let elapsed_ms = now.duration_since(last_iteration).as_secs_f64() * 1000.0;
            last_iteration = now;

            let event = match received {
                Some(pulse) => {
                    pulses += 1;
                    debug!(
                        "Pulse {:?} after {} ms",
                        pulse.byte as char,
                        pulse.at_ms - state.prev_tick_ms
                    );
                    ControlEvent::Pulse(pulse)
                }
                None => ControlEvent::Idle { elapsed_ms },
            };

            state = self.controller.step(state, event);
            self.sink.set_pitch(state.pitch());

            // Readout failures (closed stdout) never stop playback
            let _ = write!(self.readout, "Speed: {:.6}\r", state.speed);
            let _ = self.readout.flush();

            iterations += 1;
        }

        let _ = writeln!(self.readout);
        info!(
            "Speed control stopped after {} iterations ({} pulses)",
            iterations, pulses
        );

        LoopSummary {
            iterations,
            pulses,
            final_state: state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Pulse;
    use std::cell::RefCell;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingSink {
        pitches: RefCell<Vec<f32>>,
    }

    impl PitchSink for RecordingSink {
        fn set_pitch(&self, pitch: f32) {
            self.pitches.borrow_mut().push(pitch);
        }
    }

    fn speed_loop() -> SpeedLoop<RecordingSink, Vec<u8>> {
        SpeedLoop::new(
            SpeedController::default(),
            RecordingSink::default(),
            Vec::new(),
            DEFAULT_POLL_INTERVAL,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_shutdown_runs_no_iterations() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut input = PulseInput::from_receiver(rx, "test");
        let mut speed_loop = speed_loop();

        let summary = speed_loop
            .run_from(SpeedState::new(0), &mut input, std::future::ready(()))
            .await;

        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.final_state, SpeedState::new(0));
        assert!(speed_loop.sink().pitches.borrow().is_empty());
        assert_eq!(speed_loop.readout().as_slice(), b"\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_then_idle_decay() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Pulse {
            byte: b'2',
            at_ms: 100,
        })
        .unwrap();
        let mut input = PulseInput::from_receiver(rx, "test");
        let mut speed_loop = speed_loop();

        let summary = speed_loop
            .run_from(
                SpeedState::new(0),
                &mut input,
                tokio::time::sleep(Duration::from_millis(20)),
            )
            .await;

        assert_eq!(summary.pulses, 1);
        assert!(summary.iterations > 1);
        assert_eq!(summary.final_state.prev_tick_ms, 100);
        assert!(summary.final_state.speed < 1.3);
        assert!(summary.final_state.speed > 1.25);

        let pitches = speed_loop.sink().pitches.borrow();
        assert_eq!(pitches.len() as u64, summary.iterations);
        assert_eq!(pitches[0], 1.3_f32);
        assert!(pitches.windows(2).all(|w| w[1] <= w[0]));

        let readout = String::from_utf8(speed_loop.readout().clone()).unwrap();
        assert!(readout.starts_with("Speed: 1.300000\r"));
        drop(tx);
    }
}
