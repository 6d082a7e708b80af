//! Speed controller behaviour across whole event sequences

use platter_ap::control::{
    round_thousandth, ControlEvent, SpeedController, SpeedParams, SpeedState, SPEED_FLOOR,
};
use platter_ap::input::Pulse;

const SLOW_REFLEX: f64 = 0.000001;

fn slow_controller() -> SpeedController {
    SpeedController::new(SpeedParams {
        reflex: SLOW_REFLEX,
        ..SpeedParams::default()
    })
}

fn idle_ms() -> ControlEvent {
    ControlEvent::Idle { elapsed_ms: 1.0 }
}

/// Step 1 ms idles until the speed reaches 1.0, checking every step.
fn run_idle_to_nominal(start: f64, rising: bool) -> usize {
    let controller = slow_controller();
    let mut state = SpeedState {
        speed: start,
        prev_tick_ms: 0,
    };

    let mut steps = 0;
    while state.speed != 1.0 {
        let next = controller.step(state, idle_ms());
        if next.speed != 1.0 {
            let delta = if rising {
                next.speed - state.speed
            } else {
                state.speed - next.speed
            };
            assert!(delta > 0.0, "speed did not move at {}", state.speed);
            assert!((delta - SLOW_REFLEX).abs() < 1e-9);
        }
        state = next;
        steps += 1;
        assert!(steps < 600_000, "idle decay never reached nominal");
    }
    steps
}

#[test]
fn test_rounding_half_up() {
    assert_eq!(round_thousandth(1.0), 1.0);
    assert_eq!(round_thousandth(1.0004), 1.0);
    assert_eq!(round_thousandth(1.0005), 1.001);
    assert_eq!(round_thousandth(-0.0005), 0.0);
}

#[test]
fn test_idle_rises_from_half_speed() {
    let steps = run_idle_to_nominal(0.5, true);
    // Snaps once the speed rounds to 1.000, about 0.4995 / reflex steps in
    assert!((499_000..=500_001).contains(&steps), "took {} steps", steps);
}

#[test]
fn test_idle_falls_from_one_and_a_half() {
    let steps = run_idle_to_nominal(1.5, false);
    assert!((499_000..=500_001).contains(&steps), "took {} steps", steps);
}

#[test]
fn test_pulse_gap_speeds() {
    let controller = SpeedController::default();

    let up = controller.step(
        SpeedState::new(0),
        ControlEvent::Pulse(Pulse {
            byte: b'2',
            at_ms: 100,
        }),
    );
    assert_eq!(up.speed, 1.3);

    let down = controller.step(
        SpeedState::new(0),
        ControlEvent::Pulse(Pulse {
            byte: b'5',
            at_ms: 30,
        }),
    );
    assert_eq!(down.speed, SPEED_FLOOR);
    assert_eq!(down.pitch(), 0.001_f32);
}

#[test]
fn test_zero_gap_is_nominal() {
    let controller = SpeedController::default();
    let state = controller.step(
        SpeedState::new(42),
        ControlEvent::Pulse(Pulse {
            byte: b'9',
            at_ms: 42,
        }),
    );
    assert_eq!(state.speed, 1.0);
}

#[test]
fn test_gap_is_measured_from_latest_pulse() {
    let controller = SpeedController::default();
    let mut state = SpeedState::new(0);

    for at_ms in [100, 200, 300] {
        state = controller.step(
            state,
            ControlEvent::Pulse(Pulse { byte: b'2', at_ms }),
        );
        state = controller.step(state, ControlEvent::Idle { elapsed_ms: 2.0 });
    }

    assert_eq!(state.prev_tick_ms, 300);
    // 1.3 after the last pulse, minus 2 ms of decay
    assert!((state.speed - 1.298).abs() < 1e-9);
}

#[test]
fn test_negative_gap_slows_down() {
    // A pulse stamped before the previous one flips the direction of the delta
    let controller = SpeedController::default();
    let state = controller.step(
        SpeedState::new(1_000),
        ControlEvent::Pulse(Pulse {
            byte: b'2',
            at_ms: 900,
        }),
    );
    assert_eq!(state.speed, 0.7);
}

#[test]
fn test_pitch_never_below_floor() {
    let controller = SpeedController::default();
    let mut state = SpeedState::new(0);

    for (i, byte) in [b'1', b'5', b'7', b'2', b'0'].into_iter().enumerate() {
        state = controller.step(
            state,
            ControlEvent::Pulse(Pulse {
                byte,
                at_ms: (i as i64 + 1) * 7,
            }),
        );
        assert!(state.pitch() >= 0.001_f32);
        assert!(state.speed.is_finite());
    }
}
