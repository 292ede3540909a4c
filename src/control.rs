// Per-tick control computation for the kiwi base
//
// One tick: sample inputs, advance edges, toggle field-oriented mode, apply safety,
// re-zero yaw, step manual orientation, then (unless stopped) resolve the frame,
// solve kinematics and dispatch. The diagnostic line and heartbeat are serviced on
// every tick, including stopped ones.

use tracing::{debug, info};

use crate::input::{
    Action, AnalogInputSource, AxisMap, ButtonMap, DigitalInputSource, EdgeDetector,
};
use crate::motor::kinematics::DriveSolution;
use crate::motor::{Actuator, DriveIntent, KiwiKinematics};
use crate::orientation::{FieldOrientationResolver, HeadingSensor, OrientationStep, Resolution};
use crate::safety::{SafetyController, SafetyState};

/// Liveness heartbeat; must be fed every tick
pub trait LivenessSink {
    fn feed(&mut self);
}

/// Best-effort, fire-and-forget text output
pub trait DiagnosticSink {
    fn write_line(&mut self, line: &str);
}

/// Counts heartbeats; the runtime publishes the count with each health report
#[derive(Debug, Default)]
pub struct Heartbeat {
    beats: u64,
}

impl Heartbeat {
    pub fn beats(&self) -> u64 {
        self.beats
    }
}

impl LivenessSink for Heartbeat {
    fn feed(&mut self) {
        self.beats = self.beats.wrapping_add(1);
    }
}

/// Writes diagnostic lines as `debug` events under the `kiwi::diag` target
#[derive(Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn write_line(&mut self, line: &str) {
        debug!(target: "kiwi::diag", "{}", line);
    }
}

/// Process-wide control state
#[derive(Debug, Clone)]
pub struct RobotState {
    /// Radians; keeps accumulating in field-oriented mode
    pub manual_orientation: f32,
    pub field_oriented: bool,
    pub estop: bool,
    /// Last correction derived from a successful heading read
    pub last_heading_correction: Option<f32>,
    pub heading_ok: bool,
}

impl Default for RobotState {
    fn default() -> Self {
        Self {
            manual_orientation: 0.0,
            field_oriented: false,
            estop: false,
            last_heading_correction: None,
            heading_ok: true,
        }
    }
}

/// Everything the loop talks to, built once at startup
pub struct Peripherals<P, H, A, L, D> {
    pub pad: P,
    pub heading: H,
    pub wheels: [A; 3],
    pub liveness: L,
    pub diagnostics: D,
}

/// Outcome of one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub safety: SafetyState,
    pub field_oriented: bool,
    /// `None` when the drive was skipped
    pub resolution: Option<Resolution>,
    pub solution: Option<DriveSolution>,
}

impl TickReport {
    /// Corrected drive values, zero when the drive was skipped
    pub fn corrected(&self) -> DriveIntent {
        self.solution.map(|s| s.corrected).unwrap_or_default()
    }
}

pub struct ControlLoop {
    state: RobotState,
    edges: EdgeDetector,
    buttons: ButtonMap,
    axes: AxisMap,
    resolver: FieldOrientationResolver,
    kinematics: KiwiKinematics,
    safety: SafetyController,
}

impl ControlLoop {
    /// Captures each wheel's startup neutral mode before the first tick
    pub fn new<A: Actuator>(
        buttons: ButtonMap,
        axes: AxisMap,
        kinematics: KiwiKinematics,
        wheels: &[A; 3],
    ) -> Self {
        Self {
            state: RobotState::default(),
            edges: EdgeDetector::new(buttons.count()),
            buttons,
            axes,
            resolver: FieldOrientationResolver,
            kinematics,
            safety: SafetyController::capture(wheels),
        }
    }

    pub fn state(&self) -> &RobotState {
        &self.state
    }

    pub fn safety(&self) -> &SafetyController {
        &self.safety
    }

    /// Re-seed edge history from the pad without firing any action.
    ///
    /// Call when the pad comes back after a dropout. Held buttons stay held, so a
    /// held emergency stop still engages on the next tick.
    pub fn resync_inputs(&mut self, pad: &impl DigitalInputSource) {
        self.edges.resync(pad);
    }

    fn pressed(&self, action: Action) -> bool {
        self.edges.was_pressed(self.buttons.index(action))
    }

    pub fn tick<P, H, A, L, D>(&mut self, io: &mut Peripherals<P, H, A, L, D>) -> TickReport
    where
        P: DigitalInputSource + AnalogInputSource,
        H: HeadingSensor,
        A: Actuator,
        L: LivenessSink,
        D: DiagnosticSink,
    {
        // 1. Sample buttons and sticks
        debug_assert!(io.pad.button_count() >= self.edges.len());
        self.edges.sample(&io.pad);
        let (x, y, twist) = self.axes.read(&io.pad);

        // 2. Field-oriented toggle
        if self.pressed(Action::ToggleFieldOriented) {
            self.state.field_oriented = !self.state.field_oriented;
            info!("Field-oriented drive {}", on_off(self.state.field_oriented));
        }

        // 3. Safety transitions
        let stop_held = self
            .edges
            .is_held(self.buttons.index(Action::EmergencyStop));
        let reset_pressed = self.pressed(Action::ResetEstop);
        let safety = self
            .safety
            .update(&mut self.state, stop_held, reset_pressed, &mut io.wheels);

        // 4. Yaw re-zero
        if self.pressed(Action::ZeroYaw) {
            self.resolver.zero_yaw(&mut io.heading);
        }

        // 5. Manual orientation steps
        for (action, step) in [
            (Action::RotateCW120, OrientationStep::Clockwise120),
            (Action::RotateCCW120, OrientationStep::CounterClockwise120),
            (Action::Rotate180, OrientationStep::Half),
        ] {
            if self.pressed(action) {
                self.resolver.step(&mut self.state, step);
            }
        }

        // 6. Drive
        let (resolution, solution) = if safety == SafetyState::Normal {
            let resolution = self.resolver.resolve(&mut self.state, &mut io.heading);
            let solution = self
                .kinematics
                .solve(DriveIntent::new(x, y, twist), resolution.adjustment);
            let [a, b, c] = &mut io.wheels;
            a.set_speed(solution.wheels.a);
            b.set_speed(solution.wheels.b);
            c.set_speed(solution.wheels.c);
            (Some(resolution), Some(solution))
        } else {
            (None, None)
        };

        let report = TickReport {
            safety,
            field_oriented: self.state.field_oriented,
            resolution,
            solution,
        };

        // 7. Diagnostics
        let corrected = report.corrected();
        let mut line = format!(
            "\t{:.3}\t{:.3}\t{:.3}",
            corrected.x, corrected.y, corrected.twist
        );
        if safety == SafetyState::Estopped {
            line.push_str("\testop");
        }
        io.diagnostics.write_line(&line);

        // 8. Heartbeat
        io.liveness.feed();

        report
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::NeutralMode;
    use crate::orientation::{HeadingError, HeadingSample, OrientationSource};
    use std::f32::consts::TAU;

    const BUTTONS: usize = 10;

    // Small layout: toggle 0, stop 1, cw 2, ccw 3, half 4, zero yaw 5, reset 6
    fn buttons() -> ButtonMap {
        ButtonMap::new(
            &[
                (Action::ToggleFieldOriented, 0),
                (Action::EmergencyStop, 1),
                (Action::RotateCW120, 2),
                (Action::RotateCCW120, 3),
                (Action::Rotate180, 4),
                (Action::ZeroYaw, 5),
                (Action::ResetEstop, 6),
            ],
            BUTTONS,
        )
        .unwrap()
    }

    #[derive(Default)]
    struct Pad {
        held: Vec<usize>,
        axes: [f32; 3],
    }

    impl DigitalInputSource for Pad {
        fn button(&self, index: usize) -> bool {
            assert!(index < BUTTONS);
            self.held.contains(&index)
        }

        fn button_count(&self) -> usize {
            BUTTONS
        }
    }

    impl AnalogInputSource for Pad {
        fn axis(&self, index: usize) -> f32 {
            self.axes[index]
        }
    }

    struct Heading {
        reading: Result<HeadingSample, HeadingError>,
        zero_calls: usize,
    }

    impl HeadingSensor for Heading {
        fn yaw_pitch_roll(&mut self) -> Result<HeadingSample, HeadingError> {
            self.reading.clone()
        }

        fn set_yaw(&mut self, _yaw: f32) -> Result<(), HeadingError> {
            self.zero_calls += 1;
            Err(HeadingError::NotConnected)
        }
    }

    #[derive(Default)]
    struct Wheel {
        speeds: Vec<f32>,
        neutral: Vec<NeutralMode>,
        brake_at_start: bool,
    }

    impl Wheel {
        fn last_speed(&self) -> f32 {
            *self.speeds.last().expect("no speed commanded")
        }
    }

    impl Actuator for Wheel {
        fn set_speed(&mut self, speed: f32) {
            self.speeds.push(speed);
        }

        fn configure_neutral_mode(&mut self, mode: NeutralMode) {
            self.neutral.push(mode);
        }

        fn query_brake_on_neutral(&self) -> bool {
            self.brake_at_start
        }
    }

    #[derive(Default)]
    struct Beats(u32);

    impl LivenessSink for Beats {
        fn feed(&mut self) {
            self.0 += 1;
        }
    }

    #[derive(Default)]
    struct Lines(Vec<String>);

    impl DiagnosticSink for Lines {
        fn write_line(&mut self, line: &str) {
            self.0.push(line.to_string());
        }
    }

    type Io = Peripherals<Pad, Heading, Wheel, Beats, Lines>;

    fn setup(brakes: [bool; 3]) -> (ControlLoop, Io) {
        let io = Peripherals {
            pad: Pad::default(),
            heading: Heading {
                reading: Err(HeadingError::NotConnected),
                zero_calls: 0,
            },
            wheels: brakes.map(|brake_at_start| Wheel {
                brake_at_start,
                ..Wheel::default()
            }),
            liveness: Beats::default(),
            diagnostics: Lines::default(),
        };
        let axes = AxisMap::new(0, 1, 2, false, 3).unwrap();
        let control = ControlLoop::new(buttons(), axes, KiwiKinematics::default(), &io.wheels);
        (control, io)
    }

    fn clear_records(io: &mut Io) {
        for wheel in io.wheels.iter_mut() {
            wheel.speeds.clear();
            wheel.neutral.clear();
        }
    }

    #[test]
    fn test_near_forward_right_stick_drives_wheels() {
        let (mut control, mut io) = setup([true; 3]);
        io.pad.axes = [1.0, 0.001, 0.0];

        let report = control.tick(&mut io);

        assert_eq!(report.safety, SafetyState::Normal);
        assert_eq!(report.resolution.unwrap().source, OrientationSource::Manual);
        let [a, b, c] = &io.wheels;
        assert!((a.last_speed() + 0.866).abs() < 1e-3, "a={}", a.last_speed());
        assert!((b.last_speed() - 0.866).abs() < 1e-3, "b={}", b.last_speed());
        assert_eq!(c.last_speed(), 0.0);
        assert_eq!(io.diagnostics.0, vec!["\t0.000\t1.000\t0.000".to_string()]);
    }

    #[test]
    fn test_estop_zeroes_and_brakes_regardless_of_stick() {
        let (mut control, mut io) = setup([false; 3]);
        io.pad.axes = [0.3, 0.9, -0.7];
        io.pad.held = vec![1];

        let report = control.tick(&mut io);

        assert_eq!(report.safety, SafetyState::Estopped);
        assert!(report.solution.is_none());
        for wheel in &io.wheels {
            assert!(wheel.speeds.iter().all(|&s| s == 0.0));
            assert_eq!(wheel.neutral, vec![NeutralMode::Brake]);
        }
        assert!(io.diagnostics.0[0].ends_with("\testop"));
    }

    #[test]
    fn test_stopped_ticks_skip_the_drive() {
        let (mut control, mut io) = setup([true; 3]);
        io.pad.held = vec![1];
        control.tick(&mut io);

        io.pad.held.clear();
        io.pad.axes = [0.0, 1.0, 0.0];
        clear_records(&mut io);
        let report = control.tick(&mut io);

        assert_eq!(report.safety, SafetyState::Estopped);
        for wheel in &io.wheels {
            assert!(wheel.speeds.is_empty());
            assert!(wheel.neutral.is_empty());
        }
    }

    #[test]
    fn test_reset_restores_startup_modes_and_resumes_drive() {
        let (mut control, mut io) = setup([false, true, false]);
        io.pad.held = vec![1];
        control.tick(&mut io);
        io.pad.held.clear();
        control.tick(&mut io);

        io.pad.held = vec![6];
        io.pad.axes = [0.0, 1.0, 0.0];
        clear_records(&mut io);
        let report = control.tick(&mut io);

        assert_eq!(report.safety, SafetyState::Normal);
        assert_eq!(io.wheels[0].neutral, vec![NeutralMode::Coast]);
        assert_eq!(io.wheels[1].neutral, vec![NeutralMode::Brake]);
        assert_eq!(io.wheels[2].neutral, vec![NeutralMode::Coast]);
        assert!((io.wheels[2].last_speed() + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_heartbeat_fed_every_tick() {
        let (mut control, mut io) = setup([true; 3]);
        control.tick(&mut io);
        io.pad.held = vec![1];
        control.tick(&mut io);
        io.pad.held = vec![0];
        control.tick(&mut io);

        assert_eq!(io.liveness.0, 3);
        assert_eq!(io.diagnostics.0.len(), 3);
    }

    #[test]
    fn test_held_toggle_flips_once() {
        let (mut control, mut io) = setup([true; 3]);
        io.pad.held = vec![0];
        for _ in 0..4 {
            control.tick(&mut io);
        }
        assert!(control.state().field_oriented);

        io.pad.held.clear();
        control.tick(&mut io);
        io.pad.held = vec![0];
        control.tick(&mut io);
        assert!(!control.state().field_oriented);
    }

    #[test]
    fn test_field_oriented_without_sensor_keeps_driving() {
        let (mut control, mut io) = setup([true; 3]);
        io.pad.held = vec![0];
        io.pad.axes = [0.0, 1.0, 0.0];

        let report = control.tick(&mut io);

        assert!(report.field_oriented);
        let resolution = report.resolution.unwrap();
        assert!(resolution.heading_failed());
        assert_eq!(resolution.adjustment, 0.0);
        assert!((io.wheels[2].last_speed() + 1.0).abs() < 1e-3);
        assert!(!control.state().heading_ok);
        assert_eq!(io.liveness.0, 1);
    }

    #[test]
    fn test_field_oriented_uses_heading_correction() {
        let (mut control, mut io) = setup([true; 3]);
        io.heading.reading = Ok(HeadingSample {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        });
        io.pad.held = vec![0];
        io.pad.axes = [0.0, 1.0, 0.0];

        let report = control.tick(&mut io);

        // Zero yaw corrects by +90°: forward stick lands on -y'
        let corrected = report.corrected();
        assert_eq!(corrected.x, 0.0);
        assert!((corrected.y + 1.0).abs() < 1e-3);
        assert_eq!(report.resolution.unwrap().source, OrientationSource::Heading);
    }

    #[test]
    fn test_manual_steps_accumulate_across_ticks() {
        let (mut control, mut io) = setup([true; 3]);
        for _ in 0..3 {
            io.pad.held = vec![2];
            control.tick(&mut io);
            io.pad.held.clear();
            control.tick(&mut io);
        }
        assert!((control.state().manual_orientation - TAU).abs() < 1e-5);

        // Still accumulates while field-oriented
        io.pad.held = vec![0, 4];
        control.tick(&mut io);
        assert!(control.state().field_oriented);
        assert!((control.state().manual_orientation - (TAU + std::f32::consts::PI)).abs() < 1e-4);
    }

    #[test]
    fn test_zero_yaw_once_per_press_and_failure_absorbed() {
        let (mut control, mut io) = setup([true; 3]);
        io.pad.held = vec![5];
        control.tick(&mut io);
        control.tick(&mut io);
        io.pad.held.clear();
        control.tick(&mut io);
        io.pad.held = vec![5];
        let report = control.tick(&mut io);

        assert_eq!(io.heading.zero_calls, 2);
        assert_eq!(report.safety, SafetyState::Normal);
        assert_eq!(io.liveness.0, 4);
    }

    #[test]
    fn test_startup_modes_captured_before_first_tick() {
        let (control, _io) = setup([true, false, true]);
        assert_eq!(
            control.safety().initial_neutral(),
            [NeutralMode::Brake, NeutralMode::Coast, NeutralMode::Brake]
        );
    }

    #[test]
    fn test_button_held_through_dropout_does_not_refire() {
        let (mut control, mut io) = setup([true; 3]);
        io.pad.held = vec![0, 6];
        control.tick(&mut io);
        assert!(control.state().field_oriented);

        // Dropout: a stale pad reads released
        io.pad.held.clear();
        control.tick(&mut io);

        // Frames resume with the same buttons still down
        io.pad.held = vec![0, 6];
        control.resync_inputs(&io.pad);
        control.tick(&mut io);
        assert!(control.state().field_oriented);

        io.pad.held.clear();
        control.tick(&mut io);
        io.pad.held = vec![0];
        control.tick(&mut io);
        assert!(!control.state().field_oriented);
    }

    #[test]
    fn test_stop_held_through_dropout_still_engages() {
        let (mut control, mut io) = setup([true; 3]);
        io.pad.held = vec![1];
        control.resync_inputs(&io.pad);

        let report = control.tick(&mut io);

        assert_eq!(report.safety, SafetyState::Estopped);
        assert!(control.state().estop);
    }
}
