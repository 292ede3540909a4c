// Loop timing, topics, thresholds and the button/axis layout
use clap::Parser;
use std::time::Duration;

use crate::input::{Action, AxisMap, ButtonMap, ConfigError};
use crate::motor::NeutralMode;

// Runtime loop frequency (20 ms period)
pub const LOOP_HZ: u64 = 50;

// Pad frames older than this read as released buttons and centered sticks
pub const PAD_TIMEOUT: Duration = Duration::from_millis(250);

// Heading samples older than this are reported as stale
pub const HEADING_TIMEOUT: Duration = Duration::from_millis(100);

// Zenoh topics
pub const TOPIC_CMD_PAD: &str = "kiwi/cmd/pad"; // gamepad frames
pub const TOPIC_STATE_IMU: &str = "kiwi/state/imu"; // heading samples
pub const TOPIC_RT_BASE: &str = "kiwi/rt/base"; // actuation
pub const TOPIC_HEALTH: &str = "kiwi/state/health"; // health + heartbeat

// Deadband thresholds: joystick channels, then wheel outputs
pub const TRANSLATE_DEADBAND: f32 = 0.05;
pub const WHEEL_DEADBAND: f32 = 0.07;

// Size of the tracked button table
pub const BUTTON_COUNT: usize = 20;
pub const AXIS_COUNT: usize = 3;

/// Physical button index for each logical action.
pub const DEFAULT_BUTTONS: [(Action, usize); 7] = [
    (Action::ToggleFieldOriented, 0),
    (Action::EmergencyStop, 1),
    (Action::RotateCW120, 2),
    (Action::RotateCCW120, 3),
    (Action::Rotate180, 4),
    (Action::ZeroYaw, 5),
    (Action::ResetEstop, 9),
];

// Stick axes
pub const AXIS_X: usize = 0;
pub const AXIS_Y: usize = 1;
pub const AXIS_TWIST: usize = 2;

/// Command line options for the drive runtime
#[derive(Debug, Clone, Parser)]
#[command(name = "kiwi-drive-runtime", about = "Kiwi drive controller over zenoh")]
pub struct Args {
    /// Scale wheel commands back into [-1, 1] when any exceeds unit magnitude
    #[arg(long)]
    pub normalize: bool,

    /// Use the single-quadrant atan(x/y) stick direction (only correct for forward stick)
    #[arg(long)]
    pub legacy_direction: bool,

    /// Wheels (a, b, c) whose controllers start in coast neutral mode
    #[arg(long, value_delimiter = ',')]
    pub coast: Vec<char>,

    /// Do not invert the gamepad Y axis
    #[arg(long)]
    pub no_invert_y: bool,
}

impl Args {
    /// Startup neutral mode of each wheel channel
    pub fn initial_neutral_modes(&self) -> [NeutralMode; 3] {
        let mut modes = [NeutralMode::Brake; 3];
        for (mode, name) in modes.iter_mut().zip(['a', 'b', 'c']) {
            if self.coast.iter().any(|c| c.eq_ignore_ascii_case(&name)) {
                *mode = NeutralMode::Coast;
            }
        }
        modes
    }
}

/// Button layout validated against the tracked table size
pub fn button_map() -> Result<ButtonMap, ConfigError> {
    ButtonMap::new(&DEFAULT_BUTTONS, BUTTON_COUNT)
}

/// Axis layout validated against the pad's axis count
pub fn axis_map(invert_y: bool) -> Result<AxisMap, ConfigError> {
    AxisMap::new(AXIS_X, AXIS_Y, AXIS_TWIST, invert_y, AXIS_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let buttons = button_map().expect("default buttons fit the table");
        assert_eq!(buttons.index(Action::ResetEstop), 9);
        assert_eq!(buttons.index(Action::ToggleFieldOriented), 0);
        assert!(axis_map(true).is_ok());
    }

    #[test]
    fn test_coast_flags_select_wheels() {
        let args = Args::parse_from(["kiwi-drive-runtime", "--coast", "a,C"]);
        assert_eq!(
            args.initial_neutral_modes(),
            [NeutralMode::Coast, NeutralMode::Brake, NeutralMode::Coast]
        );
        assert!(!args.normalize);
        assert!(!args.legacy_direction);
    }
}
