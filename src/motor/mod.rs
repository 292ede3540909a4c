// Motor control module for the kiwi omniwheel base
//
// Provides:
// - The actuator contract the control loop drives (speed + neutral mode)
// - Kiwi inverse kinematics with deadbanding (drive intent -> wheel speeds)
// - Latched wheel channels published as actuation frames

mod channel;
pub mod kinematics;

use serde::{Deserialize, Serialize};

pub use channel::WheelChannel;
pub use kinematics::{DirectionMode, DriveIntent, KiwiKinematics, WheelCommand, deadband};

/// Passive behaviour of a motor commanded to zero power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeutralMode {
    #[default]
    Brake,
    Coast,
}

impl NeutralMode {
    pub fn from_brake_flag(brake: bool) -> Self {
        if brake { Self::Brake } else { Self::Coast }
    }
}

/// One wheel's motor controller.
///
/// Calls are expected to return promptly; implementations must not block the tick.
pub trait Actuator {
    /// Normalized speed, nominally in [-1, 1]
    fn set_speed(&mut self, speed: f32);

    fn configure_neutral_mode(&mut self, mode: NeutralMode);

    /// Whether the controller currently brakes in neutral
    fn query_brake_on_neutral(&self) -> bool;
}
