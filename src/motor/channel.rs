// Latched wheel channel
//
// Holds the last speed and neutral mode commanded to one wheel. The runtime
// publishes the three channels as a single actuation frame after every tick.

use tracing::debug;

use super::{Actuator, NeutralMode};
use crate::messages::BaseActuation;

#[derive(Debug, Clone)]
pub struct WheelChannel {
    name: &'static str,
    speed: f32,
    neutral: NeutralMode,
}

impl WheelChannel {
    pub fn new(name: &'static str, neutral: NeutralMode) -> Self {
        Self {
            name,
            speed: 0.0,
            neutral,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn neutral(&self) -> NeutralMode {
        self.neutral
    }

    /// Snapshot of the three channels as an actuation frame
    pub fn actuation(wheels: &[WheelChannel; 3]) -> BaseActuation {
        BaseActuation {
            speeds: wheels.each_ref().map(|w| w.speed),
            neutral: wheels.each_ref().map(|w| w.neutral),
        }
    }
}

impl Actuator for WheelChannel {
    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn configure_neutral_mode(&mut self, mode: NeutralMode) {
        if mode != self.neutral {
            debug!("Wheel {} neutral mode {:?} -> {:?}", self.name, self.neutral, mode);
        }
        self.neutral = mode;
    }

    fn query_brake_on_neutral(&self) -> bool {
        self.neutral == NeutralMode::Brake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_latches_commands() {
        let mut wheel = WheelChannel::new("a", NeutralMode::Coast);
        assert!(!wheel.query_brake_on_neutral());

        wheel.set_speed(0.4);
        wheel.configure_neutral_mode(NeutralMode::Brake);

        assert_eq!(wheel.speed(), 0.4);
        assert!(wheel.query_brake_on_neutral());
    }

    #[test]
    fn test_actuation_snapshot_keeps_wheel_order() {
        let mut wheels = [
            WheelChannel::new("a", NeutralMode::Brake),
            WheelChannel::new("b", NeutralMode::Coast),
            WheelChannel::new("c", NeutralMode::Brake),
        ];
        wheels[0].set_speed(-0.5);
        wheels[2].set_speed(1.0);

        let actuation = WheelChannel::actuation(&wheels);
        assert_eq!(actuation.speeds, [-0.5, 0.0, 1.0]);
        assert_eq!(
            actuation.neutral,
            [NeutralMode::Brake, NeutralMode::Coast, NeutralMode::Brake]
        );
    }
}
