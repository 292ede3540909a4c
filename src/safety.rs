// Emergency stop and actuator neutral mode
//
// Two states, no transitional state. Holding the stop button forces every wheel to
// zero with braking neutral mode, re-applied each tick it stays held. A rising edge
// on the reset button restores each wheel's own startup neutral mode.

use tracing::{info, warn};

use crate::control::RobotState;
use crate::motor::{Actuator, NeutralMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyState {
    Normal,
    Estopped,
}

pub struct SafetyController {
    initial_neutral: [NeutralMode; 3],
}

impl SafetyController {
    /// Record each wheel's neutral mode; must run before any estop
    pub fn capture<A: Actuator>(wheels: &[A; 3]) -> Self {
        let initial_neutral = wheels
            .each_ref()
            .map(|w| NeutralMode::from_brake_flag(w.query_brake_on_neutral()));
        info!("Startup neutral modes: {:?}", initial_neutral);
        Self { initial_neutral }
    }

    pub fn initial_neutral(&self) -> [NeutralMode; 3] {
        self.initial_neutral
    }

    /// Apply this tick's transitions. The hold level is evaluated before the reset edge.
    pub fn update<A: Actuator>(
        &self,
        state: &mut RobotState,
        stop_held: bool,
        reset_pressed: bool,
        wheels: &mut [A; 3],
    ) -> SafetyState {
        if stop_held {
            if !state.estop {
                warn!("Emergency stop engaged");
            }
            for wheel in wheels.iter_mut() {
                wheel.set_speed(0.0);
            }
            for wheel in wheels.iter_mut() {
                wheel.configure_neutral_mode(NeutralMode::Brake);
            }
            state.estop = true;
        }

        if reset_pressed {
            if state.estop {
                info!("Emergency stop cleared");
            }
            state.estop = false;
            for (wheel, &mode) in wheels.iter_mut().zip(&self.initial_neutral) {
                wheel.configure_neutral_mode(mode);
            }
        }

        self.state(state)
    }

    pub fn state(&self, state: &RobotState) -> SafetyState {
        if state.estop {
            SafetyState::Estopped
        } else {
            SafetyState::Normal
        }
    }
}
