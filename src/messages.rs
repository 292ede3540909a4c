// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::motor::NeutralMode;

// Gamepad bridge -> runtime
// Buttons and axes by physical index; entries beyond the vectors read as released / centered
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PadFrame {
    #[serde(default)]
    pub buttons: Vec<bool>,
    #[serde(default)]
    pub axes: Vec<f32>,
}

// Heading sensor -> runtime, all angles in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuFrame {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

// Actuation output from runtime -> kiwi-hw
// Wheel order is [a, b, c]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BaseActuation {
    pub speeds: [f32; 3],
    pub neutral: [NeutralMode; 3],
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    PadStale,
    Estopped,
}

/// Published every tick; `beat` is the liveness counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub beat: u64,
    pub health: RuntimeHealth,
    pub field_oriented: bool,
    pub heading_ok: bool,
}
