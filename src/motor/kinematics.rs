// Kiwi inverse kinematics for the 3-wheel base
// Converts joystick drive intent (x, y, twist) plus an orientation correction into
// normalized wheel speeds for wheels a, b and c mounted 120° apart.

use std::f32::consts::FRAC_PI_2;

use crate::config::{TRANSLATE_DEADBAND, WHEEL_DEADBAND};

/// sin(60°), the lateral share of each front wheel
const HALF_SQRT_3: f32 = 0.866_025_4;

/// Zero `value` unless its magnitude strictly exceeds `threshold`.
///
/// Values outside the band pass through unscaled. NaN compares false and is zeroed.
pub fn deadband(value: f32, threshold: f32) -> f32 {
    if value.abs() > threshold { value } else { 0.0 }
}

/// Operator drive intent, each channel in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveIntent {
    pub x: f32,
    pub y: f32,
    pub twist: f32,
}

impl DriveIntent {
    pub fn new(x: f32, y: f32, twist: f32) -> Self {
        Self { x, y, twist }
    }
}

/// Normalized speed for each wheel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelCommand {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl WheelCommand {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns speeds as array [a, b, c]
    pub fn as_array(&self) -> [f32; 3] {
        [self.a, self.b, self.c]
    }

    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            a: f(self.a),
            b: f(self.b),
            c: f(self.c),
        }
    }

    /// Scale all three by the largest magnitude when it exceeds 1
    pub fn normalized(self) -> Self {
        let max = self.a.abs().max(self.b.abs()).max(self.c.abs());
        if max > 1.0 { self.map(|v| v / max) } else { self }
    }
}

/// How the stick direction angle is derived from (x, y)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionMode {
    /// `atan(x / y)`: only correct for forward stick (y > 0); backward stick is
    /// mirrored forward
    SingleQuadrant,
    /// `atan2(x, y)`: correct in every quadrant
    #[default]
    FourQuadrant,
}

impl DirectionMode {
    /// Angle of the stick measured from +y towards +x (radians)
    fn direction(self, x: f32, y: f32) -> f32 {
        match self {
            Self::SingleQuadrant => {
                if y == 0.0 {
                    // atan(±inf); the 0/0 case is handled by the zero-magnitude guard
                    FRAC_PI_2.copysign(x)
                } else {
                    (x / y).atan()
                }
            }
            Self::FourQuadrant => x.atan2(y),
        }
    }
}

/// Result of one kinematics solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveSolution {
    /// Frame-corrected, deadbanded translation and twist
    pub corrected: DriveIntent,
    pub wheels: WheelCommand,
}

/// Kiwi drive solver with its deadband thresholds and optional post-steps
#[derive(Debug, Clone)]
pub struct KiwiKinematics {
    translate_deadband: f32,
    wheel_deadband: f32,
    direction: DirectionMode,
    normalize: bool,
}

impl Default for KiwiKinematics {
    fn default() -> Self {
        Self::new(DirectionMode::default(), false)
    }
}

impl KiwiKinematics {
    pub fn new(direction: DirectionMode, normalize: bool) -> Self {
        Self::with_thresholds(TRANSLATE_DEADBAND, WHEEL_DEADBAND, direction, normalize)
    }

    /// Solver with custom deadband thresholds
    pub fn with_thresholds(
        translate_deadband: f32,
        wheel_deadband: f32,
        direction: DirectionMode,
        normalize: bool,
    ) -> Self {
        Self {
            translate_deadband,
            wheel_deadband,
            direction,
            normalize,
        }
    }

    pub fn direction_mode(&self) -> DirectionMode {
        self.direction
    }

    pub fn normalizes(&self) -> bool {
        self.normalize
    }

    /// Rotate the stick translation by `-adjustment` (radians), then deadband all channels
    pub fn correct(&self, intent: DriveIntent, adjustment: f32) -> DriveIntent {
        let magnitude = (intent.x * intent.x + intent.y * intent.y).sqrt();
        let direction = if magnitude == 0.0 {
            0.0
        } else {
            self.direction.direction(intent.x, intent.y)
        };
        let rotated = direction - adjustment;

        DriveIntent {
            x: deadband(magnitude * rotated.cos(), self.translate_deadband),
            y: deadband(magnitude * rotated.sin(), self.translate_deadband),
            twist: deadband(intent.twist, self.translate_deadband),
        }
    }

    /// Wheel mixing for 120° mounting, before any output deadband
    pub fn mix(corrected: DriveIntent) -> WheelCommand {
        let DriveIntent { x, y, twist } = corrected;
        WheelCommand {
            a: x / 2.0 - HALF_SQRT_3 * y + twist / 2.0,
            b: x / 2.0 + HALF_SQRT_3 * y + twist / 2.0,
            c: -x + twist / 2.0,
        }
    }

    /// Full solve: correction, mixing, output deadband and (if enabled) normalization
    pub fn solve(&self, intent: DriveIntent, adjustment: f32) -> DriveSolution {
        let corrected = self.correct(intent, adjustment);
        let mut wheels = Self::mix(corrected).map(|v| deadband(v, self.wheel_deadband));
        if self.normalize {
            wheels = wheels.normalized();
        }
        DriveSolution { corrected, wheels }
    }
}
