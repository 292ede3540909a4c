// Reference-frame resolution for field-oriented driving
//
// The correction subtracted from the stick direction comes either from the manually
// accumulated orientation or, in field-oriented mode, from the heading sensor.

use std::f32::consts::{FRAC_PI_2, PI};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::control::RobotState;
use crate::messages::ImuFrame;

/// Heading sensor reading, degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingSample {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl From<ImuFrame> for HeadingSample {
    fn from(frame: ImuFrame) -> Self {
        Self {
            yaw: frame.yaw,
            pitch: frame.pitch,
            roll: frame.roll,
        }
    }
}

/// Why a heading read or re-zero failed. Never fatal to the loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HeadingError {
    #[error("Heading sensor not connected")]
    NotConnected,

    #[error("Heading sample stale ({age:?} old)")]
    Stale { age: Duration },

    #[error("Heading sensor reported an invalid sample")]
    InvalidSample,
}

pub trait HeadingSensor {
    fn yaw_pitch_roll(&mut self) -> Result<HeadingSample, HeadingError>;

    /// Re-reference yaw so the current heading reads as `yaw` degrees
    fn set_yaw(&mut self, yaw: f32) -> Result<(), HeadingError>;
}

/// Heading sensor fed from bus frames.
///
/// `set_yaw` is applied as a local offset on top of the raw sensor yaw.
pub struct LatchedHeading {
    latest: Option<(HeadingSample, Instant)>,
    yaw_offset: f32,
    timeout: Duration,
}

impl LatchedHeading {
    pub fn new(timeout: Duration) -> Self {
        Self {
            latest: None,
            yaw_offset: 0.0,
            timeout,
        }
    }

    pub fn on_frame(&mut self, frame: ImuFrame) {
        self.latest = Some((frame.into(), Instant::now()));
    }

    fn fresh_sample(&self) -> Result<HeadingSample, HeadingError> {
        let (sample, received_at) = self.latest.ok_or(HeadingError::NotConnected)?;
        let age = received_at.elapsed();
        if age > self.timeout {
            return Err(HeadingError::Stale { age });
        }
        if !sample.yaw.is_finite() {
            return Err(HeadingError::InvalidSample);
        }
        Ok(sample)
    }
}

impl HeadingSensor for LatchedHeading {
    fn yaw_pitch_roll(&mut self) -> Result<HeadingSample, HeadingError> {
        let sample = self.fresh_sample()?;
        let yaw = sample.yaw - self.yaw_offset;
        if !yaw.is_finite() {
            return Err(HeadingError::InvalidSample);
        }
        Ok(HeadingSample { yaw, ..sample })
    }

    /// Re-reference against the latest sample; fails on the same samples a read would
    fn set_yaw(&mut self, yaw: f32) -> Result<(), HeadingError> {
        let sample = self.fresh_sample()?;
        let offset = sample.yaw - yaw;
        if !offset.is_finite() {
            return Err(HeadingError::InvalidSample);
        }
        self.yaw_offset = offset;
        debug!("Yaw re-referenced, offset {:.2}°", self.yaw_offset);
        Ok(())
    }
}

/// Quantized manual orientation adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationStep {
    /// +120°
    Clockwise120,
    /// -120°
    CounterClockwise120,
    /// +180°
    Half,
}

impl OrientationStep {
    pub fn radians(self) -> f32 {
        match self {
            Self::Clockwise120 => 2.0 * PI / 3.0,
            Self::CounterClockwise120 => -2.0 * PI / 3.0,
            Self::Half => PI,
        }
    }
}

/// Where this tick's correction came from
#[derive(Debug, Clone, PartialEq)]
pub enum OrientationSource {
    Manual,
    Heading,
    /// Field-oriented read failed; correction fell back to 0
    Fallback(HeadingError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Radians to subtract from the stick direction
    pub adjustment: f32,
    pub source: OrientationSource,
}

impl Resolution {
    pub fn heading_failed(&self) -> bool {
        matches!(self.source, OrientationSource::Fallback(_))
    }
}

/// Convert a sensor yaw (degrees) into the kinematics frame, where 0 is +y
pub fn heading_correction(yaw_degrees: f32) -> f32 {
    yaw_degrees.to_radians() + FRAC_PI_2
}

#[derive(Debug, Default)]
pub struct FieldOrientationResolver;

impl FieldOrientationResolver {
    /// Accumulate a manual step; applies in either mode
    pub fn step(&self, state: &mut RobotState, step: OrientationStep) {
        state.manual_orientation += step.radians();
        debug!(
            "Manual orientation {:?} -> {:.3} rad",
            step, state.manual_orientation
        );
    }

    /// Correction for this tick
    pub fn resolve(&self, state: &mut RobotState, sensor: &mut impl HeadingSensor) -> Resolution {
        if !state.field_oriented {
            return Resolution {
                adjustment: state.manual_orientation,
                source: OrientationSource::Manual,
            };
        }

        match sensor.yaw_pitch_roll() {
            Ok(sample) => {
                let adjustment = heading_correction(sample.yaw);
                state.last_heading_correction = Some(adjustment);
                state.heading_ok = true;
                Resolution {
                    adjustment,
                    source: OrientationSource::Heading,
                }
            }
            Err(e) => {
                if state.heading_ok {
                    warn!("Field-oriented heading unavailable: {}", e);
                }
                state.heading_ok = false;
                Resolution {
                    adjustment: 0.0,
                    source: OrientationSource::Fallback(e),
                }
            }
        }
    }

    /// Ask the sensor to re-zero yaw; failure is absorbed
    pub fn zero_yaw(&self, sensor: &mut impl HeadingSensor) {
        if let Err(e) = sensor.set_yaw(0.0) {
            debug!("Yaw reset ignored: {}", e);
        }
    }
}
