// Gamepad state latched from the latest bus frame

use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{AnalogInputSource, DigitalInputSource};
use crate::messages::PadFrame;

/// Latest pad frame plus the time it arrived.
///
/// Once the frame is older than the timeout every button reads released and every
/// axis reads 0, so a dead gamepad bridge cannot leave the base driving.
/// [`LatchedPad::just_recovered`] flags the tick on which frames resume, so edge
/// history can be re-seeded instead of treating held buttons as new presses.
pub struct LatchedPad {
    frame: Option<PadFrame>,
    received_at: Instant,
    button_count: usize,
    timeout: Duration,
    stale: bool,
    recovered: bool,
}

impl LatchedPad {
    pub fn new(button_count: usize, timeout: Duration) -> Self {
        Self {
            frame: None,
            received_at: Instant::now(),
            button_count,
            timeout,
            stale: true, // Start stale until first frame
            recovered: false,
        }
    }

    /// Process incoming frame
    pub fn on_frame(&mut self, frame: PadFrame) {
        self.frame = Some(frame);
        self.received_at = Instant::now();
    }

    /// Re-evaluate the watchdog; call once per tick before sampling
    pub fn refresh(&mut self) -> bool {
        let age = self.received_at.elapsed();
        let stale = self.frame.is_none() || age > self.timeout;
        if stale && !self.stale && self.frame.is_some() {
            warn!("Pad frame stale ({:?} old), releasing all inputs", age);
        }
        self.recovered = self.stale && !stale;
        if self.recovered {
            info!("Pad frames live");
        }
        self.stale = stale;
        stale
    }

    /// True on the refresh where the pad went from stale (or never seen) to live
    pub fn just_recovered(&self) -> bool {
        self.recovered
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    fn live_frame(&self) -> Option<&PadFrame> {
        if self.stale { None } else { self.frame.as_ref() }
    }
}

impl DigitalInputSource for LatchedPad {
    fn button(&self, index: usize) -> bool {
        assert!(
            index < self.button_count,
            "button {} outside the {}-button table",
            index,
            self.button_count
        );
        self.live_frame()
            .and_then(|f| f.buttons.get(index).copied())
            .unwrap_or(false)
    }

    fn button_count(&self) -> usize {
        self.button_count
    }
}

impl AnalogInputSource for LatchedPad {
    fn axis(&self, index: usize) -> f32 {
        let value = self
            .live_frame()
            .and_then(|f| f.axes.get(index).copied())
            .unwrap_or(0.0);
        if value.is_finite() {
            value.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}
