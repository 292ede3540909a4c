// Rising-edge detection over a fixed button table

use super::DigitalInputSource;

#[derive(Debug, Clone, Copy, Default)]
struct ButtonState {
    current: bool,
    previous: bool,
}

impl ButtonState {
    fn was_pressed(&self) -> bool {
        self.current && !self.previous
    }
}

/// Tracks the last two samples of every button.
///
/// A press held across several ticks reports `was_pressed` only on the first tick
/// it is observed.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    buttons: Vec<ButtonState>,
}

impl EdgeDetector {
    pub fn new(count: usize) -> Self {
        Self {
            buttons: vec![ButtonState::default(); count],
        }
    }

    /// Shift every button's current sample into previous, then sample anew
    pub fn sample(&mut self, source: &impl DigitalInputSource) {
        for (index, button) in self.buttons.iter_mut().enumerate() {
            button.previous = button.current;
            button.current = source.button(index);
        }
    }

    /// Sample without producing edges: buttons already down read held but not pressed.
    ///
    /// Used when a source comes back after a dropout, so a button held through the gap
    /// is not mistaken for a new press.
    pub fn resync(&mut self, source: &impl DigitalInputSource) {
        for (index, button) in self.buttons.iter_mut().enumerate() {
            button.current = source.button(index);
            button.previous = button.current;
        }
    }

    /// Panics if `index` is outside the tracked table.
    pub fn was_pressed(&self, index: usize) -> bool {
        self.buttons[index].was_pressed()
    }

    /// Level of the button on the latest tick. Panics if out of range.
    pub fn is_held(&self, index: usize) -> bool {
        self.buttons[index].current
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}
