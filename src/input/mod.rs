// Operator input for the kiwi base
//
// Provides:
// - Input source traits (buttons and stick axes)
// - Named actions mapped onto physical button indices
// - Rising-edge detection over the tracked button table
// - A pad latched from bus frames, with a staleness watchdog

mod edge;
mod pad;

pub use edge::EdgeDetector;
pub use pad::LatchedPad;

/// Raw boolean buttons with a fixed index range.
///
/// Reading an index outside the range is a caller error and panics.
pub trait DigitalInputSource {
    fn button(&self, index: usize) -> bool;
    fn button_count(&self) -> usize;
}

/// Stick axes, each reading in [-1, 1].
pub trait AnalogInputSource {
    fn axis(&self, index: usize) -> f32;
}

/// Logical operator actions bound to buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ToggleFieldOriented,
    EmergencyStop,
    ResetEstop,
    ZeroYaw,
    RotateCW120,
    RotateCCW120,
    Rotate180,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::ToggleFieldOriented,
        Action::EmergencyStop,
        Action::ResetEstop,
        Action::ZeroYaw,
        Action::RotateCW120,
        Action::RotateCCW120,
        Action::Rotate180,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Errors in the button/axis layout, caught once at startup
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Button {index} for {action:?} is outside the {count}-button table")]
    ButtonOutOfRange {
        action: Action,
        index: usize,
        count: usize,
    },

    #[error("No button assigned to {0:?}")]
    Unassigned(Action),

    #[error("{action:?} assigned twice")]
    DuplicateAction { action: Action },

    #[error("Axis {index} is outside the {count}-axis pad")]
    AxisOutOfRange { index: usize, count: usize },
}

/// Physical button index for every [`Action`], validated against the table size
#[derive(Debug, Clone)]
pub struct ButtonMap {
    indices: [usize; 7],
    count: usize,
}

impl ButtonMap {
    pub fn new(bindings: &[(Action, usize)], count: usize) -> Result<Self, ConfigError> {
        let mut indices = [None; 7];
        for &(action, index) in bindings {
            if index >= count {
                return Err(ConfigError::ButtonOutOfRange {
                    action,
                    index,
                    count,
                });
            }
            let slot = &mut indices[action.slot()];
            if slot.is_some() {
                return Err(ConfigError::DuplicateAction { action });
            }
            *slot = Some(index);
        }

        let mut resolved = [0usize; 7];
        for action in Action::ALL {
            resolved[action.slot()] =
                indices[action.slot()].ok_or(ConfigError::Unassigned(action))?;
        }
        Ok(Self {
            indices: resolved,
            count,
        })
    }

    pub fn index(&self, action: Action) -> usize {
        self.indices[action.slot()]
    }

    /// Size of the button table this map was validated against
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Stick axis assignment
#[derive(Debug, Clone, Copy)]
pub struct AxisMap {
    pub x: usize,
    pub y: usize,
    pub twist: usize,
    /// Gamepads report stick-forward as negative Y
    pub invert_y: bool,
}

impl AxisMap {
    pub fn new(
        x: usize,
        y: usize,
        twist: usize,
        invert_y: bool,
        count: usize,
    ) -> Result<Self, ConfigError> {
        for index in [x, y, twist] {
            if index >= count {
                return Err(ConfigError::AxisOutOfRange { index, count });
            }
        }
        Ok(Self {
            x,
            y,
            twist,
            invert_y,
        })
    }

    /// Read `(x, y, twist)` from the source
    pub fn read(&self, source: &impl AnalogInputSource) -> (f32, f32, f32) {
        let y = source.axis(self.y);
        let y = if self.invert_y { -y } else { y };
        (source.axis(self.x), y, source.axis(self.twist))
    }
}
