// Kiwi (three omniwheel) drive controller
//
// Joystick input -> edge-triggered actions -> frame correction -> kiwi kinematics
// -> wheel commands, with an emergency stop over the actuators.

pub mod config;
pub mod control;
pub mod input;
pub mod messages;
pub mod motor;
pub mod orientation;
pub mod runtime;
pub mod safety;
