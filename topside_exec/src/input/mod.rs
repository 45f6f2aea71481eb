//! # Input Abstraction Module
//!
//! This module turns a physical game controller (plus an optional keyboard state handed over by
//! the window layer) into a set of named logical inputs that the rest of the executable can read
//! without knowing anything about buttons, axes or hats:
//!
//! - [`Capability`] - everything a standard pad can physically report, including "virtual"
//!   digital capabilities derived from the sticks.
//! - [`InputDevice`] - the raw polling primitive. The window layer provides a real implementation,
//!   [`NullDevice`] stands in when no controller is attached and [`ScriptedDevice`] replays a
//!   canned sequence for bench runs.
//! - [`InputMap`] - the logical-name to capability indirection table, so that "axis.rov.forward"
//!   can be rebound without touching control code.
//! - [`Pad`] - current/previous capability snapshots with edge detection, dead-zone filtering and
//!   keyboard fallback.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod device;
mod input_map;
mod pad;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Internal
pub use device::*;
pub use input_map::*;
pub use pad::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Stick deflection beyond which a stick direction counts as a held digital input.
///
/// Units: normalised stick deflection in [-1, +1]
pub const STICK_AXIS_AS_DIGITAL_DEADZONE: f32 = 0.1;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur while setting up the input abstraction.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("The software root environment variable (TRITON_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the input mapping file: {0}")]
    MapReadError(std::io::Error),

    #[error("Cannot parse the input mapping file: {0}")]
    MapParseError(serde_json::Error),
}
