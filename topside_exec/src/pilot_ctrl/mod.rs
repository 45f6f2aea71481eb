//! # Pilot Control Module
//!
//! Turns the operator's polled inputs into the nine channel actuator demand vector sent to the
//! vehicle once per cycle: the four motion axes are mixed into six thruster throttles, manual
//! overrides are applied, the thruster demands are slewed towards their targets, the camera tilt
//! and tool wrist channels are integrated and the tool grip is passed through.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod calc_mix;
mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur during PilotCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum PilotCtrlError {
    #[error("Invalid tick duration: {0} s")]
    InvalidTickDuration(f32),
}
