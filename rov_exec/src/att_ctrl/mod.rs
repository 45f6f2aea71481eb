//! Attitude control module
//!
//! Applies a proportional roll correction to the vertical thruster pair so
//! the vehicle holds a level camera platform without pilot input. The
//! correction only runs while the surface station has enabled it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during AttCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum AttCtrlError {
    #[error("Roll reading of {0} degrees is not usable")]
    InvalidRoll(f32),
}
