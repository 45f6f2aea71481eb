//! Parameters structure for AttCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Attitude Control.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    /// Roll angle the correction drives the vehicle towards.
    ///
    /// Units: degrees
    pub roll_target_deg: f32,

    /// Proportional gain converting roll error into a throttle bias on the
    /// vertical thruster pair.
    ///
    /// Units: throttle fraction per degree
    pub roll_gain: f32,
}
