//! # Vehicle Executable Parameters
//!
//! This module provides parameters for the vehicle executable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct RovExecParams {
    /// Address the control link listens on, in `host:port` format.
    pub bind_address: String,

    /// Target duration of one actuation cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Target interval between camera frames sent to the surface.
    ///
    /// Units: seconds
    pub frame_interval_s: f64,

    /// Run against the simulated mechanisms instead of the PCA9685 hardware.
    pub sim_mech: bool,
}
