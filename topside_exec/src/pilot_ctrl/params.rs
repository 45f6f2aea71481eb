//! Parameters structure for PilotCtrl

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for Pilot Control.
#[derive(Debug, Default, Deserialize)]
pub struct Params {
    // ---- THRUSTERS ----

    /// Maximum rate of change of each thruster demand. Demands move towards
    /// their per-tick targets by at most this rate, so a step input becomes a
    /// ramp at the actuators.
    ///
    /// Units: demand fraction per second (full scale is from -1.0 to +1.0)
    pub thruster_slew_rate: f32,

    // ---- AUXILIARY CHANNELS ----

    /// Camera tilt change per tick at full input deflection.
    ///
    /// Units: normalised position per tick
    pub camera_tilt_speed: f32,

    /// Tool wrist rotation per tick while a rotate input is held.
    ///
    /// Units: normalised position per tick
    pub tool_wrist_speed: f32,
}
