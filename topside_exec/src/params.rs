//! # Topside Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters controlling the topside executable itself.
#[derive(Debug, Deserialize, Default)]
pub struct TopsideExecParams {
    /// Address of the vehicle's control server, in `host:port` format.
    pub vehicle_address: String,

    /// Target duration of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Name of the input map file, relative to the parameters directory.
    pub input_map_file: String,

    /// Dead zone applied when reading the pad's motion axes.
    ///
    /// Units: normalised deflection
    pub axis_deadzone: f32,
}
