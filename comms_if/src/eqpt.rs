//! # Equipment Demands
//!
//! Shared definitions of the vehicle's actuator set and the demand vector
//! exchanged between the surface station and the vehicle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of thrusters on the vehicle.
pub const NUM_THRUSTERS: usize = 6;

/// The number of auxiliary servo channels on the vehicle.
pub const NUM_SERVOS: usize = 3;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all thrusters available to the vehicle.
///
/// `Top` thrusters point downwards and provide heave, the other four are
/// mounted in a vectored arrangement and provide surge, sway, and yaw.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ThrusterId {
    FrontLeft,
    FrontRight,
    TopLeft,
    TopRight,
    BackLeft,
    BackRight,
}

/// IDs of all servo channels available to the vehicle.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ServoId {
    CameraTilt,
    ToolWrist,
    ToolGrip,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands that are sent from the surface station to the vehicle.
///
/// All channels are normalised into `[-1.0, +1.0]`. Thruster channels are
/// throttle demands, servo channels are position demands which the vehicle
/// maps onto the servo's angular range.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlDems {
    /// Throttle demand for each thruster, indexed by [`ThrusterId`].
    pub thrusters: [f32; NUM_THRUSTERS],

    /// Position demand for the camera tilt servo.
    pub camera_tilt: f32,

    /// Position demand for the tool wrist servo.
    pub tool_wrist: f32,

    /// Position demand for the tool grip servo.
    pub tool_grip: f32,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ThrusterId {
    /// All thrusters in demand-vector order.
    pub const ALL: [ThrusterId; NUM_THRUSTERS] = [
        ThrusterId::FrontLeft,
        ThrusterId::FrontRight,
        ThrusterId::TopLeft,
        ThrusterId::TopRight,
        ThrusterId::BackLeft,
        ThrusterId::BackRight,
    ];

    /// Position of this thruster in the demand vector.
    pub fn index(self) -> usize {
        match self {
            ThrusterId::FrontLeft => 0,
            ThrusterId::FrontRight => 1,
            ThrusterId::TopLeft => 2,
            ThrusterId::TopRight => 3,
            ThrusterId::BackLeft => 4,
            ThrusterId::BackRight => 5,
        }
    }
}

impl ServoId {
    /// All servo channels in demand-vector order.
    pub const ALL: [ServoId; NUM_SERVOS] =
        [ServoId::CameraTilt, ServoId::ToolWrist, ServoId::ToolGrip];

    /// Position of this servo in the demand vector.
    pub fn index(self) -> usize {
        match self {
            ServoId::CameraTilt => 0,
            ServoId::ToolWrist => 1,
            ServoId::ToolGrip => 2,
        }
    }
}

impl ControlDems {
    /// A demand vector with every channel at neutral.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Return a copy of these demands with every channel clamped into
    /// `[-1.0, +1.0]`.
    pub fn clamped(&self) -> Self {
        let mut dems = *self;

        for t in dems.thrusters.iter_mut() {
            *t = t.max(-1.0).min(1.0);
        }

        dems.camera_tilt = dems.camera_tilt.max(-1.0).min(1.0);
        dems.tool_wrist = dems.tool_wrist.max(-1.0).min(1.0);
        dems.tool_grip = dems.tool_grip.max(-1.0).min(1.0);

        dems
    }

    /// Read the demand for the given servo channel.
    pub fn servo(&self, id: ServoId) -> f32 {
        match id {
            ServoId::CameraTilt => self.camera_tilt,
            ServoId::ToolWrist => self.tool_wrist,
            ServoId::ToolGrip => self.tool_grip,
        }
    }
}

impl std::ops::Index<ThrusterId> for ControlDems {
    type Output = f32;

    fn index(&self, id: ThrusterId) -> &Self::Output {
        &self.thrusters[id.index()]
    }
}

impl std::ops::IndexMut<ThrusterId> for ControlDems {
    fn index_mut(&mut self, id: ThrusterId) -> &mut Self::Output {
        &mut self.thrusters[id.index()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamped() {
        let mut dems = ControlDems::neutral();
        dems[ThrusterId::FrontLeft] = 3.0;
        dems[ThrusterId::BackRight] = -2.5;
        dems.camera_tilt = 1.5;
        dems.tool_grip = -1.0;

        let clamped = dems.clamped();

        assert_eq!(clamped[ThrusterId::FrontLeft], 1.0);
        assert_eq!(clamped[ThrusterId::BackRight], -1.0);
        assert_eq!(clamped.camera_tilt, 1.0);
        assert_eq!(clamped.tool_grip, -1.0);

        // Channels already in range are untouched
        assert_eq!(clamped[ThrusterId::FrontRight], 0.0);
        assert_eq!(clamped.tool_wrist, 0.0);
    }

    #[test]
    fn test_thruster_indexing() {
        let mut dems = ControlDems::neutral();

        for (i, id) in ThrusterId::ALL.iter().enumerate() {
            dems[*id] = i as f32;
        }

        assert_eq!(dems.thrusters, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
