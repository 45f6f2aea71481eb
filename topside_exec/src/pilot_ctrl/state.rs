//! Implementations for the PilotCtrl state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Params, PilotCtrlError};
use comms_if::eqpt::{ControlDems, ThrusterId, NUM_THRUSTERS};
use util::{maths, module::State, params, session::Session};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Pilot control module state
#[derive(Default)]
pub struct PilotCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    /// The demands sent on the previous tick. Thruster channels are slewed
    /// from here towards this tick's targets, auxiliary channels integrate
    /// on top of their previous values.
    pub(crate) dems: ControlDems,
}

/// Input data to Pilot Control.
///
/// All analogue values are expected to already be dead-zone filtered by the
/// input abstraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Demanded motion along the forward axis.
    ///
    /// Units: normalised demand in [-1, +1], positive forwards
    pub forward: f32,

    /// Demanded sideways translation.
    ///
    /// Units: normalised demand in [-1, +1], positive to the right
    pub strafe: f32,

    /// Demanded rotation about the vertical axis.
    ///
    /// Units: normalised demand in [-1, +1], positive clockwise from above
    pub rotate: f32,

    /// Demanded vertical translation.
    ///
    /// Units: normalised demand in [-1, +1], positive upwards
    pub elevate: f32,

    /// Rate input for the camera tilt integrator.
    ///
    /// Units: normalised deflection in [-1, +1]
    pub camera_tilt_rate: f32,

    /// True while the clockwise tool wrist input is held.
    pub wrist_cw: bool,

    /// True while the counter-clockwise tool wrist input is held.
    pub wrist_ccw: bool,

    /// Demanded tool grip position, passed straight through.
    ///
    /// Units: normalised demand in [-1, +1]
    pub tool_grip: f32,

    /// Manual override flags, one per thruster in demand-vector order. An
    /// overridden thruster's target is forced to full throttle this tick.
    pub thruster_overrides: [bool; NUM_THRUSTERS],

    /// True to force overridden thrusters to full reverse instead of full
    /// forward.
    pub override_reverse: bool,

    /// Time since the previous cycle.
    ///
    /// Units: seconds
    pub dt_s: f32,
}

/// Status report for PilotCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True for each thruster whose mixed target was clamped this tick.
    pub(crate) mix_saturated: [bool; NUM_THRUSTERS],

    /// True for each thruster forced by a manual override this tick.
    pub(crate) override_active: [bool; NUM_THRUSTERS],

    /// True for each thruster still slewing towards its target.
    pub(crate) slew_limited: [bool; NUM_THRUSTERS],
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl State for PilotCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = ControlDems;
    type StatusReport = StatusReport;
    type ProcError = PilotCtrlError;

    /// Initialise the PilotCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(e),
        };

        // Demands start at neutral, so the first tick slews away from a
        // stationary vehicle.
        self.dems = ControlDems::neutral();

        Ok(())
    }

    /// Perform cyclic processing of Pilot Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        if !input_data.dt_s.is_finite() || input_data.dt_s < 0.0 {
            return Err(PilotCtrlError::InvalidTickDuration(input_data.dt_s));
        }

        // Fresh thruster targets from the axis mix
        let mut targets = self.calc_mix(input_data);

        // Manual overrides force individual thrusters to full throttle
        self.apply_overrides(&mut targets, input_data);

        // Slew each thruster demand towards its target
        let max_step = self.params.thruster_slew_rate * input_data.dt_s;

        for &id in ThrusterId::ALL.iter() {
            let next = maths::move_toward(self.dems[id], targets[id.index()], max_step);

            if next != targets[id.index()] {
                self.report.slew_limited[id.index()] = true;
            }

            self.dems[id] = next;
        }

        // Integrate the auxiliary channels
        self.integrate_aux(input_data);

        // Final clamp on every channel
        self.dems = self.dems.clamped();

        trace!(
            "PilotCtrl dems:\n    thrusters: {:?}\n    aux: [{}, {}, {}]",
            self.dems.thrusters,
            self.dems.camera_tilt,
            self.dems.tool_wrist,
            self.dems.tool_grip
        );

        Ok((self.dems, self.report))
    }
}

impl PilotCtrl {
    /// Force overridden thrusters to full throttle, bypassing the mixed
    /// target for this tick only.
    fn apply_overrides(&mut self, targets: &mut [f32; NUM_THRUSTERS], input: &InputData) {
        let forced = if input.override_reverse { -1.0 } else { 1.0 };

        for &id in ThrusterId::ALL.iter() {
            if input.thruster_overrides[id.index()] {
                targets[id.index()] = forced;
                self.report.override_active[id.index()] = true;
            }
        }
    }

    /// Update the auxiliary channels.
    ///
    /// Camera tilt and tool wrist are integrators stepped by their per-tick
    /// speeds, tool grip is a direct pass through.
    fn integrate_aux(&mut self, input: &InputData) {
        let wrist_rate = match (input.wrist_cw, input.wrist_ccw) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };

        self.dems.camera_tilt = maths::clamp(
            &(self.dems.camera_tilt + input.camera_tilt_rate * self.params.camera_tilt_speed),
            &-1.0,
            &1.0,
        );

        self.dems.tool_wrist = maths::clamp(
            &(self.dems.tool_wrist + wrist_rate * self.params.tool_wrist_speed),
            &-1.0,
            &1.0,
        );

        self.dems.tool_grip = input.tool_grip;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
