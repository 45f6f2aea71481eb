//! Implementations for the AttCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{AttCtrlError, Params};
use comms_if::eqpt::{ControlDems, ThrusterId};
use util::{maths, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Attitude control module state
#[derive(Default)]
pub struct AttCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
}

/// Input data to Attitude Control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// The demands produced by the pilot this cycle.
    pub dems: ControlDems,

    /// Latest roll reading from the attitude sensors.
    ///
    /// Units: degrees, positive rolling the starboard side down
    pub roll_deg: f32,

    /// Whether the correction is currently enabled.
    pub enabled: bool,
}

/// Status report for AttCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Throttle bias applied to the vertical pair this cycle.
    pub bias: f32,

    /// True if the biased demand of either vertical thruster hit the
    /// throttle limits.
    pub clamped: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for AttCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = ControlDems;
    type StatusReport = StatusReport;
    type ProcError = AttCtrlError;

    /// Initialise the AttCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(e),
        };

        Ok(())
    }

    /// Perform cyclic processing of Attitude Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        if !input_data.enabled {
            return Ok((input_data.dems, self.report));
        }

        if !input_data.roll_deg.is_finite() {
            return Err(AttCtrlError::InvalidRoll(input_data.roll_deg));
        }

        // A positive roll error raises the top left thruster and lowers the
        // top right, rolling the vehicle back towards the target
        let bias = self.params.roll_gain * (self.params.roll_target_deg - input_data.roll_deg);

        let mut dems = input_data.dems;
        dems[ThrusterId::TopLeft] += bias;
        dems[ThrusterId::TopRight] -= bias;

        for &id in [ThrusterId::TopLeft, ThrusterId::TopRight].iter() {
            if dems[id] < -1.0 || dems[id] > 1.0 {
                dems[id] = maths::clamp(&dems[id], &-1.0, &1.0);
                self.report.clamped = true;
            }
        }

        self.report.bias = bias;

        trace!(
            "AttCtrl bias: {:.4} (roll {:.2} deg)",
            bias,
            input_data.roll_deg
        );

        Ok((dems, self.report))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// An AttCtrl with known parameters, bypassing the parameter file.
    fn att_ctrl() -> AttCtrl {
        AttCtrl {
            params: Params {
                roll_target_deg: 0.0,
                roll_gain: 0.01,
            },
            report: StatusReport::default(),
        }
    }

    fn input(dems: ControlDems, roll_deg: f32) -> InputData {
        InputData {
            dems,
            roll_deg,
            enabled: true,
        }
    }

    #[test]
    fn test_disabled_passes_demands_through() {
        let mut att = att_ctrl();

        let mut dems = ControlDems::neutral();
        dems[ThrusterId::TopLeft] = 0.3;

        let (out, report) = att
            .proc(&InputData {
                dems,
                roll_deg: 45.0,
                enabled: false,
            })
            .expect("proc failed");

        assert_eq!(out, dems);
        assert_eq!(report.bias, 0.0);
        assert!(!report.clamped);
    }

    #[test]
    fn test_bias_counters_roll() {
        let mut att = att_ctrl();

        // Starboard side down by 5 degrees
        let (out, report) = att
            .proc(&input(ControlDems::neutral(), 5.0))
            .expect("proc failed");

        assert!((report.bias - -0.05).abs() < 1e-6);
        assert!((out[ThrusterId::TopLeft] - -0.05).abs() < 1e-6);
        assert!((out[ThrusterId::TopRight] - 0.05).abs() < 1e-6);

        // Port side down gives the mirrored bias
        let (out, report) = att
            .proc(&input(ControlDems::neutral(), -5.0))
            .expect("proc failed");

        assert!((report.bias - 0.05).abs() < 1e-6);
        assert!((out[ThrusterId::TopLeft] - 0.05).abs() < 1e-6);
        assert!((out[ThrusterId::TopRight] - -0.05).abs() < 1e-6);
    }

    #[test]
    fn test_level_vehicle_needs_no_bias() {
        let mut att = att_ctrl();

        let mut dems = ControlDems::neutral();
        dems[ThrusterId::TopLeft] = 0.4;
        dems[ThrusterId::TopRight] = 0.4;

        let (out, report) = att.proc(&input(dems, 0.0)).expect("proc failed");

        assert_eq!(report.bias, 0.0);
        assert_eq!(out, dems);
    }

    #[test]
    fn test_biased_demands_are_clamped() {
        let mut att = att_ctrl();

        let mut dems = ControlDems::neutral();
        dems[ThrusterId::TopLeft] = 0.99;
        dems[ThrusterId::TopRight] = -0.99;

        // Large port-down roll drives both verticals past full scale
        let (out, report) = att.proc(&input(dems, -10.0)).expect("proc failed");

        assert!(report.clamped);
        assert_eq!(out[ThrusterId::TopLeft], 1.0);
        assert_eq!(out[ThrusterId::TopRight], -1.0);
    }

    #[test]
    fn test_other_channels_untouched() {
        let mut att = att_ctrl();

        let mut dems = ControlDems::neutral();
        dems[ThrusterId::FrontLeft] = 0.7;
        dems.tool_grip = -0.2;

        let (out, _) = att.proc(&input(dems, 3.0)).expect("proc failed");

        assert_eq!(out[ThrusterId::FrontLeft], 0.7);
        assert_eq!(out.tool_grip, -0.2);
        assert_eq!(out[ThrusterId::BackLeft], 0.0);
    }

    #[test]
    fn test_invalid_roll_rejected() {
        let mut att = att_ctrl();

        assert!(matches!(
            att.proc(&input(ControlDems::neutral(), f32::NAN)),
            Err(AttCtrlError::InvalidRoll(_))
        ));
    }
}
