//! Thruster mixing calculations

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Internal
use super::state::{InputData, PilotCtrl};
use comms_if::eqpt::NUM_THRUSTERS;

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl PilotCtrl {
    /// Calculate this tick's thruster targets from the demanded motion axes.
    ///
    /// The four vectored thrusters combine forward, strafe and rotate, the
    /// two top thrusters carry elevate alone:
    ///
    /// ```text
    /// rotate left       lf | rf   rotate right
    /// elevation only    lt | rt   elevation only
    /// rotate right      lb | rb   rotate left
    /// ```
    ///
    /// Each target is clamped into [-1, +1] before any slewing, raising the
    /// matching saturation flag in the status report.
    pub(crate) fn calc_mix(&mut self, input: &InputData) -> [f32; NUM_THRUSTERS] {
        let forward = input.forward;
        let strafe = input.strafe;
        let rotate = input.rotate;
        let elevate = input.elevate;

        // Targets in demand-vector order: lf, rf, lt, rt, lb, rb
        let mut targets = [
            -rotate - strafe + forward,
            rotate + strafe + forward,
            elevate,
            elevate,
            rotate - strafe - forward,
            -rotate + strafe - forward,
        ];

        for (i, target) in targets.iter_mut().enumerate() {
            if *target > 1.0 {
                *target = 1.0;
                self.report.mix_saturated[i] = true;
            }
            if *target < -1.0 {
                *target = -1.0;
                self.report.mix_saturated[i] = true;
            }
        }

        targets
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mix_axes_are_independent() {
        let mut pc = PilotCtrl::default();

        let mut input = InputData::default();
        input.strafe = 0.5;

        // Strafing drives the four vectored thrusters and leaves the top pair alone
        assert_eq!(
            pc.calc_mix(&input),
            [-0.5, 0.5, 0.0, 0.0, -0.5, 0.5]
        );

        let mut input = InputData::default();
        input.rotate = 0.5;

        assert_eq!(
            pc.calc_mix(&input),
            [-0.5, 0.5, 0.0, 0.0, 0.5, -0.5]
        );

        let mut input = InputData::default();
        input.elevate = -0.75;

        assert_eq!(
            pc.calc_mix(&input),
            [0.0, 0.0, -0.75, -0.75, 0.0, 0.0]
        );
    }

    #[test]
    fn test_mix_clamps_to_unit_range() {
        let mut pc = PilotCtrl::default();

        // Deliberately out of range inputs still produce in range targets
        let mut input = InputData::default();
        input.forward = 5.0;
        input.strafe = -5.0;
        input.rotate = 5.0;
        input.elevate = -5.0;

        for (i, target) in pc.calc_mix(&input).iter().enumerate() {
            assert!(*target >= -1.0 && *target <= 1.0, "thruster {}", i);
        }

        assert!(pc.report.mix_saturated.iter().any(|&s| s));
    }
}
