//! # Mechanisms Module
//!
//! This module provides a unified interface to the vehicle's actuators, the
//! six thrusters and the three auxiliary servos, and to the attitude sensing
//! used by the correction loop.
//!
//! Two drivers are provided: [`SimMech`] for bench runs with no hardware
//! attached, and [`Pca9685Mech`] for the vehicle's PWM driver board.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// [`MechDriver`] implementation for the PCA9685 16 channel PWM driver board.
pub mod pca9685;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use serde::{Deserialize, Serialize};

// Internal
use comms_if::eqpt::{ControlDems, ServoId, ThrusterId, NUM_SERVOS, NUM_THRUSTERS};

pub use pca9685::Pca9685Mech;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Trait to provide a unified API for actuating the vehicle's mechanisms.
pub trait MechDriver {
    /// Prepare the actuators for use.
    ///
    /// For ESC driven thrusters this holds the neutral signal on every
    /// thruster channel until the ESCs have armed. Must be called before any
    /// demand is actuated.
    fn arm(&mut self) -> Result<(), MechError>;

    /// Set the throttle of a single thruster.
    ///
    /// ## Arguments
    /// - `id` - The thruster to set
    /// - `throttle` - The throttle to set. Must be a value between -1.0 and
    ///   +1.0, values outside this range will be rejected.
    fn set_thruster(&mut self, id: ThrusterId, throttle: f32) -> Result<(), MechError>;

    /// Set the position of a single servo.
    ///
    /// ## Arguments
    /// - `id` - The servo to set
    /// - `demand` - The normalised position demand. Must be a value between
    ///   -1.0 and +1.0, values outside this range will be rejected. The
    ///   demand maps linearly onto the servo's angular range with 0.0 at the
    ///   centre.
    fn set_servo(&mut self, id: ServoId, demand: f32) -> Result<(), MechError>;

    /// Read the vehicle's current attitude.
    fn attitude(&mut self) -> Result<Attitude, MechError>;

    /// Drive all thrusters to neutral.
    fn safe_all(&mut self) -> Result<(), MechError>;

    /// Actuate a full demand vector.
    fn actuate(&mut self, dems: &ControlDems) -> Result<(), MechError> {
        for id in ThrusterId::ALL.iter() {
            self.set_thruster(*id, dems[*id])?;
        }

        for id in ServoId::ALL.iter() {
            self.set_servo(*id, dems.servo(*id))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Parameters for the vehicle's mechanisms.
#[derive(Debug, Serialize, Deserialize)]
pub struct MechParams {
    /// Frequency of the PWM signal driving the ESCs and servos.
    ///
    /// Units: hertz
    pub pwm_freq_hz: f32,

    // ---- THRUSTERS ----
    /// Pulse width commanding full reverse throttle.
    ///
    /// Units: microseconds
    pub thruster_pulse_min_us: f32,

    /// Pulse width commanding full forward throttle.
    ///
    /// Units: microseconds
    pub thruster_pulse_max_us: f32,

    /// Time the neutral signal is held while the ESCs arm.
    ///
    /// Units: seconds
    pub esc_arming_hold_s: f32,

    // ---- SERVOS ----
    /// Pulse width commanding the low end of the servo range.
    ///
    /// Units: microseconds
    pub servo_pulse_min_us: f32,

    /// Pulse width commanding the high end of the servo range.
    ///
    /// Units: microseconds
    pub servo_pulse_max_us: f32,

    /// Angular range of the auxiliary servos. A demand of -1.0 maps to zero
    /// degrees and +1.0 to this angle.
    ///
    /// Units: degrees
    pub servo_angle_range_deg: f32,
}

/// Vehicle attitude as Tait-Bryan angles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attitude {
    /// Units: degrees
    pub yaw_deg: f32,

    /// Units: degrees
    pub pitch_deg: f32,

    /// Units: degrees
    pub roll_deg: f32,
}

/// Simulated mechanisms, stands in for the hardware on bench setups.
///
/// Actuations are recorded and logged at trace level so bench runs can be
/// followed in the session log.
#[derive(Debug, Default)]
pub struct SimMech {
    thrusters: [f32; NUM_THRUSTERS],

    servos: [f32; NUM_SERVOS],

    attitude: Attitude,

    armed: bool,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MechError {
    #[error("An I2C error occured")]
    I2c,

    #[error("Thruster throttle of {0} is outside the [-1.0, +1.0] range")]
    InvalidThrottle(f32),

    #[error("Servo demand of {0} is outside the [-1.0, +1.0] range")]
    InvalidDemand(f32),

    #[error("Unachievable PWM frequency of {0} Hz")]
    InvalidPwmFrequency(f32),

    #[error("The PWM driver rejected the requested output")]
    PwmRejected,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl SimMech {
    /// Create a new simulated mechanisms driver in the unarmed state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attitude the simulated sensors will report.
    pub fn set_attitude(&mut self, attitude: Attitude) {
        self.attitude = attitude;
    }

    /// The last throttle actuated on the given thruster.
    pub fn thruster(&self, id: ThrusterId) -> f32 {
        self.thrusters[id.index()]
    }

    /// The last demand actuated on the given servo.
    pub fn servo(&self, id: ServoId) -> f32 {
        self.servos[id.index()]
    }

    /// Whether the simulated ESCs have been armed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl MechDriver for SimMech {
    fn arm(&mut self) -> Result<(), MechError> {
        self.armed = true;

        info!("Simulated ESCs armed");

        Ok(())
    }

    fn set_thruster(&mut self, id: ThrusterId, throttle: f32) -> Result<(), MechError> {
        if !throttle.is_finite() || throttle < -1.0 || throttle > 1.0 {
            return Err(MechError::InvalidThrottle(throttle));
        }

        self.thrusters[id.index()] = throttle;

        trace!("SimMech thruster {:?} set to {:.3}", id, throttle);

        Ok(())
    }

    fn set_servo(&mut self, id: ServoId, demand: f32) -> Result<(), MechError> {
        if !demand.is_finite() || demand < -1.0 || demand > 1.0 {
            return Err(MechError::InvalidDemand(demand));
        }

        self.servos[id.index()] = demand;

        trace!("SimMech servo {:?} set to {:.3}", id, demand);

        Ok(())
    }

    fn attitude(&mut self) -> Result<Attitude, MechError> {
        Ok(self.attitude)
    }

    fn safe_all(&mut self) -> Result<(), MechError> {
        self.thrusters = [0.0; NUM_THRUSTERS];

        info!("SimMech thrusters safed");

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_actuation() {
        let mut mech = SimMech::new();
        mech.arm().expect("arming failed");

        let mut dems = ControlDems::neutral();
        dems[ThrusterId::FrontLeft] = 0.5;
        dems[ThrusterId::TopRight] = -0.25;
        dems.camera_tilt = 1.0;
        dems.tool_grip = -0.5;

        mech.actuate(&dems).expect("actuation failed");

        assert!(mech.is_armed());
        assert_eq!(mech.thruster(ThrusterId::FrontLeft), 0.5);
        assert_eq!(mech.thruster(ThrusterId::TopRight), -0.25);
        assert_eq!(mech.thruster(ThrusterId::BackLeft), 0.0);
        assert_eq!(mech.servo(ServoId::CameraTilt), 1.0);
        assert_eq!(mech.servo(ServoId::ToolGrip), -0.5);
    }

    #[test]
    fn test_out_of_range_demands_rejected() {
        let mut mech = SimMech::new();

        assert!(matches!(
            mech.set_thruster(ThrusterId::FrontLeft, 1.5),
            Err(MechError::InvalidThrottle(_))
        ));
        assert!(matches!(
            mech.set_thruster(ThrusterId::FrontLeft, f32::NAN),
            Err(MechError::InvalidThrottle(_))
        ));
        assert!(matches!(
            mech.set_servo(ServoId::ToolWrist, -1.01),
            Err(MechError::InvalidDemand(_))
        ));

        // A rejected demand must not change the recorded state
        assert_eq!(mech.thruster(ThrusterId::FrontLeft), 0.0);
        assert_eq!(mech.servo(ServoId::ToolWrist), 0.0);
    }

    #[test]
    fn test_safing_neutralises_thrusters_only() {
        let mut mech = SimMech::new();

        for id in ThrusterId::ALL.iter() {
            mech.set_thruster(*id, 0.8).expect("set failed");
        }
        mech.set_servo(ServoId::CameraTilt, 0.5).expect("set failed");

        mech.safe_all().expect("safing failed");

        for id in ThrusterId::ALL.iter() {
            assert_eq!(mech.thruster(*id), 0.0);
        }

        // Servos hold position during safing
        assert_eq!(mech.servo(ServoId::CameraTilt), 0.5);
    }

    #[test]
    fn test_sim_attitude() {
        let mut mech = SimMech::new();

        let att = Attitude {
            yaw_deg: 10.0,
            pitch_deg: -2.0,
            roll_deg: 4.5,
        };
        mech.set_attitude(att);

        let read = mech.attitude().expect("attitude read failed");
        assert_eq!(read.roll_deg, 4.5);
        assert_eq!(read.pitch_deg, -2.0);
        assert_eq!(read.yaw_deg, 10.0);
    }
}
