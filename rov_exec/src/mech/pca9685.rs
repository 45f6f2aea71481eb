//! [`MechDriver`] implementation for the PCA9685 PWM driver board.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::info;
use pwm_pca9685::{Address, Channel, Pca9685};
use std::thread;
use std::time::Duration;

// Internal
use comms_if::eqpt::{ServoId, ThrusterId};
use util::maths::lin_map;

use super::{Attitude, MechDriver, MechError, MechParams};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of PWM counts in one output period.
const MAX_PWM: u16 = 4096;

/// Frequency of the board's internal oscillator.
const OSC_CLOCK_HZ: f32 = 25_000_000.0;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Mechanisms driver backed by a single PCA9685 board.
///
/// Thrusters and servos are driven as pulse-width outputs on the channel
/// assignment fixed by the vehicle's wiring loom.
pub struct Pca9685Mech<I2C> {
    pwm: Pca9685<I2C>,

    params: MechParams,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl<I2C, E> Pca9685Mech<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    /// Initialise the board, programming the PWM frequency and starting the
    /// oscillator.
    pub fn new(i2c: I2C, params: MechParams) -> Result<Self, MechError> {
        let prescale = (OSC_CLOCK_HZ / (MAX_PWM as f32 * params.pwm_freq_hz)).round() - 1.0;

        // The prescale register can only express frequencies in roughly the
        // 24 Hz to 1.5 kHz band
        if !prescale.is_finite() || prescale < 3.0 || prescale > 255.0 {
            return Err(MechError::InvalidPwmFrequency(params.pwm_freq_hz));
        }

        let mut pwm = Pca9685::new(i2c, Address::default()).map_err(pwm_error)?;

        // The prescale can only be programmed while the oscillator is
        // asleep, which is the power on state
        pwm.set_prescale(prescale as u8).map_err(pwm_error)?;
        pwm.enable().map_err(pwm_error)?;

        Ok(Self { pwm, params })
    }

    /// Drive a channel with a pulse of the given width.
    fn set_pulse_us(&mut self, channel: Channel, pulse_us: f32) -> Result<(), MechError> {
        let counts = pulse_counts(pulse_us, self.params.pwm_freq_hz);

        self.pwm.set_channel_on(channel, 0).map_err(pwm_error)?;
        self.pwm.set_channel_off(channel, counts).map_err(pwm_error)
    }
}

impl<I2C, E> MechDriver for Pca9685Mech<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    fn arm(&mut self) -> Result<(), MechError> {
        // ESCs arm on a steady neutral signal inside the calibrated band
        for id in ThrusterId::ALL.iter() {
            self.set_thruster(*id, 0.0)?;
        }

        thread::sleep(Duration::from_secs_f32(
            self.params.esc_arming_hold_s.max(0.0),
        ));

        info!("ESCs armed");

        Ok(())
    }

    fn set_thruster(&mut self, id: ThrusterId, throttle: f32) -> Result<(), MechError> {
        if !throttle.is_finite() || throttle < -1.0 || throttle > 1.0 {
            return Err(MechError::InvalidThrottle(throttle));
        }

        let pulse_us = lin_map(
            (-1.0, 1.0),
            (
                self.params.thruster_pulse_min_us,
                self.params.thruster_pulse_max_us,
            ),
            throttle,
        );

        self.set_pulse_us(thruster_channel(id), pulse_us)
    }

    fn set_servo(&mut self, id: ServoId, demand: f32) -> Result<(), MechError> {
        if !demand.is_finite() || demand < -1.0 || demand > 1.0 {
            return Err(MechError::InvalidDemand(demand));
        }

        // The demand maps onto the servo's angular range with 0.0 at centre
        let angle_deg = lin_map((-1.0, 1.0), (0.0, self.params.servo_angle_range_deg), demand);

        let pulse_us = lin_map(
            (0.0, self.params.servo_angle_range_deg),
            (self.params.servo_pulse_min_us, self.params.servo_pulse_max_us),
            angle_deg,
        );

        self.set_pulse_us(servo_channel(id), pulse_us)
    }

    fn attitude(&mut self) -> Result<Attitude, MechError> {
        // TODO: read the IMU here once it is wired onto the I2C bus
        Ok(Attitude::default())
    }

    fn safe_all(&mut self) -> Result<(), MechError> {
        for id in ThrusterId::ALL.iter() {
            self.set_thruster(*id, 0.0)?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// PCA9685 channel assignment for each thruster, fixed by the vehicle's
/// wiring loom.
fn thruster_channel(id: ThrusterId) -> Channel {
    match id {
        ThrusterId::FrontLeft => Channel::C0,
        ThrusterId::FrontRight => Channel::C1,
        ThrusterId::BackLeft => Channel::C2,
        ThrusterId::BackRight => Channel::C3,
        ThrusterId::TopLeft => Channel::C4,
        ThrusterId::TopRight => Channel::C5,
    }
}

/// PCA9685 channel assignment for each servo, fixed by the vehicle's wiring
/// loom.
fn servo_channel(id: ServoId) -> Channel {
    match id {
        ServoId::ToolWrist => Channel::C10,
        ServoId::ToolGrip => Channel::C11,
        ServoId::CameraTilt => Channel::C15,
    }
}

/// Convert a pulse width into PWM counts at the given output frequency.
fn pulse_counts(pulse_us: f32, pwm_freq_hz: f32) -> u16 {
    let period_us = 1.0e6 / pwm_freq_hz;
    let counts = (pulse_us / period_us * MAX_PWM as f32) as u16;

    counts.min(MAX_PWM - 1)
}

/// Collapse driver errors into a [`MechError`].
fn pwm_error<E>(error: pwm_pca9685::Error<E>) -> MechError {
    match error {
        pwm_pca9685::Error::I2C(_) => MechError::I2c,
        pwm_pca9685::Error::InvalidInputData => MechError::PwmRejected,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pulse_counts() {
        // At 50 Hz the period is 20 ms, 4096 counts
        assert_eq!(pulse_counts(1500.0, 50.0), 307);
        assert_eq!(pulse_counts(1100.0, 50.0), 225);
        assert_eq!(pulse_counts(1900.0, 50.0), 389);

        // Always-off and beyond-period pulses saturate
        assert_eq!(pulse_counts(0.0, 50.0), 0);
        assert_eq!(pulse_counts(30_000.0, 50.0), MAX_PWM - 1);
    }
}
