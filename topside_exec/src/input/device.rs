//! Physical input devices and the capabilities they report

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Internal
use super::STICK_AXIS_AS_DIGITAL_DEADZONE;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of capabilities in [`Capability::ALL`].
pub const NUM_CAPS: usize = 34;

/// The number of buttons a standard pad reports.
pub const NUM_PAD_BUTTONS: usize = 11;

/// The number of axes a standard pad reports.
pub const NUM_PAD_AXES: usize = 6;

/// Axis indices for a standard xbox style pad.
const AXIS_LSTICK_X: usize = 0;
const AXIS_LSTICK_Y: usize = 1;
const AXIS_RSTICK_X: usize = 2;
const AXIS_RSTICK_Y: usize = 3;
const AXIS_LTRIGGER: usize = 4;
const AXIS_RTRIGGER: usize = 5;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Everything a standard pad can report, addressed by a stable name.
///
/// The stick direction and trigger capabilities are "virtual" digital inputs derived from the
/// underlying axes, so that mappings are free to treat a stick flick as a button press.
///
/// [`Capability::None`] is the capability unmapped logical names resolve to. It always yields a
/// neutral analogue reading, so digital queries on it fail closed and axis reads return zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    None,
    A,
    B,
    X,
    Y,
    Start,
    Home,
    Select,
    LBumper,
    RBumper,
    LStick,
    RStick,
    LStickUp,
    LStickDown,
    LStickLeft,
    LStickRight,
    RStickUp,
    RStickDown,
    RStickLeft,
    RStickRight,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    LTriggerDigital,
    RTriggerDigital,
    LTriggerAnalogue,
    RTriggerAnalogue,
    LStickX,
    LStickY,
    RStickX,
    RStickY,
    DpadX,
    DpadY,
}

/// A single capability reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapReading {
    /// A button-like state, true while held.
    Digital(bool),

    /// An axis-like deflection.
    ///
    /// Units: normalised deflection in [-1, +1]
    Analogue(f32),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The raw polling primitive over a physical controller.
///
/// The window layer provides the real implementation of this trait. Indices follow the standard
/// xbox controller layout. Implementations must return a neutral value for any button, axis or
/// hat the device does not have, never panic.
pub trait InputDevice: Send {
    /// Human readable name of the device, for logs.
    fn name(&self) -> &str;

    /// True if a physical device is currently attached.
    fn connected(&self) -> bool;

    /// Refresh the device state. Called once at the top of every [`super::Pad::poll`].
    fn update(&mut self);

    /// State of the numbered button, false if the device has no such button.
    fn button(&self, button: usize) -> bool;

    /// Deflection of the numbered axis in [-1, +1], 0.0 if the device has no such axis.
    fn axis(&self, axis: usize) -> f32;

    /// State of the numbered hat as (x, y), each in {-1, 0, +1}, (0, 0) if the device has no
    /// such hat.
    fn hat(&self, hat: usize) -> (i8, i8);
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Stand-in device for headless runs with no controller attached.
pub struct NullDevice;

/// Device which replays a canned sequence of [`DeviceFrame`]s, one per update.
///
/// Used for bench runs and tests. Past the end of the script the device reads as a pad at rest.
pub struct ScriptedDevice {
    frames: Vec<DeviceFrame>,
    cursor: Option<usize>,
}

/// One update's worth of raw device state for a [`ScriptedDevice`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceFrame {
    pub buttons: [bool; NUM_PAD_BUTTONS],
    pub axes: [f32; NUM_PAD_AXES],
    pub hat: (i8, i8),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Capability {
    /// All capabilities, in a fixed order matching [`Capability::index`].
    pub const ALL: [Capability; NUM_CAPS] = [
        Capability::None,
        Capability::A,
        Capability::B,
        Capability::X,
        Capability::Y,
        Capability::Start,
        Capability::Home,
        Capability::Select,
        Capability::LBumper,
        Capability::RBumper,
        Capability::LStick,
        Capability::RStick,
        Capability::LStickUp,
        Capability::LStickDown,
        Capability::LStickLeft,
        Capability::LStickRight,
        Capability::RStickUp,
        Capability::RStickDown,
        Capability::RStickLeft,
        Capability::RStickRight,
        Capability::DpadUp,
        Capability::DpadDown,
        Capability::DpadLeft,
        Capability::DpadRight,
        Capability::LTriggerDigital,
        Capability::RTriggerDigital,
        Capability::LTriggerAnalogue,
        Capability::RTriggerAnalogue,
        Capability::LStickX,
        Capability::LStickY,
        Capability::RStickX,
        Capability::RStickY,
        Capability::DpadX,
        Capability::DpadY,
    ];

    /// Get the capability with the given stable name, as used in input mapping files.
    pub fn from_name(name: &str) -> Option<Self> {
        let cap = match name {
            "none" => Capability::None,
            "a" => Capability::A,
            "b" => Capability::B,
            "x" => Capability::X,
            "y" => Capability::Y,
            "start" => Capability::Start,
            "home" => Capability::Home,
            "select" => Capability::Select,
            "lbumper" => Capability::LBumper,
            "rbumper" => Capability::RBumper,
            "lstick" => Capability::LStick,
            "rstick" => Capability::RStick,
            "lstick_up" => Capability::LStickUp,
            "lstick_down" => Capability::LStickDown,
            "lstick_left" => Capability::LStickLeft,
            "lstick_right" => Capability::LStickRight,
            "rstick_up" => Capability::RStickUp,
            "rstick_down" => Capability::RStickDown,
            "rstick_left" => Capability::RStickLeft,
            "rstick_right" => Capability::RStickRight,
            "dpad_up" => Capability::DpadUp,
            "dpad_down" => Capability::DpadDown,
            "dpad_left" => Capability::DpadLeft,
            "dpad_right" => Capability::DpadRight,
            "ltrigger_digital" => Capability::LTriggerDigital,
            "rtrigger_digital" => Capability::RTriggerDigital,
            "ltrigger_analogue" => Capability::LTriggerAnalogue,
            "rtrigger_analogue" => Capability::RTriggerAnalogue,
            "lstick_x" => Capability::LStickX,
            "lstick_y" => Capability::LStickY,
            "rstick_x" => Capability::RStickX,
            "rstick_y" => Capability::RStickY,
            "dpad_x" => Capability::DpadX,
            "dpad_y" => Capability::DpadY,
            _ => return None,
        };

        Some(cap)
    }

    /// The stable name of this capability, as used in input mapping files.
    pub fn name(&self) -> &'static str {
        match self {
            Capability::None => "none",
            Capability::A => "a",
            Capability::B => "b",
            Capability::X => "x",
            Capability::Y => "y",
            Capability::Start => "start",
            Capability::Home => "home",
            Capability::Select => "select",
            Capability::LBumper => "lbumper",
            Capability::RBumper => "rbumper",
            Capability::LStick => "lstick",
            Capability::RStick => "rstick",
            Capability::LStickUp => "lstick_up",
            Capability::LStickDown => "lstick_down",
            Capability::LStickLeft => "lstick_left",
            Capability::LStickRight => "lstick_right",
            Capability::RStickUp => "rstick_up",
            Capability::RStickDown => "rstick_down",
            Capability::RStickLeft => "rstick_left",
            Capability::RStickRight => "rstick_right",
            Capability::DpadUp => "dpad_up",
            Capability::DpadDown => "dpad_down",
            Capability::DpadLeft => "dpad_left",
            Capability::DpadRight => "dpad_right",
            Capability::LTriggerDigital => "ltrigger_digital",
            Capability::RTriggerDigital => "rtrigger_digital",
            Capability::LTriggerAnalogue => "ltrigger_analogue",
            Capability::RTriggerAnalogue => "rtrigger_analogue",
            Capability::LStickX => "lstick_x",
            Capability::LStickY => "lstick_y",
            Capability::RStickX => "rstick_x",
            Capability::RStickY => "rstick_y",
            Capability::DpadX => "dpad_x",
            Capability::DpadY => "dpad_y",
        }
    }

    /// Index of this capability into arrays ordered as [`Capability::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// True if this capability reports an analogue reading rather than a digital one.
    pub fn is_analogue(self) -> bool {
        match self {
            Capability::None
            | Capability::LTriggerAnalogue
            | Capability::RTriggerAnalogue
            | Capability::LStickX
            | Capability::LStickY
            | Capability::RStickX
            | Capability::RStickY
            | Capability::DpadX
            | Capability::DpadY => true,
            _ => false,
        }
    }

    /// The reading this capability yields with the device at rest.
    pub fn neutral(self) -> CapReading {
        if self.is_analogue() {
            CapReading::Analogue(0.0)
        } else {
            CapReading::Digital(false)
        }
    }

    /// Read this capability's current value from the given device.
    ///
    /// Button and axis indices are based off an xbox controller. Sticks held up report negative
    /// Y deflection, and the trigger axes rest fully released at -1.0.
    pub(crate) fn read(self, device: &dyn InputDevice) -> CapReading {
        use CapReading::{Analogue, Digital};

        match self {
            Capability::None => Analogue(0.0),

            Capability::A => Digital(device.button(0)),
            Capability::B => Digital(device.button(1)),
            Capability::X => Digital(device.button(2)),
            Capability::Y => Digital(device.button(3)),

            Capability::Start => Digital(device.button(7)),
            Capability::Home => Digital(device.button(10)),
            Capability::Select => Digital(device.button(6)),

            Capability::LBumper => Digital(device.button(4)),
            Capability::RBumper => Digital(device.button(5)),

            Capability::LStick => Digital(device.button(8)),
            Capability::RStick => Digital(device.button(9)),

            Capability::LStickUp => {
                Digital(device.axis(AXIS_LSTICK_Y) < -STICK_AXIS_AS_DIGITAL_DEADZONE)
            }
            Capability::LStickDown => {
                Digital(device.axis(AXIS_LSTICK_Y) > STICK_AXIS_AS_DIGITAL_DEADZONE)
            }
            Capability::LStickLeft => {
                Digital(device.axis(AXIS_LSTICK_X) < -STICK_AXIS_AS_DIGITAL_DEADZONE)
            }
            Capability::LStickRight => {
                Digital(device.axis(AXIS_LSTICK_X) > STICK_AXIS_AS_DIGITAL_DEADZONE)
            }

            Capability::RStickUp => {
                Digital(device.axis(AXIS_RSTICK_Y) < -STICK_AXIS_AS_DIGITAL_DEADZONE)
            }
            Capability::RStickDown => {
                Digital(device.axis(AXIS_RSTICK_Y) > STICK_AXIS_AS_DIGITAL_DEADZONE)
            }
            Capability::RStickLeft => {
                Digital(device.axis(AXIS_RSTICK_X) < -STICK_AXIS_AS_DIGITAL_DEADZONE)
            }
            Capability::RStickRight => {
                Digital(device.axis(AXIS_RSTICK_X) > STICK_AXIS_AS_DIGITAL_DEADZONE)
            }

            Capability::DpadUp => Digital(device.hat(0).1 == 1),
            Capability::DpadDown => Digital(device.hat(0).1 == -1),
            Capability::DpadLeft => Digital(device.hat(0).0 == -1),
            Capability::DpadRight => Digital(device.hat(0).0 == 1),

            Capability::LTriggerDigital => Digital(device.axis(AXIS_LTRIGGER) > -1.0),
            Capability::RTriggerDigital => Digital(device.axis(AXIS_RTRIGGER) > -1.0),

            Capability::LTriggerAnalogue => Analogue(device.axis(AXIS_LTRIGGER)),
            Capability::RTriggerAnalogue => Analogue(device.axis(AXIS_RTRIGGER)),

            Capability::LStickX => Analogue(device.axis(AXIS_LSTICK_X)),
            Capability::LStickY => Analogue(device.axis(AXIS_LSTICK_Y)),
            Capability::RStickX => Analogue(device.axis(AXIS_RSTICK_X)),
            Capability::RStickY => Analogue(device.axis(AXIS_RSTICK_Y)),

            Capability::DpadX => Analogue(device.hat(0).0 as f32),
            Capability::DpadY => Analogue(device.hat(0).1 as f32),
        }
    }
}

impl InputDevice for NullDevice {
    fn name(&self) -> &str {
        "none"
    }

    fn connected(&self) -> bool {
        false
    }

    fn update(&mut self) {}

    fn button(&self, _button: usize) -> bool {
        false
    }

    fn axis(&self, _axis: usize) -> f32 {
        0.0
    }

    fn hat(&self, _hat: usize) -> (i8, i8) {
        (0, 0)
    }
}

impl ScriptedDevice {
    /// Create a device which will report the given frames in order, one per update.
    pub fn new(frames: Vec<DeviceFrame>) -> Self {
        ScriptedDevice {
            frames,
            cursor: None,
        }
    }

    fn frame(&self) -> DeviceFrame {
        match self.cursor {
            Some(i) => self.frames.get(i).copied().unwrap_or_default(),
            None => DeviceFrame::default(),
        }
    }
}

impl InputDevice for ScriptedDevice {
    fn name(&self) -> &str {
        "scripted"
    }

    fn connected(&self) -> bool {
        true
    }

    fn update(&mut self) {
        self.cursor = Some(match self.cursor {
            Some(i) => i + 1,
            None => 0,
        });
    }

    fn button(&self, button: usize) -> bool {
        self.frame().buttons.get(button).copied().unwrap_or(false)
    }

    fn axis(&self, axis: usize) -> f32 {
        self.frame().axes.get(axis).copied().unwrap_or(0.0)
    }

    fn hat(&self, hat: usize) -> (i8, i8) {
        if hat == 0 {
            self.frame().hat
        } else {
            (0, 0)
        }
    }
}

impl Default for DeviceFrame {
    /// A pad at rest. Trigger axes rest fully released at -1.0.
    fn default() -> Self {
        let mut axes = [0.0; NUM_PAD_AXES];
        axes[AXIS_LTRIGGER] = -1.0;
        axes[AXIS_RTRIGGER] = -1.0;

        DeviceFrame {
            buttons: [false; NUM_PAD_BUTTONS],
            axes,
            hat: (0, 0),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_capability_names_round_trip() {
        assert_eq!(Capability::ALL.len(), NUM_CAPS);

        for (i, cap) in Capability::ALL.iter().enumerate() {
            assert_eq!(cap.index(), i);
            assert_eq!(Capability::from_name(cap.name()), Some(*cap));
        }

        assert_eq!(Capability::from_name("not_a_capability"), None);
    }

    #[test]
    fn test_stick_as_digital_deadzone() {
        let mut frame = DeviceFrame::default();
        frame.axes[AXIS_LSTICK_Y] = -STICK_AXIS_AS_DIGITAL_DEADZONE;

        let mut device = ScriptedDevice::new(vec![frame]);
        device.update();

        // Deflection exactly on the deadzone does not count as held
        assert_eq!(
            Capability::LStickUp.read(&device),
            CapReading::Digital(false)
        );

        frame.axes[AXIS_LSTICK_Y] = -0.5;
        let mut device = ScriptedDevice::new(vec![frame]);
        device.update();

        assert_eq!(
            Capability::LStickUp.read(&device),
            CapReading::Digital(true)
        );
        assert_eq!(
            Capability::LStickDown.read(&device),
            CapReading::Digital(false)
        );
        assert_eq!(
            Capability::LStickY.read(&device),
            CapReading::Analogue(-0.5)
        );
    }

    #[test]
    fn test_resting_pad_reads_neutral() {
        let mut device = ScriptedDevice::new(vec![DeviceFrame::default()]);
        device.update();

        for cap in Capability::ALL.iter() {
            // The analogue triggers rest at -1.0, everything else at its neutral reading
            let expected = match cap {
                Capability::LTriggerAnalogue | Capability::RTriggerAnalogue => {
                    CapReading::Analogue(-1.0)
                }
                _ => cap.neutral(),
            };

            assert_eq!(cap.read(&device), expected, "{}", cap.name());
        }
    }
}
