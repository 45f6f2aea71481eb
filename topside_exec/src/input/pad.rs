//! Pad state tracking, edge detection and dead-zone filtering

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use std::collections::HashSet;

// Internal
use super::{CapReading, Capability, InputDevice, InputMap, NUM_CAPS};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The logical pad.
///
/// Holds the current and previous capability snapshots of one [`InputDevice`], the logical name
/// mapping and the keyboard fallback state for this tick. All reads are answered from the
/// snapshots, so every query within one tick sees the same state.
pub struct Pad {
    device: Box<dyn InputDevice>,
    map: InputMap,
    current: PadSnapshot,
    last: PadSnapshot,
    keys: KeySnapshot,
}

/// Readings of every capability at one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadSnapshot {
    readings: [CapReading; NUM_CAPS],
}

/// Keyboard state for one tick, handed over by the window layer.
///
/// When running headless there is no window layer and the default (empty) snapshot is used,
/// under which every fallback query reads false.
#[derive(Debug, Clone, Default)]
pub struct KeySnapshot {
    held: HashSet<String>,
    pressed: HashSet<String>,
    released: HashSet<String>,
}

/// Keyboard keys substituted for a two-axis read while any of them is held.
#[derive(Debug, Clone, Default)]
pub struct VectorFallback {
    pub x_pos: Option<String>,
    pub x_neg: Option<String>,
    pub y_pos: Option<String>,
    pub y_neg: Option<String>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Pad {
    /// Create a new pad over the given device and mapping.
    ///
    /// An initial snapshot is taken so that inputs already held at startup do not read as edges
    /// on the first poll.
    pub fn new(device: Box<dyn InputDevice>, map: InputMap) -> Self {
        let snapshot = if device.connected() {
            PadSnapshot::capture(device.as_ref())
        } else {
            PadSnapshot::neutral()
        };

        Pad {
            device,
            map,
            current: snapshot,
            last: snapshot,
            keys: KeySnapshot::default(),
        }
    }

    /// True if a physical device is currently attached.
    pub fn connected(&self) -> bool {
        self.device.connected()
    }

    /// Human readable name of the underlying device, for logs.
    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    /// Translate a logical input name into the capability it is bound to.
    pub fn translate(&self, logical: &str) -> Capability {
        self.map.translate(logical)
    }

    /// Refresh the snapshots from the device and store this tick's keyboard state.
    ///
    /// Returns true if any capability changed since the previous poll, false when no device is
    /// attached.
    pub fn poll(&mut self, keys: KeySnapshot) -> bool {
        self.keys = keys;

        self.device.update();

        if !self.device.connected() {
            return false;
        }

        self.last = self.current;
        self.current = PadSnapshot::capture(self.device.as_ref());

        self.current != self.last
    }

    /// True while any of the given capabilities is held, or while the fallback key is held.
    ///
    /// Any member that does not read as a digital value fails the whole query closed.
    pub fn digital_down(&self, caps: &[Capability], fallback: Option<&str>) -> bool {
        if let Some(key) = fallback {
            if self.keys.is_held(key) {
                return true;
            }
        }

        if !self.device.connected() {
            return false;
        }

        let mut down = false;

        for &cap in caps {
            match self.current.get(cap) {
                CapReading::Digital(state) => down = down || state,
                _ => return false,
            }
        }

        down
    }

    /// True on the tick any of the given capabilities went from released to held, or on the tick
    /// the fallback key was pressed.
    ///
    /// Any member that does not read as a digital value in both snapshots fails the whole query
    /// closed.
    pub fn digital_pressed(&self, caps: &[Capability], fallback: Option<&str>) -> bool {
        if let Some(key) = fallback {
            if self.keys.just_pressed(key) {
                return true;
            }
        }

        if !self.device.connected() {
            return false;
        }

        let mut pressed = false;

        for &cap in caps {
            match (self.current.get(cap), self.last.get(cap)) {
                (CapReading::Digital(now), CapReading::Digital(before)) => {
                    pressed = pressed || (now && !before)
                }
                _ => return false,
            }
        }

        pressed
    }

    /// True on the tick any of the given capabilities went from held to released, or on the tick
    /// the fallback key was released.
    ///
    /// Any member that does not read as a digital value in both snapshots fails the whole query
    /// closed.
    pub fn digital_released(&self, caps: &[Capability], fallback: Option<&str>) -> bool {
        if let Some(key) = fallback {
            if self.keys.just_released(key) {
                return true;
            }
        }

        if !self.device.connected() {
            return false;
        }

        let mut released = false;

        for &cap in caps {
            match (self.current.get(cap), self.last.get(cap)) {
                (CapReading::Digital(now), CapReading::Digital(before)) => {
                    released = released || (!now && before)
                }
                _ => return false,
            }
        }

        released
    }

    /// Read an analogue capability, zeroing values inside the dead zone.
    ///
    /// Values whose magnitude is less than or equal to `deadzone` read as exactly 0.0, everything
    /// else is passed through raw. Capabilities that do not read as analogue values, and any read
    /// with no device attached, yield 0.0.
    pub fn read_axis(&self, cap: Capability, deadzone: f32) -> f32 {
        if !self.device.connected() {
            return 0.0;
        }

        match self.current.get(cap) {
            CapReading::Analogue(value) if value.abs() > deadzone => value,
            _ => 0.0,
        }
    }

    /// Read two analogue capabilities as a 2D vector.
    ///
    /// While any of the fallback keys is held the keyboard substitutes for the pad and the
    /// vector is built from the held keys alone, each axis reading -1, 0 or +1.
    pub fn read_vector(
        &self,
        cap_x: Capability,
        cap_y: Capability,
        deadzone: f32,
        fallback: &VectorFallback,
    ) -> (f32, f32) {
        let mut x = 0.0;
        let mut y = 0.0;

        if self.fallback_held(&fallback.x_pos) {
            x += 1.0;
        }
        if self.fallback_held(&fallback.x_neg) {
            x -= 1.0;
        }
        if self.fallback_held(&fallback.y_pos) {
            y += 1.0;
        }
        if self.fallback_held(&fallback.y_neg) {
            y -= 1.0;
        }

        if x != 0.0 || y != 0.0 {
            return (x, y);
        }

        if !self.device.connected() {
            return (0.0, 0.0);
        }

        (self.read_axis(cap_x, deadzone), self.read_axis(cap_y, deadzone))
    }

    fn fallback_held(&self, key: &Option<String>) -> bool {
        match key {
            Some(k) => self.keys.is_held(k),
            None => false,
        }
    }
}

impl PadSnapshot {
    /// A snapshot of a pad at rest.
    pub fn neutral() -> Self {
        let mut readings = [CapReading::Analogue(0.0); NUM_CAPS];

        for &cap in Capability::ALL.iter() {
            readings[cap.index()] = cap.neutral();
        }

        PadSnapshot { readings }
    }

    /// Capture the current state of every capability of the given device.
    pub fn capture(device: &dyn InputDevice) -> Self {
        let mut readings = [CapReading::Analogue(0.0); NUM_CAPS];

        for &cap in Capability::ALL.iter() {
            readings[cap.index()] = cap.read(device);
        }

        PadSnapshot { readings }
    }

    /// Get the reading of one capability.
    pub fn get(&self, cap: Capability) -> CapReading {
        self.readings[cap.index()]
    }
}

impl KeySnapshot {
    pub fn new() -> Self {
        KeySnapshot::default()
    }

    /// Mark a key as held during this tick.
    pub fn hold(&mut self, key: &str) {
        self.held.insert(key.to_owned());
    }

    /// Mark a key as having gone down this tick. A key that just went down is also held.
    pub fn press(&mut self, key: &str) {
        self.pressed.insert(key.to_owned());
        self.held.insert(key.to_owned());
    }

    /// Mark a key as having gone up this tick.
    pub fn release(&mut self, key: &str) {
        self.released.insert(key.to_owned());
        self.held.remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    pub fn just_pressed(&self, key: &str) -> bool {
        self.pressed.contains(key)
    }

    pub fn just_released(&self, key: &str) -> bool {
        self.released.contains(key)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::{DeviceFrame, NullDevice, ScriptedDevice};
    use super::*;

    /// Build a pad which replays the given frames, one per poll.
    fn pad_with_script(frames: Vec<DeviceFrame>) -> Pad {
        Pad::new(Box::new(ScriptedDevice::new(frames)), InputMap::empty())
    }

    fn frame_with_button(button: usize) -> DeviceFrame {
        let mut frame = DeviceFrame::default();
        frame.buttons[button] = true;
        frame
    }

    fn frame_with_axis(axis: usize, value: f32) -> DeviceFrame {
        let mut frame = DeviceFrame::default();
        frame.axes[axis] = value;
        frame
    }

    #[test]
    fn test_edge_detection() {
        // A held for two ticks then released
        let mut pad = pad_with_script(vec![
            frame_with_button(0),
            frame_with_button(0),
            DeviceFrame::default(),
        ]);
        let a = [Capability::A];

        // Tick 1: the press edge
        pad.poll(KeySnapshot::new());
        assert!(pad.digital_down(&a, None));
        assert!(pad.digital_pressed(&a, None));
        assert!(!pad.digital_released(&a, None));

        // Tick 2: still held, no edge
        pad.poll(KeySnapshot::new());
        assert!(pad.digital_down(&a, None));
        assert!(!pad.digital_pressed(&a, None));
        assert!(!pad.digital_released(&a, None));

        // Tick 3: the release edge
        pad.poll(KeySnapshot::new());
        assert!(!pad.digital_down(&a, None));
        assert!(!pad.digital_pressed(&a, None));
        assert!(pad.digital_released(&a, None));
    }

    #[test]
    fn test_multi_key_or() {
        // B (button 1) held, A never touched
        let mut pad = pad_with_script(vec![frame_with_button(1)]);
        pad.poll(KeySnapshot::new());

        assert!(pad.digital_down(&[Capability::A, Capability::B], None));
        assert!(pad.digital_pressed(&[Capability::A, Capability::B], None));
        assert!(!pad.digital_down(&[Capability::A], None));
    }

    #[test]
    fn test_non_digital_member_fails_closed() {
        let mut pad = pad_with_script(vec![frame_with_button(0)]);
        pad.poll(KeySnapshot::new());

        assert!(pad.digital_down(&[Capability::A], None));

        // An analogue or none member poisons the whole query, even though A is held
        assert!(!pad.digital_down(&[Capability::A, Capability::LStickX], None));
        assert!(!pad.digital_down(&[Capability::A, Capability::None], None));
        assert!(!pad.digital_pressed(&[Capability::A, Capability::LStickX], None));
        assert!(!pad.digital_released(&[Capability::A, Capability::None], None));
    }

    #[test]
    fn test_read_axis_deadzone() {
        let mut pad = pad_with_script(vec![
            frame_with_axis(1, 0.1),
            frame_with_axis(1, -0.05),
            frame_with_axis(1, -0.25),
        ]);

        // Magnitude equal to the dead zone reads exactly zero
        pad.poll(KeySnapshot::new());
        assert_eq!(pad.read_axis(Capability::LStickY, 0.1), 0.0);

        // Magnitude inside the dead zone reads exactly zero
        pad.poll(KeySnapshot::new());
        assert_eq!(pad.read_axis(Capability::LStickY, 0.1), 0.0);

        // Magnitude outside the dead zone reads the raw value
        pad.poll(KeySnapshot::new());
        assert_eq!(pad.read_axis(Capability::LStickY, 0.1), -0.25);

        // Digital and none capabilities read zero as axes
        assert_eq!(pad.read_axis(Capability::A, 0.1), 0.0);
        assert_eq!(pad.read_axis(Capability::None, 0.1), 0.0);
    }

    #[test]
    fn test_keyboard_fallback() {
        // No pad attached at all
        let mut pad = Pad::new(Box::new(NullDevice), InputMap::empty());

        let mut keys = KeySnapshot::new();
        keys.press("c");
        pad.poll(keys);

        assert!(pad.digital_down(&[Capability::A], Some("c")));
        assert!(pad.digital_pressed(&[Capability::A], Some("c")));
        assert!(!pad.digital_down(&[Capability::A], Some("x")));
        assert!(!pad.digital_down(&[Capability::A], None));

        let mut keys = KeySnapshot::new();
        keys.release("c");
        pad.poll(keys);

        assert!(pad.digital_released(&[Capability::A], Some("c")));
        assert!(!pad.digital_down(&[Capability::A], Some("c")));
    }

    #[test]
    fn test_read_vector_keyboard_substitution() {
        let mut frame = DeviceFrame::default();
        frame.axes[0] = 0.7;
        frame.axes[1] = 0.3;

        let fallback = VectorFallback {
            x_pos: Some("d".to_owned()),
            x_neg: Some("a".to_owned()),
            y_pos: Some("w".to_owned()),
            y_neg: Some("s".to_owned()),
        };

        // With a key held the keyboard substitutes for the pad
        let mut pad = pad_with_script(vec![frame, frame]);
        let mut keys = KeySnapshot::new();
        keys.hold("w");
        pad.poll(keys);

        assert_eq!(
            pad.read_vector(Capability::LStickX, Capability::LStickY, 0.1, &fallback),
            (0.0, 1.0)
        );

        // With no keys held the pad axes read through
        pad.poll(KeySnapshot::new());
        assert_eq!(
            pad.read_vector(Capability::LStickX, Capability::LStickY, 0.1, &fallback),
            (0.7, 0.3)
        );
    }

    #[test]
    fn test_poll_change_detection() {
        let mut pad = pad_with_script(vec![
            DeviceFrame::default(),
            frame_with_button(0),
            frame_with_button(0),
            DeviceFrame::default(),
        ]);

        assert!(!pad.poll(KeySnapshot::new()));
        assert!(pad.poll(KeySnapshot::new()));
        assert!(!pad.poll(KeySnapshot::new()));
        assert!(pad.poll(KeySnapshot::new()));

        // A pad with no device attached never reports changes
        let mut pad = Pad::new(Box::new(NullDevice), InputMap::empty());
        assert!(!pad.poll(KeySnapshot::new()));
    }
}
