//! # Operator input
//!
//! Raw joystick state as read from the driver station each cycle. These types carry no meaning,
//! turning an axis or button into a robot operation is the job of the driver layer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of analog axes on a joystick.
pub const NUM_AXES: usize = 6;

/// The trigger on the front of the driver's stick.
pub const JOYSTICK_STICK_TRIGGER_BUTTON: UserInputDeviceButton = UserInputDeviceButton::Button(1);

/// The thumb button on the side of the driver's stick.
pub const JOYSTICK_STICK_THUMB_BUTTON: UserInputDeviceButton = UserInputDeviceButton::Button(2);

pub const JOYSTICK_STICK_TOP_LEFT_BUTTON: UserInputDeviceButton = UserInputDeviceButton::Button(5);
pub const JOYSTICK_STICK_TOP_RIGHT_BUTTON: UserInputDeviceButton = UserInputDeviceButton::Button(6);
pub const JOYSTICK_STICK_BOTTOM_LEFT_BUTTON: UserInputDeviceButton =
    UserInputDeviceButton::Button(3);
pub const JOYSTICK_STICK_BOTTOM_RIGHT_BUTTON: UserInputDeviceButton =
    UserInputDeviceButton::Button(4);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The physical device an operation is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserInputDevice {
    /// Not bound, the operation keeps whatever value it was last given.
    None,
    Driver,
    CoDriver,
}

/// A button on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserInputDeviceButton {
    None,

    /// A numbered button, numbering starts at 1 as printed on the stick.
    Button(u8),

    /// The POV hat pressed at the given angle in degrees.
    Pov(u16),
}

/// An analog axis on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalogAxis {
    None,
    X,
    Y,
    Z,
    Twist,
    Throttle,
    Slider,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of one joystick for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickState {
    /// Axis values, indexed by [`AnalogAxis::index`].
    pub axes: [f64; NUM_AXES],

    /// Numbers of the buttons currently held down.
    pub buttons: Vec<u8>,

    /// POV hat angle in degrees, or `None` if the hat is centred.
    pub pov: Option<u16>,
}

/// The complete operator input for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    pub driver: JoystickState,
    pub co_driver: JoystickState,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AnalogAxis {
    /// Index of this axis in [`JoystickState::axes`], or `None` for [`AnalogAxis::None`].
    pub fn index(self) -> Option<usize> {
        match self {
            AnalogAxis::None => None,
            AnalogAxis::X => Some(0),
            AnalogAxis::Y => Some(1),
            AnalogAxis::Z => Some(2),
            AnalogAxis::Twist => Some(3),
            AnalogAxis::Throttle => Some(4),
            AnalogAxis::Slider => Some(5),
        }
    }
}

impl JoystickState {
    /// Value of an axis, unbound axes read as zero.
    pub fn axis(&self, axis: AnalogAxis) -> f64 {
        match axis.index() {
            Some(i) => self.axes[i],
            None => 0.0
        }
    }

    /// Whether the given button is currently held.
    pub fn is_pressed(&self, button: UserInputDeviceButton) -> bool {
        match button {
            UserInputDeviceButton::None => false,
            UserInputDeviceButton::Button(b) => self.buttons.contains(&b),
            UserInputDeviceButton::Pov(angle) => self.pov == Some(angle),
        }
    }

    pub fn set_axis(&mut self, axis: AnalogAxis, value: f64) {
        if let Some(i) = axis.index() {
            self.axes[i] = value;
        }
    }

    pub fn press(&mut self, button: u8) {
        if !self.buttons.contains(&button) {
            self.buttons.push(button);
        }
    }

    pub fn release(&mut self, button: u8) {
        self.buttons.retain(|b| *b != button);
    }
}

impl InputFrame {
    /// Get the state of a device, `None` if the device is [`UserInputDevice::None`].
    pub fn device(&self, device: UserInputDevice) -> Option<&JoystickState> {
        match device {
            UserInputDevice::None => None,
            UserInputDevice::Driver => Some(&self.driver),
            UserInputDevice::CoDriver => Some(&self.co_driver),
        }
    }

    pub fn device_mut(&mut self, device: UserInputDevice) -> Option<&mut JoystickState> {
        match device {
            UserInputDevice::None => None,
            UserInputDevice::Driver => Some(&mut self.driver),
            UserInputDevice::CoDriver => Some(&mut self.co_driver),
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
    fn test_buttons_and_pov() {
        let mut j = JoystickState::default();
        j.press(2);
        j.press(2);
        j.pov = Some(90);

        assert!(j.is_pressed(JOYSTICK_STICK_THUMB_BUTTON));
        assert!(!j.is_pressed(JOYSTICK_STICK_TRIGGER_BUTTON));
        assert!(j.is_pressed(UserInputDeviceButton::Pov(90)));
        assert!(!j.is_pressed(UserInputDeviceButton::Pov(180)));
        assert!(!j.is_pressed(UserInputDeviceButton::None));

        j.release(2);
        assert!(j.buttons.is_empty());
    }

    #[test]
    fn test_frame_from_partial_json() {
        let frame: InputFrame = serde_json::from_str(
            r#"{"driver": {"axes": [0.0, -0.5, 0.0, 0.0, 0.0, 0.0], "buttons": [1]}}"#
        ).unwrap();

        assert_eq!(frame.driver.axis(AnalogAxis::Y), -0.5);
        assert!(frame.driver.is_pressed(JOYSTICK_STICK_TRIGGER_BUTTON));
        assert_eq!(frame.co_driver, JoystickState::default());
        assert!(frame.device(UserInputDevice::None).is_none());
    }
}
