//! # Operation schema
//!
//! Declarative tables binding operations, macros and shifts to physical inputs. A [`ButtonMap`] is
//! built once at startup, validated, and never changed afterwards.
//!
//! Every operation must be described in the default layer (no shift). A shifted layer only needs to
//! describe the operations it changes: while its shift is held those descriptions replace the
//! default ones, and any physical input the layer binds is hidden from the default layer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use eqpt_if::input::{AnalogAxis, InputFrame, UserInputDevice, UserInputDeviceButton};

use super::{AnalogOperation, ButtonType, DigitalOperation, MacroOperation, Operation, Shift};
use crate::ctrl_task::ControlTask;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Creates a fresh task for each activation of a macro.
pub type TaskFactory = Rc<dyn Fn() -> Box<dyn ControlTask>>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How an analog operation's value is bounded when read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogRange {
    /// Clamped to `[-1, 1]`
    Normalised,

    /// Physical units, not clamped
    Unbounded,
}

/// A physical input on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputId {
    Axis(AnalogAxis),
    Button(UserInputDeviceButton),
}

/// Errors in the operation schema, these are always fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0:?} has no description in the default layer")]
    MissingAnalogDescription(AnalogOperation),

    #[error("{0:?} has no description in the default layer")]
    MissingDigitalDescription(DigitalOperation),

    #[error("{0} is described more than once in the {1:?} layer")]
    DuplicateDescription(String, Option<Shift>),

    #[error("{device:?} {button:?} in the {shift:?} layer is bound to both {first} and {second}")]
    DuplicateBinding {
        device: UserInputDevice,
        button: UserInputDeviceButton,
        shift: Option<Shift>,
        first: String,
        second: String,
    },

    #[error("The dead zone of {0:?} is {1}, it must be in [0, 1)")]
    InvalidDeadZone(AnalogOperation, f64),

    #[error("Macro {0:?} does not own any operations")]
    EmptyMacroOwnership(MacroOperation),

    #[error("{0} requires shift {1:?} which has no button")]
    UnknownShift(String, Shift),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Binding of an analog operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogOperationDescription {
    pub device: UserInputDevice,
    pub axis: AnalogAxis,
    pub invert: bool,
    pub dead_zone: f64,
    pub range: AnalogRange,
    pub shift: Option<Shift>,
}

/// Binding of a digital operation.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitalOperationDescription {
    pub device: UserInputDevice,
    pub button: UserInputDeviceButton,
    pub button_type: ButtonType,
    pub shift: Option<Shift>,
}

/// Binding of a macro to its trigger, task factory and owned operations.
#[derive(Clone)]
pub struct MacroOperationDescription {
    pub device: UserInputDevice,
    pub button: UserInputDeviceButton,
    pub button_type: ButtonType,
    pub shift: Option<Shift>,
    pub factory: TaskFactory,

    /// Operations the task exclusively controls while active
    pub owned: Vec<Operation>,
}

/// The button which activates a shift.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftDescription {
    pub device: UserInputDevice,
    pub button: UserInputDeviceButton,
}

/// The complete set of bindings.
#[derive(Clone, Default)]
pub struct ButtonMap {
    analog: Vec<(AnalogOperation, AnalogOperationDescription)>,
    digital: Vec<(DigitalOperation, DigitalOperationDescription)>,
    macros: Vec<(MacroOperation, MacroOperationDescription)>,
    shifts: Vec<(Shift, ShiftDescription)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AnalogOperationDescription {
    pub fn new(device: UserInputDevice, axis: AnalogAxis, invert: bool, dead_zone: f64) -> Self {
        Self {
            device,
            axis,
            invert,
            dead_zone,
            range: AnalogRange::Normalised,
            shift: None,
        }
    }

    /// An operation only ever set by tasks.
    pub fn programmatic(range: AnalogRange) -> Self {
        Self {
            device: UserInputDevice::None,
            axis: AnalogAxis::None,
            invert: false,
            dead_zone: 0.0,
            range,
            shift: None,
        }
    }

    pub fn shifted(mut self, shift: Shift) -> Self {
        self.shift = Some(shift);
        self
    }

    pub(crate) fn input(&self) -> Option<(UserInputDevice, InputId)> {
        bound_input(self.device, InputId::Axis(self.axis))
    }
}

impl DigitalOperationDescription {
    pub fn new(
        device: UserInputDevice,
        button: UserInputDeviceButton,
        button_type: ButtonType
    ) -> Self {
        Self {
            device,
            button,
            button_type,
            shift: None,
        }
    }

    /// An operation only ever set by tasks.
    pub fn programmatic() -> Self {
        Self::new(UserInputDevice::None, UserInputDeviceButton::None, ButtonType::Simple)
    }

    pub fn shifted(mut self, shift: Shift) -> Self {
        self.shift = Some(shift);
        self
    }

    pub(crate) fn input(&self) -> Option<(UserInputDevice, InputId)> {
        bound_input(self.device, InputId::Button(self.button))
    }
}

impl MacroOperationDescription {
    pub fn new<F>(
        device: UserInputDevice,
        button: UserInputDeviceButton,
        button_type: ButtonType,
        owned: Vec<Operation>,
        factory: F
    ) -> Self
    where
        F: Fn() -> Box<dyn ControlTask> + 'static
    {
        Self {
            device,
            button,
            button_type,
            shift: None,
            factory: Rc::new(factory),
            owned,
        }
    }

    pub fn shifted(mut self, shift: Shift) -> Self {
        self.shift = Some(shift);
        self
    }

    pub(crate) fn input(&self) -> Option<(UserInputDevice, InputId)> {
        bound_input(self.device, InputId::Button(self.button))
    }
}

impl fmt::Debug for MacroOperationDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroOperationDescription")
            .field("device", &self.device)
            .field("button", &self.button)
            .field("button_type", &self.button_type)
            .field("shift", &self.shift)
            .field("owned", &self.owned)
            .finish()
    }
}

impl ShiftDescription {
    pub fn new(device: UserInputDevice, button: UserInputDeviceButton) -> Self {
        Self { device, button }
    }
}

impl ButtonMap {
    /// An empty map, populate with the `with_*` builders.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analog(mut self, op: AnalogOperation, desc: AnalogOperationDescription) -> Self {
        self.analog.push((op, desc));
        self
    }

    pub fn with_digital(mut self, op: DigitalOperation, desc: DigitalOperationDescription) -> Self {
        self.digital.push((op, desc));
        self
    }

    pub fn with_macro(mut self, op: MacroOperation, desc: MacroOperationDescription) -> Self {
        self.macros.push((op, desc));
        self
    }

    pub fn with_shift(mut self, shift: Shift, desc: ShiftDescription) -> Self {
        self.shifts.push((shift, desc));
        self
    }

    pub fn analog(&self) -> &[(AnalogOperation, AnalogOperationDescription)] {
        &self.analog
    }

    pub fn digital(&self) -> &[(DigitalOperation, DigitalOperationDescription)] {
        &self.digital
    }

    pub fn macros(&self) -> &[(MacroOperation, MacroOperationDescription)] {
        &self.macros
    }

    pub fn shifts(&self) -> &[(Shift, ShiftDescription)] {
        &self.shifts
    }

    /// The held shift, if several are held the first declared wins.
    pub fn active_shift(&self, frame: &InputFrame) -> Option<Shift> {
        self.shifts
            .iter()
            .find(|(_, d)| frame
                .device(d.device)
                .map(|j| j.is_pressed(d.button))
                .unwrap_or(false))
            .map(|(s, _)| *s)
    }

    /// The default layer description of an analog operation.
    pub fn default_analog(&self, op: AnalogOperation) -> Option<&AnalogOperationDescription> {
        self.analog.iter().find(|(o, d)| *o == op && d.shift.is_none()).map(|(_, d)| d)
    }

    /// Every physical input bound in the given shift's layer.
    pub fn layer_inputs(&self, shift: Shift) -> HashSet<(UserInputDevice, InputId)> {
        let analog = self.analog.iter()
            .filter(|(_, d)| d.shift == Some(shift))
            .filter_map(|(_, d)| d.input());
        let digital = self.digital.iter()
            .filter(|(_, d)| d.shift == Some(shift))
            .filter_map(|(_, d)| d.input());
        let macros = self.macros.iter()
            .filter(|(_, d)| d.shift == Some(shift))
            .filter_map(|(_, d)| d.input());

        analog.chain(digital).chain(macros).collect()
    }

    /// Check the map is complete and consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Completeness of the default layer
        for op in AnalogOperation::ALL.iter() {
            if self.default_analog(*op).is_none() {
                return Err(ConfigError::MissingAnalogDescription(*op))
            }
        }
        for op in DigitalOperation::ALL.iter() {
            if !self.digital.iter().any(|(o, d)| o == op && d.shift.is_none()) {
                return Err(ConfigError::MissingDigitalDescription(*op))
            }
        }

        // One description per operation per layer
        let mut described: HashSet<(String, Option<Shift>)> = HashSet::new();
        let names = self.analog.iter().map(|(o, d)| (format!("{:?}", o), d.shift))
            .chain(self.digital.iter().map(|(o, d)| (format!("{:?}", o), d.shift)))
            .chain(self.macros.iter().map(|(o, d)| (format!("{:?}", o), d.shift)));
        for key in names {
            if !described.insert(key.clone()) {
                return Err(ConfigError::DuplicateDescription(key.0, key.1))
            }
        }

        // Shift layers must have a shift button
        let shift_required = self.analog.iter().map(|(o, d)| (format!("{:?}", o), d.shift))
            .chain(self.digital.iter().map(|(o, d)| (format!("{:?}", o), d.shift)))
            .chain(self.macros.iter().map(|(o, d)| (format!("{:?}", o), d.shift)));
        for (name, shift) in shift_required {
            if let Some(s) = shift {
                if !self.shifts.iter().any(|(x, _)| *x == s) {
                    return Err(ConfigError::UnknownShift(name, s))
                }
            }
        }

        for (op, d) in self.analog.iter() {
            if !(d.dead_zone >= 0.0 && d.dead_zone < 1.0) {
                return Err(ConfigError::InvalidDeadZone(*op, d.dead_zone))
            }
        }

        for (op, d) in self.macros.iter() {
            if d.owned.is_empty() {
                return Err(ConfigError::EmptyMacroOwnership(*op))
            }
        }

        // Each physical button is bound at most once per layer
        let buttons = self.digital.iter()
            .map(|(o, d)| (d.device, d.button, d.shift, format!("{:?}", o)))
            .chain(self.macros.iter()
                .map(|(o, d)| (d.device, d.button, d.shift, format!("{:?}", o))))
            .chain(self.shifts.iter()
                .map(|(s, d)| (d.device, d.button, None, format!("Shift::{:?}", s))));

        let mut bound: HashMap<(UserInputDevice, UserInputDeviceButton, Option<Shift>), String> =
            HashMap::new();
        for (device, button, shift, name) in buttons {
            if device == UserInputDevice::None || button == UserInputDeviceButton::None {
                continue
            }

            if let Some(first) = bound.get(&(device, button, shift)) {
                return Err(ConfigError::DuplicateBinding {
                    device,
                    button,
                    shift,
                    first: first.clone(),
                    second: name
                })
            }

            bound.insert((device, button, shift), name);
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn bound_input(device: UserInputDevice, input: InputId) -> Option<(UserInputDevice, InputId)> {
    match (device, input) {
        (UserInputDevice::None, _) => None,
        (_, InputId::Axis(AnalogAxis::None)) => None,
        (_, InputId::Button(UserInputDeviceButton::None)) => None,
        (d, i) => Some((d, i)),
    }
}

/// Whether a description in the given layer is in force.
///
/// `replaced` is true if the active shift's layer describes the same operation, and
/// `input_claimed` is true if the active shift's layer binds the same physical input.
pub(crate) fn layer_applies(
    desc_shift: Option<Shift>,
    active_shift: Option<Shift>,
    replaced: bool,
    input_claimed: bool
) -> bool {
    match (desc_shift, active_shift) {
        (Some(s), Some(a)) => s == a,
        (Some(_), None) => false,
        (None, None) => true,
        (None, Some(_)) => !replaced && !input_claimed,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl_task::timed::TimedTask;
    use crate::testing::minimal_map;

    fn wait_macro(button: u8) -> MacroOperationDescription {
        MacroOperationDescription::new(
            UserInputDevice::Driver,
            UserInputDeviceButton::Button(button),
            ButtonType::Click,
            vec![Operation::Digital(DigitalOperation::EnableVision)],
            || Box::new(TimedTask::wait(1.0))
        )
    }

    #[test]
    fn test_minimal_map_is_valid() {
        assert_eq!(minimal_map().validate(), Ok(()));
    }

    #[test]
    fn test_missing_description() {
        let map = ButtonMap::new()
            .with_analog(
                AnalogOperation::DriveTrainTurn,
                AnalogOperationDescription::programmatic(AnalogRange::Normalised)
            );

        assert_eq!(
            map.validate(),
            Err(ConfigError::MissingAnalogDescription(AnalogOperation::DriveTrainMoveForward))
        );
    }

    #[test]
    fn test_duplicate_button_binding() {
        let map = minimal_map()
            .with_macro(MacroOperation::PidBrake, wait_macro(3))
            .with_macro(MacroOperation::VisionCenter, wait_macro(3));

        assert!(matches!(map.validate(), Err(ConfigError::DuplicateBinding { .. })));
    }

    #[test]
    fn test_same_button_in_different_layers() {
        let map = minimal_map()
            .with_shift(Shift::Debug, ShiftDescription::new(
                UserInputDevice::CoDriver,
                UserInputDeviceButton::Button(1)
            ))
            .with_macro(MacroOperation::PidBrake, wait_macro(3))
            .with_macro(MacroOperation::VisionCenter, wait_macro(3).shifted(Shift::Debug));

        assert_eq!(map.validate(), Ok(()));
    }

    #[test]
    fn test_shift_button_conflicts_with_operation() {
        let map = minimal_map()
            .with_shift(Shift::Debug, ShiftDescription::new(
                UserInputDevice::Driver,
                UserInputDeviceButton::Button(3)
            ))
            .with_macro(MacroOperation::PidBrake, wait_macro(3));

        assert!(matches!(map.validate(), Err(ConfigError::DuplicateBinding { .. })));
    }

    #[test]
    fn test_unknown_shift_and_bad_dead_zone() {
        let map = minimal_map()
            .with_macro(MacroOperation::PidBrake, wait_macro(3).shifted(Shift::Debug));
        assert!(matches!(map.validate(), Err(ConfigError::UnknownShift(_, Shift::Debug))));

        let mut map = ButtonMap::new().with_analog(
            AnalogOperation::DriveTrainMoveForward,
            AnalogOperationDescription::new(UserInputDevice::Driver, AnalogAxis::Y, true, 1.0)
        );
        for (op, d) in minimal_map().analog().iter().skip(1) {
            map = map.with_analog(*op, d.clone());
        }
        for (op, d) in minimal_map().digital().iter() {
            map = map.with_digital(*op, d.clone());
        }
        assert_eq!(
            map.validate(),
            Err(ConfigError::InvalidDeadZone(AnalogOperation::DriveTrainMoveForward, 1.0))
        );
    }

    #[test]
    fn test_macro_must_own_something() {
        let mut m = wait_macro(4);
        m.owned.clear();
        let map = minimal_map().with_macro(MacroOperation::PidBrake, m);

        assert_eq!(map.validate(), Err(ConfigError::EmptyMacroOwnership(MacroOperation::PidBrake)));
    }

    #[test]
    fn test_layer_applies() {
        let d = Some(Shift::Debug);
        assert!(layer_applies(None, None, false, false));
        assert!(!layer_applies(d, None, false, false));
        assert!(layer_applies(d, d, false, false));
        assert!(layer_applies(None, d, false, false));
        assert!(!layer_applies(None, d, true, false));
        assert!(!layer_applies(None, d, false, true));
    }
}
