//! # Driver module
//!
//! The driver arbitrates between the operator and the control tasks. Each cycle it reads the raw
//! input frame, starts or cancels macros, recomputes every operation nobody else owns from its
//! bound input, and then steps the active tasks, whose writes fully replace raw input for the
//! operations they own.
//!
//! Per cycle order:
//!
//! 1. Resolve the active shift.
//! 2. Evaluate macro triggers, starting and canceling tasks.
//! 3. Recompute operations not owned by an active task.
//! 4. Step the active tasks.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod button_map;
mod buttons;
mod operation;
mod schema;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use log::{debug, info, warn};

// Internal
pub use button_map::robot_button_map;
pub use buttons::*;
pub use operation::*;
pub use schema::*;

use crate::ctrl_task::{ControlTask, TaskRunner};
use eqpt_if::{
    eqpt::{drive::DriveTrainEqpt, timer::Timer, vision::VisionHandle},
    input::{InputFrame, UserInputDevice}
};
use util::maths::{adjust_for_dead_zone, enforce_range};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// External collaborators tasks may acquire when they begin.
#[derive(Clone)]
pub struct Collaborators {
    pub timer: Rc<dyn Timer>,
    pub drive_train: Rc<dyn DriveTrainEqpt>,
    pub vision: VisionHandle,
}

/// Current value of every operation.
#[derive(Debug, Clone, Default)]
pub struct OperationValues {
    analog: HashMap<AnalogOperation, f64>,
    digital: HashMap<DigitalOperation, bool>,
}

/// The interface through which a task reads and writes operations.
///
/// Writes are only accepted for the operations the task's owner declared.
pub struct TaskContext<'a> {
    values: &'a mut OperationValues,
    owned: &'a HashSet<Operation>,
    collab: &'a Collaborators,
}

/// Arbitrates operation values between raw input and control tasks.
pub struct Driver {
    button_map: ButtonMap,
    collab: Collaborators,

    values: OperationValues,

    /// Range of each analog operation, from its default description
    ranges: HashMap<AnalogOperation, AnalogRange>,

    /// Inputs bound by each shift's layer
    layer_inputs: HashMap<Shift, HashSet<(UserInputDevice, InputId)>>,

    /// Edge tracking for each digital description, same order as the map
    digital_states: Vec<ButtonState>,

    /// Trigger tracking for each macro description, same order as the map
    macro_trackers: Vec<MacroTracker>,

    active: Vec<ActiveTask>,
    active_shift: Option<Shift>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOwner {
    /// Index of the macro description in the map
    Macro(usize),
    Autonomous,
}

struct ActiveTask {
    owner: TaskOwner,
    runner: TaskRunner,
    owned: HashSet<Operation>,
}

#[derive(Debug, Clone, Copy, Default)]
struct MacroTracker {
    button: ButtonState,

    /// Prevents a held `Simple` macro from restarting after its task ended
    latched: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OperationValues {
    pub fn analog(&self, op: AnalogOperation) -> f64 {
        self.analog.get(&op).copied().unwrap_or(0.0)
    }

    pub fn digital(&self, op: DigitalOperation) -> bool {
        self.digital.get(&op).copied().unwrap_or(false)
    }

    pub fn set_analog(&mut self, op: AnalogOperation, value: f64) {
        self.analog.insert(op, value);
    }

    pub fn set_digital(&mut self, op: DigitalOperation, value: bool) {
        self.digital.insert(op, value);
    }
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        values: &'a mut OperationValues,
        owned: &'a HashSet<Operation>,
        collab: &'a Collaborators
    ) -> Self {
        Self { values, owned, collab }
    }

    pub fn set_analog(&mut self, op: AnalogOperation, value: f64) {
        if self.owned.contains(&Operation::Analog(op)) {
            self.values.set_analog(op, value);
        }
        else {
            warn!("Rejected write of {} to {:?}, the task does not own it", value, op);
        }
    }

    pub fn set_digital(&mut self, op: DigitalOperation, value: bool) {
        if self.owned.contains(&Operation::Digital(op)) {
            self.values.set_digital(op, value);
        }
        else {
            warn!("Rejected write of {} to {:?}, the task does not own it", value, op);
        }
    }

    pub fn get_analog(&self, op: AnalogOperation) -> f64 {
        self.values.analog(op)
    }

    pub fn get_digital(&self, op: DigitalOperation) -> bool {
        self.values.digital(op)
    }

    pub fn timer(&self) -> Rc<dyn Timer> {
        self.collab.timer.clone()
    }

    pub fn drive_train(&self) -> Rc<dyn DriveTrainEqpt> {
        self.collab.drive_train.clone()
    }

    pub fn vision(&self) -> VisionHandle {
        self.collab.vision.clone()
    }
}

impl Driver {
    /// Create a new driver, validating the button map.
    pub fn new(button_map: ButtonMap, collab: Collaborators) -> Result<Self, ConfigError> {
        button_map.validate()?;

        let ranges = AnalogOperation::ALL
            .iter()
            .filter_map(|op| button_map.default_analog(*op).map(|d| (*op, d.range)))
            .collect();

        let layer_inputs = button_map.shifts()
            .iter()
            .map(|(s, _)| (*s, button_map.layer_inputs(*s)))
            .collect();

        let digital_states = vec![ButtonState::default(); button_map.digital().len()];
        let macro_trackers = vec![MacroTracker::default(); button_map.macros().len()];

        Ok(Self {
            button_map,
            collab,
            values: OperationValues::default(),
            ranges,
            layer_inputs,
            digital_states,
            macro_trackers,
            active: Vec::new(),
            active_shift: None,
        })
    }

    /// Get the value of an analog operation.
    ///
    /// Normalised operations are always within `[-1, 1]`.
    pub fn get_analog(&self, op: AnalogOperation) -> f64 {
        let value = self.values.analog(op);

        match self.ranges.get(&op) {
            Some(AnalogRange::Unbounded) => value,
            _ => enforce_range(value, -1.0, 1.0)
        }
    }

    /// Get the value of a digital operation.
    pub fn get_digital(&self, op: DigitalOperation) -> bool {
        self.values.digital(op)
    }

    /// The currently held shift.
    pub fn active_shift(&self) -> Option<Shift> {
        self.active_shift
    }

    /// Whether a task started by the given macro is running.
    pub fn is_macro_active(&self, op: MacroOperation) -> bool {
        self.active.iter().any(|t| match t.owner {
            TaskOwner::Macro(i) => self.button_map.macros()
                .get(i)
                .map(|(m, _)| *m == op)
                .unwrap_or(false),
            TaskOwner::Autonomous => false,
        })
    }

    /// Whether an autonomous routine is running.
    pub fn is_autonomous_active(&self) -> bool {
        self.active.iter().any(|t| t.owner == TaskOwner::Autonomous)
    }

    /// Whether an active task owns the given operation.
    pub fn is_owned(&self, op: Operation) -> bool {
        self.active.iter().any(|t| t.owned.contains(&op))
    }

    /// Run one cycle of arbitration on the given input.
    pub fn update(&mut self, frame: &InputFrame) {
        let shift = self.button_map.active_shift(frame);
        if shift != self.active_shift {
            debug!("Active shift changed from {:?} to {:?}", self.active_shift, shift);
            self.active_shift = shift;
        }

        let claimed = shift
            .and_then(|s| self.layer_inputs.get(&s))
            .cloned()
            .unwrap_or_default();

        self.process_macros(frame, shift, &claimed);
        self.process_raw(frame, shift, &claimed);
        self.step_tasks();
    }

    /// Start an autonomous routine which owns every operation.
    ///
    /// Any active tasks are canceled first.
    pub fn start_autonomous(&mut self, task: Box<dyn ControlTask>) {
        self.cancel_where(|_| true);

        info!("Starting autonomous routine");

        self.active.push(ActiveTask {
            owner: TaskOwner::Autonomous,
            runner: TaskRunner::new(task),
            owned: Operation::all().collect(),
        });
    }

    /// Cancel every active task and return all operations to their defaults.
    pub fn stop(&mut self) {
        self.cancel_where(|_| true);

        self.values = OperationValues::default();
        self.digital_states.iter_mut().for_each(|s| *s = ButtonState::default());
        self.macro_trackers.iter_mut().for_each(|t| *t = MacroTracker::default());
        self.active_shift = None;

        debug!("Driver stopped");
    }

    fn process_macros(
        &mut self,
        frame: &InputFrame,
        shift: Option<Shift>,
        claimed: &HashSet<(UserInputDevice, InputId)>
    ) {
        for i in 0..self.button_map.macros().len() {
            let (op, device, button, button_type, desc_shift, input) = {
                let (op, d) = &self.button_map.macros()[i];
                (*op, d.device, d.button, d.button_type, d.shift, d.input())
            };

            let replaced = shift.is_some() && self.button_map.macros()
                .iter()
                .any(|(o, d)| *o == op && d.shift == shift);

            let pressed = layer_applies(
                    desc_shift, shift, replaced, is_claimed(claimed, input)
                )
                && frame.device(device).map(|j| j.is_pressed(button)).unwrap_or(false);

            let active = self.active.iter().any(|t| t.owner == TaskOwner::Macro(i));
            let tracker = &mut self.macro_trackers[i];

            let (start, cancel) = match button_type {
                ButtonType::Simple => {
                    let held = tracker.button.update(ButtonType::Simple, pressed);
                    if !held {
                        tracker.latched = false;
                    }
                    (held && !active && !tracker.latched, !held && active)
                },
                ButtonType::Click => {
                    let rising = tracker.button.update(ButtonType::Click, pressed);
                    (rising && !active, false)
                },
                ButtonType::Toggle => {
                    let was = tracker.button.is_toggled();
                    let now = tracker.button.update(ButtonType::Toggle, pressed);
                    (now && !was && !active, !now && was && active)
                },
            };

            if cancel {
                info!("Canceling macro {:?}", op);
                self.cancel_where(|t| t.owner == TaskOwner::Macro(i));
            }

            if start {
                self.start_macro(i);
            }
        }
    }

    fn start_macro(&mut self, index: usize) {
        let (op, owned, factory) = match self.button_map.macros().get(index) {
            Some((op, d)) => (
                *op,
                d.owned.iter().copied().collect::<HashSet<Operation>>(),
                d.factory.clone()
            ),
            None => return
        };

        // One owner per operation, so any macro sharing an operation goes
        self.cancel_where(|t| !t.owned.is_disjoint(&owned));

        info!("Starting macro {:?}", op);

        self.active.push(ActiveTask {
            owner: TaskOwner::Macro(index),
            runner: TaskRunner::new(factory()),
            owned,
        });
    }

    fn process_raw(
        &mut self,
        frame: &InputFrame,
        shift: Option<Shift>,
        claimed: &HashSet<(UserInputDevice, InputId)>
    ) {
        for op in AnalogOperation::ALL.iter().copied() {
            if self.is_owned(Operation::Analog(op)) {
                continue
            }

            let desc = match select_description(self.button_map.analog(), op, shift) {
                Some(d) => d,
                None => continue
            };

            // Programmatic-only, keep the last written value
            if desc.device == UserInputDevice::None {
                continue
            }

            let hidden = desc.shift.is_none() && is_claimed(claimed, desc.input());
            let raw = match frame.device(desc.device) {
                Some(j) if !hidden => j.axis(desc.axis),
                _ => 0.0
            };

            let value = if desc.invert { -raw } else { raw };
            let value = adjust_for_dead_zone(value, desc.dead_zone);
            let value = match desc.range {
                AnalogRange::Normalised => enforce_range(value, -1.0, 1.0),
                AnalogRange::Unbounded => value
            };

            self.values.set_analog(op, value);
        }

        // Every digital description's state is updated every cycle, even if
        // its operation is owned, so no edges are missed.
        let mut from_input: HashSet<DigitalOperation> = HashSet::new();
        for i in 0..self.button_map.digital().len() {
            let (op, desc) = {
                let (o, d) = &self.button_map.digital()[i];
                (*o, d.clone())
            };

            let replaced = shift.is_some() && self.button_map.digital()
                .iter()
                .any(|(o, d)| *o == op && d.shift == shift);
            let selected = match desc.shift {
                Some(s) => shift == Some(s),
                None => !replaced
            };
            let hidden = desc.shift.is_none() && is_claimed(claimed, desc.input());

            let pressed = selected
                && !hidden
                && frame.device(desc.device).map(|j| j.is_pressed(desc.button)).unwrap_or(false);
            let value = self.digital_states[i].update(desc.button_type, pressed);

            if selected
                && desc.device != UserInputDevice::None
                && !self.is_owned(Operation::Digital(op))
            {
                self.values.set_digital(op, value);
                from_input.insert(op);
            }
        }

        // An operation bound to a physical input only in a layer which isn't
        // active reads as released, rather than keeping that layer's value.
        for (op, desc) in self.button_map.digital().iter() {
            if desc.device != UserInputDevice::None
                && !from_input.contains(op)
                && !self.is_owned(Operation::Digital(*op))
            {
                self.values.set_digital(*op, false);
            }
        }
    }

    fn step_tasks(&mut self) {
        let mut finished = Vec::new();

        for (i, task) in self.active.iter_mut().enumerate() {
            let mut ctx = TaskContext::new(&mut self.values, &task.owned, &self.collab);

            if task.runner.step(&mut ctx).is_terminal() {
                finished.push(i);
            }
        }

        for i in finished.into_iter().rev() {
            let task = self.active.remove(i);
            info!("{:?} task finished: {:?}", task.owner, task.runner.state());
            self.on_task_removed(task.owner);
        }
    }

    /// Cancel and remove every active task matching the predicate.
    fn cancel_where<F>(&mut self, pred: F)
    where
        F: Fn(&ActiveTask) -> bool
    {
        let mut i = 0;
        while i < self.active.len() {
            if !pred(&self.active[i]) {
                i += 1;
                continue
            }

            let mut task = self.active.remove(i);
            {
                let mut ctx = TaskContext::new(&mut self.values, &task.owned, &self.collab);
                task.runner.cancel(&mut ctx);
            }

            debug!("{:?} task canceled", task.owner);
            self.on_task_removed(task.owner);
        }
    }

    fn on_task_removed(&mut self, owner: TaskOwner) {
        let index = match owner {
            TaskOwner::Macro(i) => i,
            TaskOwner::Autonomous => return
        };

        let button_type = match self.button_map.macros().get(index) {
            Some((_, d)) => d.button_type,
            None => return
        };

        if let Some(tracker) = self.macro_trackers.get_mut(index) {
            match button_type {
                ButtonType::Toggle => tracker.button.clear_toggle(),
                ButtonType::Simple => tracker.latched = tracker.button.is_held(),
                ButtonType::Click => ()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn is_claimed(
    claimed: &HashSet<(UserInputDevice, InputId)>,
    input: Option<(UserInputDevice, InputId)>
) -> bool {
    input.map(|i| claimed.contains(&i)).unwrap_or(false)
}

/// The analog description in force for the given shift.
fn select_description(
    descs: &[(AnalogOperation, AnalogOperationDescription)],
    op: AnalogOperation,
    shift: Option<Shift>
) -> Option<&AnalogOperationDescription> {
    let shifted = shift.and_then(|s| descs
        .iter()
        .find(|(o, d)| *o == op && d.shift == Some(s))
    );

    shifted
        .or_else(|| descs.iter().find(|(o, d)| *o == op && d.shift.is_none()))
        .map(|(_, d)| d)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
