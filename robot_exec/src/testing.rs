//! Test doubles and helpers shared by the unit tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use eqpt_if::{
    eqpt::{timer::ManualTimer, vision::VisionHandle},
    input::InputFrame
};
use util::telem::TelemSink;

use crate::ctrl_task::{ControlTask, TaskContext, TaskRunner, TaskState};
use crate::driver::{
    AnalogOperation, AnalogOperationDescription, AnalogRange, ButtonMap, Collaborators,
    DigitalOperation, DigitalOperationDescription, Driver, Operation, OperationValues
};
use crate::sim::{SimDriveParams, SimDriveTrain};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Collaborators for running tasks outside of a driver.
///
/// Tasks stepped through the rig own every operation.
pub struct TestRig {
    pub timer: Rc<ManualTimer>,
    pub drive: Rc<SimDriveTrain>,
    pub vision: VisionHandle,

    values: RefCell<OperationValues>,
    owned: HashSet<Operation>,
}

/// Shared log of task lifecycle calls, tagged with a test-controlled cycle
/// number.
#[derive(Clone, Default)]
pub struct Recorder {
    cycle: Rc<Cell<u32>>,
    events: Rc<RefCell<Vec<(u32, String, String)>>>,
}

/// A task whose behaviour is set up by the test.
pub struct ScriptedTask {
    name: String,
    rec: Recorder,

    /// Completes on this call of `has_completed`
    complete_on: Option<u32>,

    /// Cancels on this call of `should_cancel`
    cancel_on: Option<u32>,

    analog_writes: Vec<(AnalogOperation, f64)>,
    digital_writes: Vec<(DigitalOperation, bool)>,

    inner: Option<Box<dyn ControlTask>>,

    completed_checks: u32,
    cancel_checks: u32,
}

/// Telemetry sink which keeps every record for inspection.
#[derive(Default)]
pub struct RecordingTelem {
    numbers: RefCell<Vec<(String, f64)>>,
    strings: RefCell<Vec<(String, String)>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RecordingTelem {
    /// The last number logged under the key, in any category.
    pub fn last(&self, key: &str) -> Option<f64> {
        self.numbers
            .borrow()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// The last string logged under the key, in any category.
    pub fn last_string(&self, key: &str) -> Option<String> {
        self.strings
            .borrow()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl TelemSink for RecordingTelem {
    fn log_number(&self, _category: &str, key: &str, value: f64) {
        self.numbers.borrow_mut().push((key.to_string(), value));
    }

    fn log_string(&self, _category: &str, key: &str, value: &str) {
        self.strings.borrow_mut().push((key.to_string(), value.to_string()));
    }
}

impl TestRig {
    pub fn new() -> Self {
        Self {
            timer: Rc::new(ManualTimer::new(0.0)),
            drive: Rc::new(SimDriveTrain::new(SimDriveParams::default())),
            vision: VisionHandle::new(),
            values: RefCell::new(OperationValues::default()),
            owned: Operation::all().collect(),
        }
    }

    pub fn collab(&self) -> Collaborators {
        Collaborators {
            timer: self.timer.clone(),
            drive_train: self.drive.clone(),
            vision: self.vision.clone(),
        }
    }

    /// A fresh set of operation values for use with `step_with`.
    pub fn values(&self) -> OperationValues {
        OperationValues::default()
    }

    /// Step the runner against the rig's own values.
    pub fn step(&self, runner: &mut TaskRunner) -> TaskState {
        let mut values = self.values.borrow_mut();
        self.step_with(runner, &mut values)
    }

    /// Step the runner against the given values.
    pub fn step_with(&self, runner: &mut TaskRunner, values: &mut OperationValues) -> TaskState {
        let collab = self.collab();
        let mut ctx = TaskContext::new(values, &self.owned, &collab);
        runner.step(&mut ctx)
    }

    pub fn cancel(&self, runner: &mut TaskRunner) {
        let mut values = self.values.borrow_mut();
        self.cancel_with(runner, &mut values)
    }

    pub fn cancel_with(&self, runner: &mut TaskRunner, values: &mut OperationValues) {
        let collab = self.collab();
        let mut ctx = TaskContext::new(values, &self.owned, &collab);
        runner.cancel(&mut ctx)
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cycle(&self, cycle: u32) {
        self.cycle.set(cycle);
    }

    fn record(&self, name: &str, event: &str) {
        self.events
            .borrow_mut()
            .push((self.cycle.get(), name.to_string(), event.to_string()));
    }

    /// Every event recorded for the named task, in order.
    pub fn names_for(&self, name: &str) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(_, n, _)| n == name)
            .map(|(_, _, e)| e.clone())
            .collect()
    }

    /// Cycles on which the named task recorded the event.
    pub fn cycles_of(&self, name: &str, event: &str) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter(|(_, n, e)| n == name && e == event)
            .map(|(c, _, _)| *c)
            .collect()
    }

    pub fn count(&self, name: &str, event: &str) -> usize {
        self.cycles_of(name, event).len()
    }
}

impl ScriptedTask {
    /// A task which never completes or cancels by itself.
    pub fn new(name: &str, rec: &Recorder) -> Self {
        Self {
            name: name.to_string(),
            rec: rec.clone(),
            complete_on: None,
            cancel_on: None,
            analog_writes: Vec::new(),
            digital_writes: Vec::new(),
            inner: None,
            completed_checks: 0,
            cancel_checks: 0,
        }
    }

    /// Record the lifecycle of another task while forwarding every call to it.
    pub fn wrapping(name: &str, rec: &Recorder, inner: Box<dyn ControlTask>) -> Self {
        let mut t = Self::new(name, rec);
        t.inner = Some(inner);
        t
    }

    pub fn completes_after(mut self, checks: u32) -> Self {
        self.complete_on = Some(checks);
        self
    }

    pub fn cancels_after(mut self, checks: u32) -> Self {
        self.cancel_on = Some(checks);
        self
    }

    pub fn writes_analog(mut self, op: AnalogOperation, value: f64) -> Self {
        self.analog_writes.push((op, value));
        self
    }

    pub fn writes_digital(mut self, op: DigitalOperation, value: bool) -> Self {
        self.digital_writes.push((op, value));
        self
    }
}

impl ControlTask for ScriptedTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        self.rec.record(&self.name, "begin");
        if let Some(ref mut t) = self.inner {
            t.begin(ctx);
        }
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        self.rec.record(&self.name, "update");
        for (op, v) in self.analog_writes.iter() {
            ctx.set_analog(*op, *v);
        }
        for (op, v) in self.digital_writes.iter() {
            ctx.set_digital(*op, *v);
        }
        if let Some(ref mut t) = self.inner {
            t.update(ctx);
        }
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        self.rec.record(&self.name, "end");
        if let Some(ref mut t) = self.inner {
            t.end(ctx);
        }
    }

    fn should_cancel(&mut self, ctx: &mut TaskContext) -> bool {
        self.rec.record(&self.name, "should_cancel");
        self.cancel_checks += 1;

        let inner = match self.inner {
            Some(ref mut t) => t.should_cancel(ctx),
            None => false
        };

        inner || self.cancel_on == Some(self.cancel_checks)
    }

    fn has_completed(&mut self, ctx: &mut TaskContext) -> bool {
        self.rec.record(&self.name, "has_completed");
        self.completed_checks += 1;

        let inner = match self.inner {
            Some(ref mut t) => t.has_completed(ctx),
            None => false
        };

        inner || self.complete_on == Some(self.completed_checks)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// A valid map where every operation is programmatic and nothing is bound.
pub fn minimal_map() -> ButtonMap {
    let mut map = ButtonMap::new();

    for op in AnalogOperation::ALL.iter().copied() {
        let range = match op {
            AnalogOperation::DriveTrainLeftPosition
            | AnalogOperation::DriveTrainRightPosition
            | AnalogOperation::DriveTrainLeftVelocity
            | AnalogOperation::DriveTrainRightVelocity => AnalogRange::Unbounded,
            _ => AnalogRange::Normalised
        };
        map = map.with_analog(op, AnalogOperationDescription::programmatic(range));
    }

    for op in DigitalOperation::ALL.iter().copied() {
        map = map.with_digital(op, DigitalOperationDescription::programmatic());
    }

    map
}

/// A driver on the minimal map whose operations hold the given values.
///
/// The values are written by an autonomous task, so every other operation
/// keeps its default.
pub fn scripted_driver(
    rig: &TestRig,
    analog: &[(AnalogOperation, f64)],
    digital: &[(DigitalOperation, bool)]
) -> Driver {
    let mut driver = match Driver::new(minimal_map(), rig.collab()) {
        Ok(d) => d,
        Err(e) => panic!("Minimal map is invalid: {}", e)
    };
    set_ops(&mut driver, analog, digital);

    driver
}

/// Replace the values held by a scripted driver.
pub fn set_ops(
    driver: &mut Driver,
    analog: &[(AnalogOperation, f64)],
    digital: &[(DigitalOperation, bool)]
) {
    let rec = Recorder::new();
    let mut task = ScriptedTask::new("ops", &rec);
    for (op, v) in analog.iter() {
        task = task.writes_analog(*op, *v);
    }
    for (op, v) in digital.iter() {
        task = task.writes_digital(*op, *v);
    }

    driver.stop();
    driver.start_autonomous(Box::new(task));
    driver.update(&InputFrame::default());
}

/// Rebuild the map with the default description of `op` replaced.
pub fn replace_analog(
    map: ButtonMap,
    op: AnalogOperation,
    desc: AnalogOperationDescription
) -> ButtonMap {
    let mut out = ButtonMap::new();

    for (o, d) in map.analog().iter() {
        if *o == op && d.shift.is_none() {
            out = out.with_analog(*o, desc.clone());
        }
        else {
            out = out.with_analog(*o, d.clone());
        }
    }

    copy_rest(&map, out, true, false)
}

/// Rebuild the map with the default description of `op` replaced.
pub fn replace_digital(
    map: ButtonMap,
    op: DigitalOperation,
    desc: DigitalOperationDescription
) -> ButtonMap {
    let mut out = ButtonMap::new();

    for (o, d) in map.digital().iter() {
        if *o == op && d.shift.is_none() {
            out = out.with_digital(*o, desc.clone());
        }
        else {
            out = out.with_digital(*o, d.clone());
        }
    }

    copy_rest(&map, out, false, true)
}

fn copy_rest(map: &ButtonMap, mut out: ButtonMap, skip_analog: bool, skip_digital: bool) -> ButtonMap {
    if !skip_analog {
        for (o, d) in map.analog().iter() {
            out = out.with_analog(*o, d.clone());
        }
    }
    if !skip_digital {
        for (o, d) in map.digital().iter() {
            out = out.with_digital(*o, d.clone());
        }
    }
    for (o, d) in map.macros().iter() {
        out = out.with_macro(*o, d.clone());
    }
    for (s, d) in map.shifts().iter() {
        out = out.with_shift(*s, d.clone());
    }

    out
}
