//! # Simulated equipment
//!
//! Stand-ins for the real robot hardware, used when running the executable on a development
//! machine and by the unit tests. The simulation provides:
//!
//! - A skid steer drive train with an encoder on each side - [`SimDriveTrain`].
//! - A single closed loop motor - [`SimMotor`].
//! - A power distribution board whose voltage is set by the caller - [`SimPower`].
//! - A vision pipeline which runs on its own thread and observes a fixed target from the
//!   simulated robot pose - [`VisionSim`].
//!
//! The simulation does not model slip or motor dynamics, each side moves at its power multiplied
//! by the maximum velocity.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    cell::{Cell, RefCell},
    sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}},
    thread::{self, JoinHandle},
    time::Duration
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use eqpt_if::eqpt::{
    drive::DriveTrainEqpt,
    motor::MotorEqpt,
    power::PowerEqpt,
    vision::{TargetCenter, VisionHandle, VisionMeasurement},
    EqptError
};
use util::maths::lin_map;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const DRIVE_TRAIN_NAME: &str = "drive_train";
const MOTOR_NAME: &str = "one_motor";

/// Width of the simulated camera image.
///
/// Units: pixels
const IMAGE_WIDTH_PX: f64 = 320.0;

/// Height of the simulated camera image.
///
/// Units: pixels
const IMAGE_HEIGHT_PX: f64 = 240.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated drive train.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimDriveParams {
    pub ticks_per_in: f64,

    /// Velocity of a side at full power.
    ///
    /// Units: inches/second
    pub max_velocity_ips: f64,

    /// Distance between the left and right wheels.
    ///
    /// Units: inches
    pub track_width_in: f64,
}

/// Parameters of the simulated vision target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimVisionParams {
    /// Position of the target in the field frame.
    ///
    /// Units: inches
    pub target_position_in: [f64; 2],

    /// Total horizontal field of view of the camera.
    ///
    /// Units: degrees
    pub field_of_view_deg: f64,

    /// Rate at which measurements are published.
    ///
    /// Units: frames/second
    pub fps: f64,
}

/// Position and heading of the simulated robot in the field frame.
///
/// The robot starts at the origin facing along +x, heading is positive counter clockwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimPose {
    /// Units: inches
    pub x_in: f64,

    /// Units: inches
    pub y_in: f64,

    /// Units: radians
    pub heading_rad: f64,
}

/// A simulated skid steer drive train.
pub struct SimDriveTrain {
    params: SimDriveParams,
    state: RefCell<DriveState>,
}

#[derive(Debug, Default)]
struct DriveState {
    left_power: f64,
    right_power: f64,

    left_distance_in: f64,
    right_distance_in: f64,

    left_velocity_ips: f64,
    right_velocity_ips: f64,

    pose: SimPose,

    fault: Option<String>,
}

/// A simulated motor whose speed follows its power instantly.
pub struct SimMotor {
    max_speed: f64,
    power: RefCell<f64>,
}

/// A simulated power distribution board.
pub struct SimPower {
    voltage: Cell<f64>,
}

/// Background thread publishing simulated vision measurements.
pub struct VisionSim {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    pose: Arc<Mutex<SimPose>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimDriveParams {
    fn default() -> Self {
        Self {
            ticks_per_in: 40.0,
            max_velocity_ips: 125.0,
            track_width_in: 24.0,
        }
    }
}

impl Default for SimVisionParams {
    fn default() -> Self {
        Self {
            target_position_in: [120.0, 20.0],
            field_of_view_deg: 60.0,
            fps: 30.0,
        }
    }
}

impl SimDriveTrain {
    pub fn new(params: SimDriveParams) -> Self {
        Self {
            params,
            state: RefCell::new(DriveState::default()),
        }
    }

    /// Move the robot forward in time by `dt_s` seconds at the current power.
    pub fn step(&self, dt_s: f64) {
        if dt_s <= 0.0 {
            return
        }

        let mut s = self.state.borrow_mut();

        s.left_velocity_ips = s.left_power * self.params.max_velocity_ips;
        s.right_velocity_ips = s.right_power * self.params.max_velocity_ips;

        s.left_distance_in += s.left_velocity_ips * dt_s;
        s.right_distance_in += s.right_velocity_ips * dt_s;

        let speed = 0.5 * (s.left_velocity_ips + s.right_velocity_ips);
        let yaw_rate = if self.params.track_width_in > 0.0 {
            (s.right_velocity_ips - s.left_velocity_ips) / self.params.track_width_in
        }
        else {
            0.0
        };

        let heading = s.pose.heading_rad;
        s.pose.x_in += speed * heading.cos() * dt_s;
        s.pose.y_in += speed * heading.sin() * dt_s;
        s.pose.heading_rad = wrap_angle(heading + yaw_rate * dt_s);
    }

    /// Overwrite the encoder distances.
    pub fn set_positions(&self, left_in: f64, right_in: f64) {
        let mut s = self.state.borrow_mut();
        s.left_distance_in = left_in;
        s.right_distance_in = right_in;
    }

    /// Last accepted power demand.
    pub fn powers(&self) -> (f64, f64) {
        let s = self.state.borrow();
        (s.left_power, s.right_power)
    }

    /// Make every power demand fail with the given reason, or clear the fault.
    pub fn inject_fault(&self, reason: Option<&str>) {
        self.state.borrow_mut().fault = reason.map(String::from);
    }

    pub fn pose(&self) -> SimPose {
        self.state.borrow().pose
    }
}

impl DriveTrainEqpt for SimDriveTrain {
    fn left_encoder_distance(&self) -> f64 {
        self.state.borrow().left_distance_in
    }

    fn right_encoder_distance(&self) -> f64 {
        self.state.borrow().right_distance_in
    }

    fn left_encoder_ticks(&self) -> f64 {
        self.state.borrow().left_distance_in * self.params.ticks_per_in
    }

    fn right_encoder_ticks(&self) -> f64 {
        self.state.borrow().right_distance_in * self.params.ticks_per_in
    }

    fn left_encoder_velocity(&self) -> f64 {
        self.state.borrow().left_velocity_ips
    }

    fn right_encoder_velocity(&self) -> f64 {
        self.state.borrow().right_velocity_ips
    }

    fn set_drive_train_power(&self, left: f64, right: f64) -> Result<(), EqptError> {
        let mut s = self.state.borrow_mut();

        if let Some(ref reason) = s.fault {
            return Err(EqptError::Fault {
                device: DRIVE_TRAIN_NAME,
                reason: reason.clone()
            })
        }

        for v in [left, right].iter() {
            if !(*v >= -1.0 && *v <= 1.0) {
                return Err(EqptError::InvalidDemand(*v))
            }
        }

        s.left_power = left;
        s.right_power = right;

        Ok(())
    }
}

impl SimMotor {
    pub fn new(max_speed: f64) -> Self {
        Self {
            max_speed,
            power: RefCell::new(0.0),
        }
    }
}

impl MotorEqpt for SimMotor {
    fn set_power(&self, power: f64) -> Result<(), EqptError> {
        if !(power >= -1.0 && power <= 1.0) {
            warn!("Rejected {} demand of {}", MOTOR_NAME, power);
            return Err(EqptError::InvalidDemand(power))
        }

        *self.power.borrow_mut() = power;
        Ok(())
    }

    fn speed(&self) -> f64 {
        *self.power.borrow() * self.max_speed
    }

    fn error(&self) -> f64 {
        0.0
    }
}

impl SimPower {
    pub fn new(voltage: f64) -> Self {
        Self {
            voltage: Cell::new(voltage),
        }
    }

    pub fn set_voltage(&self, voltage: f64) {
        self.voltage.set(voltage);
    }
}

impl PowerEqpt for SimPower {
    fn voltage(&self) -> f64 {
        self.voltage.get()
    }
}

impl VisionSim {
    /// Start the vision thread, publishing to the given handle.
    pub fn start(params: SimVisionParams, handle: VisionHandle) -> Self {
        let bg_run = Arc::new(AtomicBool::new(true));
        let pose = Arc::new(Mutex::new(SimPose::default()));

        let bg_run_clone = bg_run.clone();
        let pose_clone = pose.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(params, handle, bg_run_clone, pose_clone)
        }));

        debug!("Vision simulation started");

        Self {
            bg_jh,
            bg_run,
            pose,
        }
    }

    /// Update the pose the camera observes from.
    pub fn set_pose(&self, pose: SimPose) {
        match self.pose.lock() {
            Ok(mut p) => *p = pose,
            Err(_) => warn!("Vision simulation pose lock poisoned")
        }
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("Vision simulation thread panicked");
            }
        }
    }
}

impl Drop for VisionSim {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn bg_thread(
    params: SimVisionParams,
    handle: VisionHandle,
    run: Arc<AtomicBool>,
    pose: Arc<Mutex<SimPose>>
) {
    let period = Duration::from_secs_f64(1.0 / params.fps.max(1.0));

    while run.load(Ordering::Relaxed) {
        let current = match pose.lock() {
            Ok(p) => *p,
            Err(_) => break
        };

        // The camera stays up while processing is off, it just reports nothing
        let measurement = if handle.is_processing() {
            observe(&params, &current)
        }
        else {
            VisionMeasurement {
                fps: params.fps,
                ..Default::default()
            }
        };
        handle.publish(measurement);

        thread::sleep(period);
    }
}

/// The measurement the camera would make of the target from the given pose.
///
/// The measured angle is positive when the target is to the right of the robot.
pub fn observe(params: &SimVisionParams, pose: &SimPose) -> VisionMeasurement {
    let dx = params.target_position_in[0] - pose.x_in;
    let dy = params.target_position_in[1] - pose.y_in;

    let bearing = dy.atan2(dx);
    let measured_angle_deg = -wrap_angle(bearing - pose.heading_rad).to_degrees();

    if measured_angle_deg.abs() > 0.5 * params.field_of_view_deg {
        return VisionMeasurement {
            fps: params.fps,
            ..Default::default()
        }
    }

    let center = TargetCenter {
        x: lin_map(
            (-0.5 * params.field_of_view_deg, 0.5 * params.field_of_view_deg),
            (0.0, IMAGE_WIDTH_PX),
            measured_angle_deg
        ),
        y: 0.5 * IMAGE_HEIGHT_PX,
    };

    VisionMeasurement {
        center: Some(center),
        measured_angle_deg: Some(measured_angle_deg),
        desired_angle_deg: Some(0.0),
        distance_in: Some(dx.hypot(dy)),
        fps: params.fps,
    }
}

/// Wrap an angle into `(-pi, pi]`.
fn wrap_angle(angle_rad: f64) -> f64 {
    let tau = 2.0 * std::f64::consts::PI;
    let wrapped = angle_rad.rem_euclid(tau);

    if wrapped > std::f64::consts::PI {
        wrapped - tau
    }
    else {
        wrapped
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
