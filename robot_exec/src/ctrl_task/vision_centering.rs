//! # Vision centering
//!
//! Turns the robot in place (or while advancing) until the vision target sits at the desired
//! angle. The measurement comes from the vision handle, which may have nothing to report yet, so
//! each reading is treated as optional. The task gives up once the target has been missing for too
//! many consecutive cycles.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;

use log::{debug, trace};

use eqpt_if::eqpt::{timer::Timer, vision::{VisionHandle, VisionMeasurement}};

use super::{ControlTask, TaskContext, VisionParams};
use crate::driver::{AnalogOperation, DigitalOperation, Operation};
use crate::pid::PidHandler;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Center on the vision target.
pub struct VisionCenteringTask {
    params: VisionParams,
    variant: Variant,

    vision: Option<VisionHandle>,
    timer: Option<Rc<dyn Timer>>,
    turn_pid: Option<PidHandler>,
    forward_pid: Option<PidHandler>,

    /// Time at which the target was first seen in tolerance, reset whenever
    /// it leaves tolerance.
    centered_since_s: Option<f64>,

    no_center_count: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    /// Turn on the spot, optionally requiring the target to stay centered
    /// for the settle time.
    Stationary { use_time: bool },

    /// Turn while driving towards the target.
    Advancing,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisionCenteringTask {
    /// Turn on the spot. If `use_time` is set the target must stay within
    /// tolerance for the settle time before the task completes.
    pub fn stationary(params: &VisionParams, use_time: bool) -> Self {
        Self::build(params, Variant::Stationary { use_time })
    }

    /// Turn towards the target while advancing to the acceptable distance.
    pub fn advancing(params: &VisionParams) -> Self {
        Self::build(params, Variant::Advancing)
    }

    fn build(params: &VisionParams, variant: Variant) -> Self {
        Self {
            params: params.clone(),
            variant,
            vision: None,
            timer: None,
            turn_pid: None,
            forward_pid: None,
            centered_since_s: None,
            no_center_count: 0,
        }
    }

    pub fn owned_operations() -> Vec<Operation> {
        vec![
            DigitalOperation::EnableVision.into(),
            DigitalOperation::DriveTrainUsePositionalMode.into(),
            AnalogOperation::DriveTrainTurn.into(),
            AnalogOperation::DriveTrainMoveForward.into(),
            AnalogOperation::DriveTrainLeftPosition.into(),
            AnalogOperation::DriveTrainRightPosition.into(),
        ]
    }

    /// The latest measurement, read in one go so every field is from the same frame.
    fn snapshot(&self) -> VisionMeasurement {
        self.vision
            .as_ref()
            .map(|v| v.snapshot())
            .unwrap_or_default()
    }
}

impl ControlTask for VisionCenteringTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        let timer = ctx.timer();

        match self.variant {
            Variant::Stationary { .. } => {
                self.turn_pid = Some(PidHandler::new(
                    self.params.stationary_gains, timer.clone()
                ));
            },
            Variant::Advancing => {
                self.turn_pid = Some(PidHandler::new(self.params.moving_gains, timer.clone()));
                self.forward_pid = Some(PidHandler::new(
                    self.params.advancing_gains, timer.clone()
                ));
            }
        }

        self.vision = Some(ctx.vision());
        self.timer = Some(timer);
        self.centered_since_s = None;
        self.no_center_count = 0;

        debug!("Vision centering ({:?}) started", self.variant);
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUsePositionalMode, false);
        ctx.set_digital(DigitalOperation::EnableVision, true);

        let m = self.snapshot();

        if let (Some(measured), Some(desired), Some(pid)) = (
            m.measured_angle_deg, m.desired_angle_deg, self.turn_pid.as_mut()
        ) {
            let turn = -pid.calculate_position(desired, measured);
            trace!("Vision turn {:.3} (measured {:.2}, desired {:.2})", turn, measured, desired);
            ctx.set_analog(AnalogOperation::DriveTrainTurn, turn);
        }

        if let (Some(distance), Some(pid)) = (m.distance_in, self.forward_pid.as_mut()) {
            let forward = -pid.calculate_position(
                self.params.max_acceptable_forward_distance_in, distance
            );
            ctx.set_analog(AnalogOperation::DriveTrainMoveForward, forward);
        }
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUsePositionalMode, false);
        ctx.set_analog(AnalogOperation::DriveTrainTurn, 0.0);
        ctx.set_analog(AnalogOperation::DriveTrainMoveForward, 0.0);
        ctx.set_digital(DigitalOperation::EnableVision, false);
    }

    fn should_cancel(&mut self, _ctx: &mut TaskContext) -> bool {
        let has_center = self.snapshot().center.is_some();

        if has_center {
            self.no_center_count = 0;
        }
        else {
            self.no_center_count += 1;
        }

        if self.no_center_count >= self.params.no_center_threshold {
            debug!("No vision target for {} cycles, canceling", self.no_center_count);
            return true
        }

        false
    }

    fn has_completed(&mut self, _ctx: &mut TaskContext) -> bool {
        let m = self.snapshot();
        let in_tolerance = match (m.measured_angle_deg, m.desired_angle_deg) {
            (Some(measured), Some(desired)) =>
                (measured - desired).abs() <= self.params.max_centering_range_deg,
            _ => false
        };

        if !in_tolerance {
            self.centered_since_s = None;
            return false
        }

        match self.variant {
            Variant::Stationary { use_time: false } => true,
            Variant::Advancing => m.distance_in
                .map(|d| d <= self.params.max_acceptable_forward_distance_in)
                .unwrap_or(false),
            Variant::Stationary { use_time: true } => {
                let now_s = match self.timer {
                    Some(ref t) => t.get(),
                    None => return false
                };

                match self.centered_since_s {
                    Some(t0) => now_s - t0 >= self.params.settle_time_s,
                    None => {
                        self.centered_since_s = Some(now_s);
                        false
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
