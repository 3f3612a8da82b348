//! # Vision manager
//!
//! Reports the latest vision measurement to the dashboard every cycle, and
//! turns the pipeline's target processing on and off from the `EnableVision`
//! operation. Tasks which need the measurement read the vision handle
//! themselves.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;
use log::debug;

use crate::driver::{DigitalOperation, Driver};
use eqpt_if::eqpt::vision::VisionHandle;
use util::telem::TelemSink;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const TELEM_CATEGORY: &str = "vision";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct VisionMgr {
    vision: VisionHandle,
    telem: Rc<dyn TelemSink>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisionMgr {
    pub fn new(vision: VisionHandle, telem: Rc<dyn TelemSink>) -> Self {
        Self { vision, telem }
    }

    pub fn read_sensors(&mut self) {
        let m = self.vision.snapshot();
        let t = &self.telem;
        t.log_opt_number(TELEM_CATEGORY, "center_x", m.center.map(|c| c.x));
        t.log_opt_number(TELEM_CATEGORY, "center_y", m.center.map(|c| c.y));
        t.log_number(TELEM_CATEGORY, "fps", m.fps);
        t.log_opt_number(TELEM_CATEGORY, "distance", m.distance_in);
        t.log_opt_number(TELEM_CATEGORY, "measured_angle", m.measured_angle_deg);
        t.log_opt_number(TELEM_CATEGORY, "desired_angle", m.desired_angle_deg);
    }

    pub fn update(&mut self, driver: &Driver) {
        let enable = driver.get_digital(DigitalOperation::EnableVision);

        if enable != self.vision.is_processing() {
            debug!("Vision processing {}", if enable { "enabled" } else { "disabled" });
            self.vision.set_processing(enable);
        }
        self.telem.log_bool(TELEM_CATEGORY, "processing", enable);
    }

    pub fn stop(&mut self) {
        self.vision.set_processing(false);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
