//! # Power manager
//!
//! Reads the battery voltage every cycle and reports it to the dashboard. The raw reading jumps
//! about as the motors draw current, so it's smoothed with a complementary filter first.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;
use log::warn;
use serde::{Deserialize, Serialize};

use eqpt_if::eqpt::power::PowerEqpt;
use util::telem::TelemSink;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const TELEM_CATEGORY: &str = "power";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Weight given to the previous filtered value
    pub old_weight: f64,

    /// Weight given to each new reading
    pub new_weight: f64,

    /// Filtered voltage below which a warning is logged.
    ///
    /// Units: volts
    pub low_voltage_v: f64,
}

/// Blends each new reading with the previous output.
#[derive(Debug, Clone)]
pub struct ComplementaryFilter {
    old_weight: f64,
    new_weight: f64,
    value: f64,
}

pub struct PowerMgr {
    params: Params,
    filter: ComplementaryFilter,
    power: Rc<dyn PowerEqpt>,
    telem: Rc<dyn TelemSink>,
    low: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            old_weight: 0.4,
            new_weight: 0.6,
            low_voltage_v: 10.5,
        }
    }
}

impl ComplementaryFilter {
    pub fn new(old_weight: f64, new_weight: f64, initial: f64) -> Self {
        Self {
            old_weight,
            new_weight,
            value: initial,
        }
    }

    /// Feed in a reading and get the new output.
    pub fn update(&mut self, reading: f64) -> f64 {
        self.value = self.old_weight * self.value + self.new_weight * reading;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl PowerMgr {
    /// The filter starts from the voltage read now.
    pub fn new(params: Params, power: Rc<dyn PowerEqpt>, telem: Rc<dyn TelemSink>) -> Self {
        let filter = ComplementaryFilter::new(
            params.old_weight,
            params.new_weight,
            power.voltage()
        );

        Self {
            params,
            filter,
            power,
            telem,
            low: false,
        }
    }

    /// Filtered battery voltage.
    ///
    /// Units: volts
    pub fn voltage(&self) -> f64 {
        self.filter.value()
    }

    pub fn read_sensors(&mut self) {
        let raw = self.power.voltage();
        let filtered = self.filter.update(raw);

        let low = filtered < self.params.low_voltage_v;
        if low && !self.low {
            warn!("Battery voltage low: {:.2} V", filtered);
        }
        self.low = low;

        self.telem.log_number(TELEM_CATEGORY, "raw_voltage", raw);
        self.telem.log_number(TELEM_CATEGORY, "voltage", self.voltage());
        self.telem.log_bool(TELEM_CATEGORY, "low", low);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
