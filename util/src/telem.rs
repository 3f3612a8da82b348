//! # Telemetry sinks
//!
//! Mechanisms report values they want to see on the dashboard through a
//! [`TelemSink`]. Sinks are fire-and-forget: nothing is ever read back, and a
//! failing sink must never affect control.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::RefCell;

use log::{trace, warn};
use serde::Serialize;

use crate::archive::Archiver;
use crate::session;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Log target used for telemetry records.
pub const TELEM_LOG_TARGET: &str = "telem";

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A dashboard telemetry sink.
pub trait TelemSink {
    /// Log a numeric value.
    fn log_number(&self, category: &str, key: &str, value: f64);

    /// Log a string value.
    fn log_string(&self, category: &str, key: &str, value: &str);

    /// Log a boolean value.
    fn log_bool(&self, category: &str, key: &str, value: bool) {
        self.log_string(category, key, if value { "true" } else { "false" })
    }

    /// Log a value which may be absent, absent values are logged as `n/a`.
    fn log_opt_number(&self, category: &str, key: &str, value: Option<f64>) {
        match value {
            Some(v) => self.log_number(category, key, v),
            None => self.log_string(category, key, "n/a")
        }
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sink which forwards every record to the `log` facade at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelem;

/// Sink which appends every record to a CSV archive.
pub struct ArchiveTelem {
    archiver: RefCell<Archiver>,
}

/// Sink which drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelem;

#[derive(Serialize)]
struct TelemRecord<'a> {
    time_s: f64,
    category: &'a str,
    key: &'a str,
    value: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TelemSink for LogTelem {
    fn log_number(&self, category: &str, key: &str, value: f64) {
        trace!(target: TELEM_LOG_TARGET, "{}/{} = {}", category, key, value);
    }

    fn log_string(&self, category: &str, key: &str, value: &str) {
        trace!(target: TELEM_LOG_TARGET, "{}/{} = {}", category, key, value);
    }
}

impl ArchiveTelem {
    pub fn new(archiver: Archiver) -> Self {
        Self {
            archiver: RefCell::new(archiver)
        }
    }

    fn write(&self, category: &str, key: &str, value: String) {
        let record = TelemRecord {
            time_s: session::try_get_elapsed_seconds().unwrap_or(0.0),
            category,
            key,
            value
        };

        // A sink already borrowed means we're being called re-entrantly from
        // a log hook, drop the record rather than panic.
        match self.archiver.try_borrow_mut() {
            Ok(mut a) => {
                if let Err(e) = a.serialise(record) {
                    warn!("Could not archive telemetry {}/{}: {}", category, key, e);
                }
            },
            Err(_) => ()
        }
    }
}

impl TelemSink for ArchiveTelem {
    fn log_number(&self, category: &str, key: &str, value: f64) {
        self.write(category, key, format!("{}", value))
    }

    fn log_string(&self, category: &str, key: &str, value: &str) {
        self.write(category, key, value.to_string())
    }
}

impl TelemSink for NullTelem {
    fn log_number(&self, _category: &str, _key: &str, _value: f64) {}

    fn log_string(&self, _category: &str, _key: &str, _value: &str) {}
}
