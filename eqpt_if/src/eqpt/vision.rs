//! # Vision measurements
//!
//! The image processing pipeline runs on its own thread and publishes its latest result through a
//! [`VisionHandle`]. The control core only ever takes a quick copy of the latest snapshot, it never
//! waits for a new frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex
};

use log::warn;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pixel coordinates of the detected target's center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetCenter {
    pub x: f64,
    pub y: f64,
}

/// A single result from the vision pipeline.
///
/// Every optional field is `None` until the pipeline has detected a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionMeasurement {
    /// Center of the detected target.
    pub center: Option<TargetCenter>,

    /// Horizontal angle to the target as measured in the image.
    ///
    /// Units: degrees
    pub measured_angle_deg: Option<f64>,

    /// Horizontal angle at which the target should appear when the robot is lined up.
    ///
    /// Units: degrees
    pub desired_angle_deg: Option<f64>,

    /// Estimated distance from the robot to the target.
    ///
    /// Units: inches
    pub distance_in: Option<f64>,

    /// Frame rate of the pipeline.
    pub fps: f64,
}

/// Shared, guarded access to the latest vision measurement.
///
/// Cloning the handle shares the same underlying measurement.
#[derive(Debug, Clone, Default)]
pub struct VisionHandle {
    latest: Arc<Mutex<VisionMeasurement>>,

    /// Whether the pipeline should be looking for the target, off at startup
    processing: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new measurement, replacing the previous one.
    ///
    /// Called from the vision thread.
    pub fn publish(&self, measurement: VisionMeasurement) {
        match self.latest.lock() {
            Ok(mut m) => *m = measurement,
            Err(poisoned) => *poisoned.into_inner() = measurement,
        }
    }

    /// Get a copy of the latest measurement.
    ///
    /// If the producer panicked while holding the lock the measurement is treated as absent.
    pub fn snapshot(&self) -> VisionMeasurement {
        match self.latest.lock() {
            Ok(m) => *m,
            Err(_) => {
                warn!("Vision measurement lock poisoned, treating as no detection");
                VisionMeasurement::default()
            }
        }
    }

    /// Ask the pipeline to start or stop looking for the target.
    pub fn set_processing(&self, enabled: bool) {
        self.processing.store(enabled, Ordering::Relaxed);
    }

    /// Whether the pipeline has been asked to look for the target.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Relaxed)
    }

    pub fn center(&self) -> Option<TargetCenter> {
        self.snapshot().center
    }

    pub fn measured_angle(&self) -> Option<f64> {
        self.snapshot().measured_angle_deg
    }

    pub fn desired_angle(&self) -> Option<f64> {
        self.snapshot().desired_angle_deg
    }

    pub fn measured_distance(&self) -> Option<f64> {
        self.snapshot().distance_in
    }

    pub fn fps(&self) -> f64 {
        self.snapshot().fps
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_publish_is_seen_by_clones() {
        let producer = VisionHandle::new();
        let consumer = producer.clone();

        assert_eq!(consumer.measured_angle(), None);

        producer.publish(VisionMeasurement {
            center: Some(TargetCenter { x: 160.0, y: 120.0 }),
            measured_angle_deg: Some(3.0),
            desired_angle_deg: Some(0.0),
            distance_in: Some(40.0),
            fps: 30.0
        });

        assert_eq!(consumer.measured_angle(), Some(3.0));
        assert_eq!(consumer.measured_distance(), Some(40.0));
        assert_eq!(consumer.fps(), 30.0);
    }

    #[test]
    fn test_processing_flag_is_shared() {
        let core = VisionHandle::new();
        let pipeline = core.clone();
        assert!(!pipeline.is_processing());

        core.set_processing(true);
        assert!(pipeline.is_processing());

        core.set_processing(false);
        assert!(!pipeline.is_processing());
    }

    #[test]
    fn test_poisoned_lock_reads_as_absent() {
        let handle = VisionHandle::new();
        handle.publish(VisionMeasurement {
            measured_angle_deg: Some(1.0),
            ..Default::default()
        });

        let h = handle.clone();
        let _ = std::thread::spawn(move || {
            let _guard = h.latest.lock().unwrap();
            panic!("producer died");
        }).join();

        assert_eq!(handle.measured_angle(), None);
    }
}
