//! # Input script interpreter module
//!
//! This module provides an interpreter for operator input scripts, allowing a match to be replayed
//! without a driver station. Each line of a script is `<time_s>: <json input frame>;`, for example
//!
//! ```text
//! 0.0: {"driver": {"axes": [0.0, -0.6, 0.0, 0.0, 0.0, 0.0]}};
//! 2.5: {"driver": {"buttons": [1]}};
//! ```
//!
//! The frame at a given time stays in force until the next frame's time is reached.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use eqpt_if::input::InputFrame;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An input frame which is scripted to start at a specific time.
#[derive(Debug)]
struct ScriptedFrame {
    /// The time the frame comes into force
    exec_time_s: f64,

    frame: InputFrame
}

/// A script interpreter.
///
/// After initialising with the path to the script use `.get_pending` to
/// acquire the input frame that applies at the current time.
#[derive(Debug)]
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    frames: VecDeque<ScriptedFrame>,
    current: InputFrame,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid input frame at {0} s: {1}")]
    InvalidFrame(f64, serde_json::Error),

    #[error("Script timestamps must not decrease, {0} s follows {1} s")]
    OutOfOrder(f64, f64),
}

/// The result of querying the interpreter.
#[derive(Debug, PartialEq)]
pub enum PendingInput<'a> {
    /// The frame in force at the queried time.
    Frame(&'a InputFrame),

    /// Every frame has been consumed and the script's duration has passed.
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::from_str(&script)?;
        interp._script_path = path;

        Ok(interp)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        // Empty queue of frames
        let mut frame_queue: VecDeque<ScriptedFrame> = VecDeque::new();

        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

        for cap in re.captures_iter(script) {
            // Group 1 and group 3 are not optional so will always be present
            // on a match.
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let payload = cap.get(3).map(|m| m.as_str()).unwrap_or_default();

            // Parse the exec time
            let exec_time_s: f64 = time_str.parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(prev) = frame_queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s, prev.exec_time_s))
                }
            }

            let frame: InputFrame = serde_json::from_str(payload)
                .map_err(|e| ScriptError::InvalidFrame(exec_time_s, e))?;

            frame_queue.push_back(ScriptedFrame {
                exec_time_s,
                frame
            });
        }

        if frame_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: PathBuf::new(),
            frames: frame_queue,
            current: InputFrame::default(),
        })
    }

    /// Get the input frame in force at `current_time_s`.
    ///
    /// Frames whose time has been reached are consumed in order, the last one
    /// consumed is returned. Before the first frame a neutral frame is
    /// returned.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingInput {
        if self.frames.is_empty() {
            return PendingInput::EndOfScript
        }

        while let Some(next) = self.frames.front() {
            if next.exec_time_s > current_time_s {
                break
            }

            if let Some(f) = self.frames.pop_front() {
                self.current = f.frame;
            }
        }

        PendingInput::Frame(&self.current)
    }

    /// Get the number of frames left in the script
    pub fn get_num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.frames.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
