//! Main robot executable entry point.
//!
//! # Architecture
//!
//! The executable runs the control core against simulated equipment, playing out a full match:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the simulated equipment and the robot core
//!     - Main loop, once per 20 ms:
//!         - Match phase changes (disabled, autonomous, teleop)
//!         - Operator input acquisition (from a script if one is given)
//!         - Robot core cycle
//!         - Simulation step
//!
//! Usage: `robot_exec [input_script]`

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::env;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use color_eyre::{Report, eyre::WrapErr};
use log::{debug, info, warn};

// Internal
use eqpt_if::{
    eqpt::{timer::{ManualTimer, Timer, WallTimer}, vision::VisionHandle},
    input::InputFrame
};
use robot_lib::{
    driver::Collaborators,
    params::TuningParams,
    robot::{build_robot, RobotCore},
    sim::{SimDriveTrain, SimMotor, SimPower, VisionSim}
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    raise_error,
    script_interpreter::{PendingInput, ScriptInterpreter},
    session::Session,
    telem::{ArchiveTelem, LogTelem, TelemSink}
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

/// End of the disabled phase before the match starts.
const DISABLED_END_S: f64 = 1.0;

/// End of the autonomous phase.
const AUTONOMOUS_END_S: f64 = DISABLED_END_S + 15.0;

/// End of the match.
const MATCH_END_S: f64 = AUTONOMOUS_END_S + 135.0;

/// Voltage of the simulated battery.
const SIM_BATTERY_VOLTAGE_V: f64 = 12.5;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disabled,
    Autonomous,
    Teleop,
    Finished,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new(
        "robot_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: TuningParams = util::params::load("robot_exec.toml")
        .wrap_err("Could not load the tuning parameters")?;

    info!("Tuning parameters loaded");

    // ---- INPUT SOURCE ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let mut script = match args.len() {
        2 => {
            info!("Loading input script from \"{}\"", &args[1]);
            let si = ScriptInterpreter::new(&args[1])
                .wrap_err("Failed to load the input script")?;
            info!(
                "Loaded script lasts {:.02} s and contains {} frames\n",
                si.get_duration(),
                si.get_num_frames()
            );
            Some(si)
        },
        _ => {
            info!("No input script given, operator input will be neutral");
            None
        }
    };

    // ---- EQUIPMENT ----

    let timer = Rc::new(ManualTimer::new(0.0));
    let drive_train = Rc::new(SimDriveTrain::new(params.sim_drive.clone()));
    let vision = VisionHandle::new();
    let mut vision_sim = VisionSim::start(params.sim_vision.clone(), vision.clone());
    let motor = Rc::new(SimMotor::new(params.one_motor.pid_max_velocity));
    let power = Rc::new(SimPower::new(SIM_BATTERY_VOLTAGE_V));

    let telem: Rc<dyn TelemSink> = match Archiver::from_path(&session, "telem.csv") {
        Ok(a) => Rc::new(ArchiveTelem::new(a)),
        Err(e) => {
            warn!("Could not create the telemetry archive ({}), logging telemetry instead", e);
            Rc::new(LogTelem)
        }
    };

    let collab = Collaborators {
        timer: timer.clone(),
        drive_train: drive_train.clone(),
        vision,
    };

    let mut robot = build_robot(&params, collab, motor, power, telem)
        .wrap_err("Failed to build the robot")?;

    info!("Initialisation complete, beginning main loop\n");

    // ---- MAIN LOOP ----

    let mut phase = Phase::Disabled;
    robot.disabled_init().wrap_err("Failed to disable the robot")?;

    let mut num_cycles: u64 = 0;
    let cycle_timer = WallTimer::new();

    loop {
        cycle_timer.reset();
        let match_time_s = num_cycles as f64 * CYCLE_PERIOD_S;

        let next_phase = phase_at(match_time_s);
        if next_phase != phase {
            phase = next_phase;
            if !enter_phase(&mut robot, phase)? {
                break
            }
        }

        let mut end_of_script = false;
        let frame = match script {
            Some(ref mut si) => match si.get_pending(match_time_s) {
                PendingInput::Frame(f) => f.clone(),
                PendingInput::EndOfScript => {
                    end_of_script = true;
                    InputFrame::default()
                }
            },
            None => InputFrame::default()
        };

        if end_of_script {
            info!("End of input script reached");
            script = None;
        }

        robot.update(&frame).wrap_err("Robot cycle failed")?;

        drive_train.step(CYCLE_PERIOD_S);
        vision_sim.set_pose(drive_train.pose());
        timer.advance(CYCLE_PERIOD_S);

        num_cycles += 1;

        // Pace the loop
        let cycle_dur_s = cycle_timer.get();
        if cycle_dur_s < CYCLE_PERIOD_S {
            thread::sleep(Duration::from_secs_f64(CYCLE_PERIOD_S - cycle_dur_s));
        }
        else {
            warn!("Cycle overran by {:.06} s", cycle_dur_s - CYCLE_PERIOD_S);
        }
    }

    // ---- SHUTDOWN ----

    if let Err(e) = robot.stop() {
        raise_error!("Could not stop the robot: {}", e);
    }
    vision_sim.stop();

    info!("Final pose: {:?}", drive_train.pose());
    info!("Ran {} cycles", num_cycles);

    session.exit();

    Ok(())
}

/// The match phase at the given time.
fn phase_at(match_time_s: f64) -> Phase {
    if match_time_s < DISABLED_END_S {
        Phase::Disabled
    }
    else if match_time_s < AUTONOMOUS_END_S {
        Phase::Autonomous
    }
    else if match_time_s < MATCH_END_S {
        Phase::Teleop
    }
    else {
        Phase::Finished
    }
}

/// Initialise the robot for the phase, returns false once the match is over.
fn enter_phase(robot: &mut RobotCore, phase: Phase) -> Result<bool, Report> {
    info!("Entering {:?} phase", phase);

    let result = match phase {
        Phase::Disabled => robot.disabled_init(),
        Phase::Autonomous => robot.autonomous_init(),
        Phase::Teleop => robot.teleop_init(),
        Phase::Finished => return Ok(false)
    };
    result.wrap_err_with(|| format!("Failed to enter the {:?} phase", phase))?;

    Ok(true)
}
