//! # Control Cycle Benchmark

use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};

use eqpt_if::{
    eqpt::{timer::ManualTimer, vision::{TargetCenter, VisionHandle, VisionMeasurement}},
    input::{AnalogAxis, InputFrame}
};
use robot_lib::{
    driver::Collaborators,
    params::TuningParams,
    robot::build_robot,
    sim::{SimDriveParams, SimDriveTrain, SimMotor, SimPower}
};
use util::telem::NullTelem;

fn cycle_benchmark(c: &mut Criterion) {
    // ---- Build the robot on simulated equipment ----

    let params = TuningParams::default();
    let timer = Rc::new(ManualTimer::new(0.0));
    let drive_train = Rc::new(SimDriveTrain::new(SimDriveParams::default()));
    let vision = VisionHandle::new();

    vision.publish(VisionMeasurement {
        center: Some(TargetCenter { x: 170.0, y: 120.0 }),
        measured_angle_deg: Some(2.0),
        desired_angle_deg: Some(0.0),
        distance_in: Some(60.0),
        fps: 30.0,
    });

    let collab = Collaborators {
        timer: timer.clone(),
        drive_train: drive_train.clone(),
        vision,
    };

    let mut robot = build_robot(
        &params,
        collab,
        Rc::new(SimMotor::new(params.one_motor.pid_max_velocity)),
        Rc::new(SimPower::new(12.5)),
        Rc::new(NullTelem)
    ).unwrap();

    let mut frame = InputFrame::default();
    frame.driver.set_axis(AnalogAxis::Y, -0.6);
    frame.driver.set_axis(AnalogAxis::X, 0.2);

    // ---- Teleop cycle ----

    robot.teleop_init().unwrap();

    c.bench_function("teleop cycle", |b| b.iter(|| {
        robot.update(&frame).unwrap();
        drive_train.step(0.02);
        timer.advance(0.02);
    }));

    // ---- Autonomous cycle ----

    robot.autonomous_init().unwrap();

    c.bench_function("autonomous cycle", |b| b.iter(|| {
        robot.update(&InputFrame::default()).unwrap();
        drive_train.step(0.02);
        timer.advance(0.02);
    }));
}

criterion_group!(benches, cycle_benchmark);
criterion_main!(benches);
