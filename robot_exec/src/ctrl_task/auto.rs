//! Autonomous routines

use log::info;

use super::{
    drive::DriveDistanceTask,
    path::{FollowPathTask, PathProfile},
    vision_centering::VisionCenteringTask,
    AutoRoutine, ControlTask, ParallelPolicy, ParallelTask, Params, SequentialTask, TimedTask
};

/// Build the configured autonomous routine.
pub fn autonomous_routine(params: &Params) -> Box<dyn ControlTask> {
    let auto = &params.auto;

    info!("Autonomous routine: {:?}", auto.routine);

    match auto.routine {
        AutoRoutine::None => Box::new(TimedTask::wait(0.0)),
        AutoRoutine::DriveForward => Box::new(DriveDistanceTask::new(
            auto.drive_speed,
            auto.drive_distance_in,
            Some(auto.drive_timeout_s)
        )),
        AutoRoutine::DriveAndCenter => Box::new(SequentialTask::new(vec![
            Box::new(DriveDistanceTask::new(
                auto.drive_speed,
                auto.drive_distance_in,
                Some(auto.drive_timeout_s)
            )),
            Box::new(TimedTask::wait(auto.settle_pause_s)),
            Box::new(ParallelTask::new(ParallelPolicy::Any, vec![
                Box::new(VisionCenteringTask::stationary(&params.vision, true)),
                Box::new(TimedTask::wait(auto.centering_timeout_s)),
            ])),
        ])),
        AutoRoutine::FollowPath => Box::new(FollowPathTask::new(
            PathProfile::straight(auto.drive_distance_in, &params.path)
        )),
    }
}
