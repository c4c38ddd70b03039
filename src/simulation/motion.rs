//! Rigid-body motion of the detector array.
//!
//! The array moves as one body: a fixed tilt rotation about a configured
//! axis plus a time-dependent translation. Poses are always recomputed from
//! each detector's immutable reference position, never accumulated
//! incrementally, so long runs cannot drift.

use nalgebra::{Rotation3, Vector3};

use crate::config::{TiltAxis, TrajectoryConfig};

/// Rigid transform applied to every detector for one time step.
#[derive(Debug, Clone)]
pub struct DetectorPose {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

/// Time-dependent translation of the array's frame.
#[derive(Debug, Clone)]
pub enum Trajectory {
    /// Circular orbit in the xy plane: `(cos(ωt), sin(ωt), 0) · r`.
    Circular { radius: f64, angular_speed: f64 },
    /// Constant-velocity drift.
    Linear { velocity: Vector3<f64> },
    /// The array does not translate.
    Static,
}

impl Trajectory {
    pub fn from_config(config: &TrajectoryConfig) -> Self {
        match config {
            TrajectoryConfig::Circular { radius, angular_speed } => Trajectory::Circular {
                radius: *radius,
                angular_speed: *angular_speed,
            },
            TrajectoryConfig::Linear { velocity } => Trajectory::Linear {
                velocity: Vector3::new(velocity[0], velocity[1], velocity[2]),
            },
            TrajectoryConfig::Static => Trajectory::Static,
        }
    }

    /// Translation of the array frame at time `t`.
    pub fn at(&self, t: f64) -> Vector3<f64> {
        match self {
            Trajectory::Circular { radius, angular_speed } => {
                let phase = t * angular_speed;
                Vector3::new(phase.cos() * radius, phase.sin() * radius, 0.0)
            }
            Trajectory::Linear { velocity } => velocity * t,
            Trajectory::Static => Vector3::zeros(),
        }
    }
}

/// Rigid motion model: fixed tilt + configured trajectory.
#[derive(Debug, Clone)]
pub struct MotionModel {
    tilt: Rotation3<f64>,
    trajectory: Trajectory,
}

impl MotionModel {
    pub fn new(tilt_axis: TiltAxis, tilt_degrees: f64, trajectory: Trajectory) -> Self {
        let angle = tilt_degrees.to_radians();
        let axis = match tilt_axis {
            TiltAxis::X => Vector3::x_axis(),
            TiltAxis::Y => Vector3::y_axis(),
            TiltAxis::Z => Vector3::z_axis(),
        };
        Self {
            tilt: Rotation3::from_axis_angle(&axis, angle),
            trajectory,
        }
    }

    /// Pose of the detector array at time `t`.
    ///
    /// The tilt is constant over the run; only the translation depends on
    /// time. Callers apply `rotation * reference + translation` per detector.
    pub fn pose(&self, t: f64) -> DetectorPose {
        DetectorPose {
            rotation: self.tilt,
            translation: self.trajectory.at(t),
        }
    }
}
