//! Simulator state exchanged through [`PhysicsBackend`](crate::backend::PhysicsBackend).

use nalgebra::{Isometry3, Point3, Vector3};

// ---------------------------------------------------------------------------
// BaseState
// ---------------------------------------------------------------------------

/// Pose and velocity of the floating base.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseState {
    /// Base frame in the world frame.
    pub pose: Isometry3<f64>,
    /// Linear velocity of the base origin, in the world frame (m/s).
    pub linear_velocity: Vector3<f64>,
    /// Angular velocity of the base, in the base frame (rad/s).
    pub angular_velocity: Vector3<f64>,
}

impl Default for BaseState {
    fn default() -> Self {
        Self {
            pose: Isometry3::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

impl BaseState {
    /// Angular velocity expressed in the world frame.
    pub fn angular_velocity_in_world(&self) -> Vector3<f64> {
        self.pose.rotation * self.angular_velocity
    }
}

// ---------------------------------------------------------------------------
// JointState / JointDrive
// ---------------------------------------------------------------------------

/// State of a single-DOF joint after the last step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JointState {
    /// Position (rad or m).
    pub position: f64,
    /// Velocity (rad/s or m/s).
    pub velocity: f64,
    /// Torque applied by the drive during the last step (N·m or N).
    pub torque: f64,
}

/// What drives a joint during the next steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JointDrive {
    /// Apply a constant torque (N·m or N).
    Torque(f64),
    /// Drive the joint velocity to zero with a bounded torque.
    Brake,
}

impl Default for JointDrive {
    fn default() -> Self {
        Self::Torque(0.0)
    }
}

// ---------------------------------------------------------------------------
// LinkMotion
// ---------------------------------------------------------------------------

/// World-frame pose and velocity of a link frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkMotion {
    pub pose: Isometry3<f64>,
    /// Linear velocity of the link origin, in the world frame (m/s).
    pub linear_velocity: Vector3<f64>,
    /// Angular velocity, in the world frame (rad/s).
    pub angular_velocity: Vector3<f64>,
}

impl Default for LinkMotion {
    fn default() -> Self {
        Self {
            pose: Isometry3::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

impl LinkMotion {
    /// World-frame velocity of a world point rigidly attached to the link.
    pub fn point_velocity(&self, point: &Point3<f64>) -> Vector3<f64> {
        let lever = point.coords - self.pose.translation.vector;
        self.linear_velocity + self.angular_velocity.cross(&lever)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use nalgebra::{Translation3, UnitQuaternion};

    use super::*;

    #[test]
    fn base_state_default_is_at_rest() {
        let state = BaseState::default();
        assert_eq!(state.pose, Isometry3::identity());
        assert_eq!(state.linear_velocity, Vector3::zeros());
        assert_eq!(state.angular_velocity, Vector3::zeros());
    }

    #[test]
    fn angular_velocity_in_world_rotates() {
        let state = BaseState {
            pose: Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
            ),
            angular_velocity: Vector3::new(1.0, 0.0, 0.0),
            ..BaseState::default()
        };
        let w = state.angular_velocity_in_world();
        assert!((w - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn joint_drive_default_is_zero_torque() {
        assert_eq!(JointDrive::default(), JointDrive::Torque(0.0));
    }

    #[test]
    fn point_velocity_adds_rotation() {
        let motion = LinkMotion {
            pose: Isometry3::translation(0.0, 0.0, 1.0),
            linear_velocity: Vector3::new(1.0, 0.0, 0.0),
            angular_velocity: Vector3::new(0.0, 2.0, 0.0),
        };
        // Point 0.5 m below the link origin: ω × r = (0, 2, 0) × (0, 0, -0.5) = (-1, 0, 0).
        let v = motion.point_velocity(&Point3::new(0.0, 0.0, 0.5));
        assert!((v - Vector3::new(0.0, 0.0, 0.0)).norm() < 1e-12);
    }
}
