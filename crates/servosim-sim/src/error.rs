//! Errors of the actuation interface.

use servosim_actuator_core::layout::LayoutError;
use servosim_core::error::{ConfigError, DictionaryError};
use servosim_physics::error::PhysicsError;
use servosim_urdf::UrdfError;

/// Errors raised by an actuation [`Interface`](crate::Interface).
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("unknown servo id: {0}")]
    UnknownServo(i32),

    #[error("unknown joint: {0}")]
    UnknownJoint(String),

    #[error("unknown contact surface: {0}")]
    UnknownContactSurface(String),

    #[error("batch has {commands} commands but {replies} replies")]
    BatchSizeMismatch { commands: usize, replies: usize },

    #[error("IMU link {0} not found in robot description")]
    MissingImuLink(String),

    #[error("joint {0} is not an actuated joint of the robot description")]
    JointNotInDescription(String),

    #[error("joint {joint} has a non-positive torque limit ({effort} N·m)")]
    NonPositiveTorqueLimit { joint: String, effort: f64 },

    #[error(transparent)]
    Urdf(#[from] UrdfError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(SimError::UnknownServo(7).to_string(), "unknown servo id: 7");
        assert_eq!(
            SimError::BatchSizeMismatch {
                commands: 6,
                replies: 5
            }
            .to_string(),
            "batch has 6 commands but 5 replies"
        );
        assert_eq!(
            SimError::MissingImuLink("imu".into()).to_string(),
            "IMU link imu not found in robot description"
        );
        assert_eq!(
            SimError::NonPositiveTorqueLimit {
                joint: "left_wheel".into(),
                effort: 0.0
            }
            .to_string(),
            "joint left_wheel has a non-positive torque limit (0 N·m)"
        );
    }

    #[test]
    fn wrapped_errors_are_transparent() {
        let err = SimError::from(PhysicsError::UnknownLink("tail".into()));
        assert_eq!(err.to_string(), "unknown link: tail");
        let err = SimError::from(DictionaryError::MissingKey("bullet.dt".into()));
        assert!(matches!(err, SimError::Dictionary(_)));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn error_is_send_sync() {
        assert_send_sync::<SimError>();
    }
}
