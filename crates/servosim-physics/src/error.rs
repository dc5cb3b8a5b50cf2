//! Physics backend errors.

/// Errors raised while building or driving a physics backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("unknown joint: {0}")]
    UnknownJoint(String),

    #[error("unknown link: {0}")]
    UnknownLink(String),

    #[error("joint {0} is fixed and cannot be driven")]
    FixedJoint(String),

    #[error("joint {name} has unsupported type {kind}")]
    UnsupportedJoint { name: String, kind: String },

    #[error("joint {0} has a zero axis")]
    ZeroAxis(String),

    #[error("robot has no mass")]
    MasslessRobot,

    #[error("invalid timestep: {0} (must be > 0)")]
    InvalidTimestep(f64),
}
