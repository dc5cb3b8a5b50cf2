//! Engine-agnostic servo actuation: bus protocol, servo layout, kinetic
//! friction and the torque loop run by each simulated servo.
//!
//! Pure Rust library with no physics engine dependencies.
//!
//! # Torque Pipeline
//!
//! ```text
//! ServoCommand → TorqueTarget → PD + feedforward → Friction → Clamp → Joint torque
//!  (rev, rev/s)   (rad, rad/s)   (kp, kd scaled)   (Coulomb)   (τmax)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use servosim_actuator_core::prelude::*;
//!
//! let controller = TorqueController::new(20.0, 1.0);
//! let friction = FrictionModel::kinetic(0.1);
//! let command = PositionCommand::default().with_velocity(0.5);
//!
//! let target = TorqueTarget::from_command(&command);
//! let measured = MeasuredState::new(0.0, 0.0);
//! let torque = controller.compute(&target, measured, &friction, 16.0);
//! assert!(torque > 0.0);
//! ```

pub mod control;
pub mod friction;
pub mod layout;
pub mod protocol;
pub mod telemetry;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::control::{MeasuredState, TorqueController, TorqueTarget};
    pub use crate::friction::FrictionModel;
    pub use crate::layout::{LayoutError, ServoLayout};
    pub use crate::protocol::{
        Data, Mode, Output, PositionCommand, QueryResult, ServoCommand, ServoReply,
        radians_to_revolutions, revolutions_to_radians,
    };
    pub use crate::telemetry::Telemetry;
}
