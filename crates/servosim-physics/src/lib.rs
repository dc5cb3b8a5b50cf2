// servosim-physics: Engine-agnostic physics abstraction for servosim.
//
// Provides a `PhysicsBackend` trait so the actuation interface never talks
// to a concrete engine directly, the frame conventions shared by every
// backend, and `RapierBackend`: a floating-base robot simulated with
// rapier3d, with an optional floor plane.

pub mod backend;
pub mod error;
pub mod frames;
pub mod rapier;
pub mod state;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        backend::PhysicsBackend,
        error::PhysicsError,
        rapier::{EngineParameters, RapierBackend},
        state::{BaseState, JointDrive, JointState, LinkMotion},
    };
}

pub use rapier::RapierBackend;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the prelude re-exports compile.
    #[test]
    fn prelude_exports() {
        use prelude::*;

        fn _accepts_backend(_: &dyn PhysicsBackend) {}

        let _state = BaseState::default();
        let _drive = JointDrive::Brake;
        let _params = EngineParameters::default();
    }
}
