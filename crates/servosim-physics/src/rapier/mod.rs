//! Physics backend on `rapier3d` (double precision build).
//!
//! Owns the [`PhysicsPipeline`](rapier3d_f64::pipeline::PhysicsPipeline),
//! calls `step()` once per control cycle and reads joint, base, link and
//! contact state back from the rigid bodies.

pub mod backend;
pub mod bridge;
pub mod context;

pub use backend::RapierBackend;
pub use context::{EngineParameters, RapierContext};
