//! Shared test fixtures and utilities for servosim crates.
//!
//! Provides a small wheeled biped (URDF and servo layout), helpers for
//! building command batches, and reproducible random command batches.

pub mod commands;
pub mod random;
pub mod robot;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use commands::{position_commands, reply_buffer, stop_commands};
pub use random::{random_position_commands, seeded_rng};
pub use robot::{WHEELED_BIPED_URDF, wheeled_biped_layout, write_fixture};
