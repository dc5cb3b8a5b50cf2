//! The seam between the servo bus and the simulator.
//!
//! The actuation interface drives any engine implementing [`PhysicsBackend`]:
//! it sets one [`JointDrive`] per actuated joint, steps exactly once per
//! cycle, and reads joint, base, link and contact state back.

use crate::{
    error::PhysicsError,
    state::{BaseState, JointDrive, JointState, LinkMotion},
};

/// A deterministic simulator with a floating base and single-axis joints.
///
/// Each [`step`](PhysicsBackend::step) advances one fixed timestep,
/// velocities before positions. Joint drives persist until replaced and
/// contact counts describe the last step only.
pub trait PhysicsBackend: Send + Sync + 'static {
    /// Short engine identifier for logs.
    fn name(&self) -> &str;

    /// Fixed timestep (s).
    fn dt(&self) -> f64;

    /// Simulated time since construction (s).
    fn time(&self) -> f64;

    /// Whether the floor plane is present.
    fn floor(&self) -> bool;

    /// Add or remove the floor plane.
    fn set_floor(&mut self, enabled: bool);

    /// Set the drive applied to a joint during the following steps.
    fn set_joint_drive(&mut self, joint: &str, drive: JointDrive) -> Result<(), PhysicsError>;

    /// Joint state after the last step.
    fn joint_state(&self, joint: &str) -> Result<JointState, PhysicsError>;

    /// Current floating-base state.
    fn base_state(&self) -> &BaseState;

    /// Teleport the floating base. Joint states are left untouched.
    fn set_base_state(&mut self, state: BaseState);

    /// World pose and velocity of a link frame.
    fn link_motion(&self, link: &str) -> Result<LinkMotion, PhysicsError>;

    /// Number of contact points of a link during the last step.
    fn contact_points(&self, link: &str) -> Result<usize, PhysicsError>;

    /// Advance the simulation by one timestep.
    fn step(&mut self);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
