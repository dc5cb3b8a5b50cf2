//! Kinetic (Coulomb) joint friction.
//!
//! # Physics
//!
//! Moving regime (|v| > `stiction_velocity`): `τ = -kinetic·sign(v)`
//!
//! Near rest the model contributes nothing, so a joint at rest is not
//! chattered back and forth by a sign flip every step.

/// Default velocity below which the joint counts as at rest (rad/s).
pub const DEFAULT_STICTION_VELOCITY: f64 = 1e-3;

// ---------------------------------------------------------------------------
// FrictionModel
// ---------------------------------------------------------------------------

/// Constant-magnitude friction opposing the measured joint velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrictionModel {
    /// Kinetic friction torque (N·m).
    pub kinetic: f64,
    /// Velocity threshold of the moving regime (rad/s).
    pub stiction_velocity: f64,
}

impl Default for FrictionModel {
    fn default() -> Self {
        Self::none()
    }
}

impl FrictionModel {
    /// No friction at all.
    pub const fn none() -> Self {
        Self::kinetic(0.0)
    }

    /// Kinetic friction of the given magnitude (N·m).
    pub const fn kinetic(kinetic: f64) -> Self {
        Self {
            kinetic,
            stiction_velocity: DEFAULT_STICTION_VELOCITY,
        }
    }

    /// Set the velocity threshold (rad/s).
    pub const fn with_stiction_velocity(mut self, velocity: f64) -> Self {
        self.stiction_velocity = velocity;
        self
    }

    /// Whether `velocity` is in the moving regime.
    pub fn is_moving(&self, velocity: f64) -> bool {
        velocity.abs() > self.stiction_velocity
    }

    /// Friction torque at the measured `velocity` (rad/s).
    pub fn compute(&self, velocity: f64) -> f64 {
        if self.is_moving(velocity) {
            -self.kinetic * velocity.signum()
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
