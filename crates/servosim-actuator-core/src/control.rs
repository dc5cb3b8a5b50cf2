//! Servo torque loop.
//!
//! Each simulated servo turns its position command into a joint torque the
//! way the firmware does:
//!
//! ```text
//! τ = τ_ff + kd·kd_scale·(v* - v) [+ kp·kp_scale·(q* - q) if q* is set]
//! τ += friction(v)
//! τ = clamp(τ, -τmax, τmax),  τmax = min(command limit, joint limit)
//! ```
//!
//! Gains are in SI units (N·m/rad, N·m·s/rad). Malformed command fields
//! degrade to a neutral value instead of being rejected.

use crate::friction::FrictionModel;
use crate::protocol::{PositionCommand, revolutions_to_radians};

// ---------------------------------------------------------------------------
// TorqueTarget
// ---------------------------------------------------------------------------

/// Sanitized position command in SI units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TorqueTarget {
    /// Feedforward torque (N·m).
    pub feedforward_torque: f64,
    /// Target position (rad), `NaN` for none.
    pub position: f64,
    /// Target velocity (rad/s).
    pub velocity: f64,
    /// Proportional gain scale in `[0, 1]`.
    pub kp_scale: f64,
    /// Derivative gain scale in `[0, 1]`.
    pub kd_scale: f64,
    /// Torque limit (N·m), `+∞` for the joint's own limit.
    pub maximum_torque: f64,
}

impl Default for TorqueTarget {
    fn default() -> Self {
        Self {
            feedforward_torque: 0.0,
            position: f64::NAN,
            velocity: 0.0,
            kp_scale: 1.0,
            kd_scale: 1.0,
            maximum_torque: f64::INFINITY,
        }
    }
}

impl TorqueTarget {
    /// Convert a bus command to SI units and default malformed fields.
    ///
    /// - non-finite velocity or feedforward → 0
    /// - non-finite position → no position target
    /// - `NaN` gain scale → 1, others clamped to `[0, 1]`
    /// - `NaN` torque limit → unlimited, negative → 0
    pub fn from_command(command: &PositionCommand) -> Self {
        Self::new(
            command.feedforward_torque,
            revolutions_to_radians(command.position),
            revolutions_to_radians(command.velocity),
            command.kp_scale,
            command.kd_scale,
            command.maximum_torque,
        )
    }

    /// Build from SI values with the same defaulting as
    /// [`from_command`](Self::from_command).
    pub fn new(
        feedforward_torque: f64,
        position: f64,
        velocity: f64,
        kp_scale: f64,
        kd_scale: f64,
        maximum_torque: f64,
    ) -> Self {
        Self {
            feedforward_torque: finite_or_zero(feedforward_torque),
            position: if position.is_finite() {
                position
            } else {
                f64::NAN
            },
            velocity: finite_or_zero(velocity),
            kp_scale: gain_scale(kp_scale),
            kd_scale: gain_scale(kd_scale),
            maximum_torque: if maximum_torque.is_nan() {
                f64::INFINITY
            } else {
                maximum_torque.max(0.0)
            },
        }
    }

    /// Hold still with the given torque limit.
    pub fn zero_velocity(maximum_torque: f64) -> Self {
        Self::new(0.0, f64::NAN, 0.0, 1.0, 1.0, maximum_torque)
    }

    /// Whether a position target is set.
    pub fn has_position(&self) -> bool {
        !self.position.is_nan()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn gain_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// MeasuredState
// ---------------------------------------------------------------------------

/// Joint state measured at the start of the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasuredState {
    /// Position (rad).
    pub position: f64,
    /// Velocity (rad/s).
    pub velocity: f64,
}

impl MeasuredState {
    pub const fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }
}

// ---------------------------------------------------------------------------
// TorqueController
// ---------------------------------------------------------------------------

/// Firmware-style PD + feedforward torque loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TorqueController {
    /// Proportional gain (N·m/rad).
    pub kp: f64,
    /// Derivative gain (N·m·s/rad).
    pub kd: f64,
}

impl Default for TorqueController {
    fn default() -> Self {
        Self::new(20.0, 1.0)
    }
}

impl TorqueController {
    pub const fn new(kp: f64, kd: f64) -> Self {
        Self { kp, kd }
    }

    /// Torque to apply this cycle.
    ///
    /// `joint_maximum_torque` is the joint's own limit; the tighter of it and
    /// the target's limit wins.
    pub fn compute(
        &self,
        target: &TorqueTarget,
        measured: MeasuredState,
        friction: &FrictionModel,
        joint_maximum_torque: f64,
    ) -> f64 {
        let kp = self.kp * target.kp_scale;
        let kd = self.kd * target.kd_scale;

        let mut torque = kd.mul_add(
            target.velocity - measured.velocity,
            target.feedforward_torque,
        );
        if target.has_position() {
            torque = kp.mul_add(target.position - measured.position, torque);
        }
        torque += friction.compute(measured.velocity);

        let tau_max = target.maximum_torque.min(joint_maximum_torque).max(0.0);
        torque.clamp(-tau_max, tau_max)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use super::*;

    const EPS: f64 = 1e-12;

    // ---- TorqueTarget ----

    #[test]
    fn from_command_converts_units() {
        let cmd = PositionCommand::default()
            .with_position(0.5)
            .with_velocity(-1.0);
        let target = TorqueTarget::from_command(&cmd);
        assert!((target.position - TAU / 2.0).abs() < EPS);
        assert!((target.velocity + TAU).abs() < EPS);
        assert!(target.maximum_torque.is_infinite());
    }

    #[test]
    fn malformed_fields_are_defaulted() {
        let target = TorqueTarget::new(f64::NAN, f64::INFINITY, f64::NAN, f64::NAN, 3.0, -2.0);
        assert!(target.feedforward_torque.abs() < EPS);
        assert!(!target.has_position());
        assert!(target.velocity.abs() < EPS);
        assert!((target.kp_scale - 1.0).abs() < EPS);
        assert!((target.kd_scale - 1.0).abs() < EPS);
        assert!(target.maximum_torque.abs() < EPS);
    }

    #[test]
    fn zero_velocity_target() {
        let target = TorqueTarget::zero_velocity(2.0);
        assert!(!target.has_position());
        assert!(target.velocity.abs() < EPS);
        assert!((target.maximum_torque - 2.0).abs() < EPS);
    }

    // ---- TorqueController ----

    #[test]
    fn feedforward_passes_through_with_zero_gains() {
        let ctrl = TorqueController::new(20.0, 1.0);
        let target = TorqueTarget::new(0.42, 1.0, 3.0, 0.0, 0.0, f64::NAN);
        let torque = ctrl.compute(&target, MeasuredState::new(0.0, 0.0), &FrictionModel::none(), 16.0);
        assert!((torque - 0.42).abs() < EPS);
    }

    #[test]
    fn proportional_term_only_with_position() {
        let ctrl = TorqueController::new(20.0, 0.0);
        let measured = MeasuredState::new(0.1, 0.0);
        let with = TorqueTarget::new(0.0, 0.2, 0.0, 1.0, 1.0, f64::NAN);
        let without = TorqueTarget::new(0.0, f64::NAN, 0.0, 1.0, 1.0, f64::NAN);
        let friction = FrictionModel::none();
        assert!((ctrl.compute(&with, measured, &friction, 16.0) - 2.0).abs() < 1e-9);
        assert!(ctrl.compute(&without, measured, &friction, 16.0).abs() < EPS);
    }

    #[test]
    fn derivative_term_scaled() {
        let ctrl = TorqueController::new(0.0, 2.0);
        let target = TorqueTarget::new(0.0, f64::NAN, 1.0, 1.0, 0.5, f64::NAN);
        let torque = ctrl.compute(&target, MeasuredState::new(0.0, 0.0), &FrictionModel::none(), 16.0);
        assert!((torque - 1.0).abs() < EPS);
    }

    #[test]
    fn friction_opposes_measured_velocity() {
        let ctrl = TorqueController::default();
        let friction = FrictionModel::kinetic(0.1);
        let target = TorqueTarget::new(0.0, f64::NAN, 4.0, 1.0, 1.0, f64::NAN);
        let torque = ctrl.compute(&target, MeasuredState::new(0.0, 4.0), &friction, 1.0);
        assert!((torque - (-0.1)).abs() < EPS);

        let torque = ctrl.compute(&target, MeasuredState::new(0.0, 4.0), &FrictionModel::none(), 1.0);
        assert!(torque.abs() < EPS);
    }

    #[test]
    fn clamped_to_tighter_limit() {
        let ctrl = TorqueController::new(1000.0, 0.0);
        let friction = FrictionModel::none();
        let measured = MeasuredState::default();

        let loose = TorqueTarget::new(0.0, 1.0, 0.0, 1.0, 1.0, 50.0);
        assert!((ctrl.compute(&loose, measured, &friction, 16.0) - 16.0).abs() < EPS);

        let tight = TorqueTarget::new(0.0, -1.0, 0.0, 1.0, 1.0, 2.0);
        assert!((ctrl.compute(&tight, measured, &friction, 16.0) + 2.0).abs() < EPS);
    }

    #[test]
    fn zero_limit_yields_zero_torque() {
        let ctrl = TorqueController::default();
        let target = TorqueTarget::new(5.0, 1.0, 1.0, 1.0, 1.0, 0.0);
        let torque = ctrl.compute(&target, MeasuredState::default(), &FrictionModel::none(), 16.0);
        assert!(torque.abs() < EPS);
    }
}
