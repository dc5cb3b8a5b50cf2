//! All rapier pipeline state, plus the floor plane.

use std::num::NonZeroUsize;

use nalgebra::Vector3;
use rapier3d_f64::prelude::{
    CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, Group,
    ImpulseJointSet, IntegrationParameters, InteractionGroups, IslandManager, MultibodyJointSet,
    NarrowPhase, PhysicsPipeline, RigidBodySet,
};
use tracing::debug;

use crate::error::PhysicsError;

/// Gauss-Seidel iterations of the single solver substep of each step.
const SOLVER_ITERATIONS: usize = 8;

/// Collision group of every robot collider.
pub const ROBOT_GROUP: Group = Group::GROUP_1;
/// Collision group of the floor plane.
pub const FLOOR_GROUP: Group = Group::GROUP_2;

// ---------------------------------------------------------------------------
// EngineParameters
// ---------------------------------------------------------------------------

/// Integration and contact settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineParameters {
    /// Fixed timestep (s).
    pub dt: f64,
    /// Gravity in the world frame (m/s²).
    pub gravity: Vector3<f64>,
    /// Whether the floor plane `z = 0` exists.
    pub floor: bool,
    /// Coulomb friction coefficient of the floor and of robot colliders.
    pub friction: f64,
    /// Largest torque a [`JointDrive::Brake`](crate::state::JointDrive::Brake)
    /// may apply (N·m or N).
    pub brake_torque: f64,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            dt: 0.001,
            gravity: Vector3::new(0.0, 0.0, -9.81),
            floor: true,
            friction: 1.0,
            brake_torque: 100.0,
        }
    }
}

impl EngineParameters {
    pub const fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub const fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    pub const fn with_floor(mut self, floor: bool) -> Self {
        self.floor = floor;
        self
    }

    pub const fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub const fn with_brake_torque(mut self, brake_torque: f64) -> Self {
        self.brake_torque = brake_torque;
        self
    }
}

// ---------------------------------------------------------------------------
// RapierContext
// ---------------------------------------------------------------------------

/// Rapier sets and pipeline objects.
///
/// `PhysicsPipeline::step()` borrows every set mutably at once, so they all
/// live together.
pub struct RapierContext {
    // -- Rapier sets --
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,

    // -- Pipeline objects --
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,

    // -- Parameters --
    pub integration_parameters: IntegrationParameters,
    pub gravity: Vector3<f64>,
    friction: f64,

    /// Floor collider, while the floor exists.
    floor: Option<ColliderHandle>,
}

impl RapierContext {
    /// Create an empty world.
    ///
    /// Each step runs a single solver substep, so an unconstrained body
    /// follows semi-implicit Euler exactly: velocity first, then position.
    pub fn new(params: &EngineParameters) -> Result<Self, PhysicsError> {
        if !params.dt.is_finite() || params.dt <= 0.0 {
            return Err(PhysicsError::InvalidTimestep(params.dt));
        }
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = params.dt;
        integration_parameters.num_solver_iterations = NonZeroUsize::MIN;
        integration_parameters.num_internal_pgs_iterations = SOLVER_ITERATIONS;

        let mut context = Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            integration_parameters,
            gravity: params.gravity,
            friction: params.friction,
            floor: None,
        };
        context.set_floor(params.floor);
        Ok(context)
    }

    pub const fn dt(&self) -> f64 {
        self.integration_parameters.dt
    }

    pub const fn friction(&self) -> f64 {
        self.friction
    }

    /// Collision groups of robot colliders: they only ever touch the floor.
    pub fn robot_groups() -> InteractionGroups {
        InteractionGroups::new(ROBOT_GROUP, FLOOR_GROUP)
    }

    pub const fn floor(&self) -> bool {
        self.floor.is_some()
    }

    /// Insert or remove the half-space `z <= 0`.
    pub fn set_floor(&mut self, enabled: bool) {
        match (enabled, self.floor) {
            (true, None) => {
                let plane = ColliderBuilder::halfspace(Vector3::z_axis())
                    .friction(self.friction)
                    .collision_groups(InteractionGroups::new(FLOOR_GROUP, ROBOT_GROUP))
                    .build();
                self.floor = Some(self.collider_set.insert(plane));
                debug!("floor added");
            }
            (false, Some(handle)) => {
                self.collider_set.remove(
                    handle,
                    &mut self.island_manager,
                    &mut self.rigid_body_set,
                    true,
                );
                self.floor = None;
                debug!("floor removed");
            }
            _ => {}
        }
    }

    /// Contact points between `collider` and the floor found by the last
    /// step.
    pub fn floor_contacts(&self, collider: ColliderHandle) -> usize {
        let Some(floor) = self.floor else {
            return 0;
        };
        self.narrow_phase
            .contact_pair(collider, floor)
            .map_or(0, |pair| {
                pair.manifolds
                    .iter()
                    .map(|manifold| manifold.data.solver_contacts.len())
                    .sum()
            })
    }

    /// Run one physics step.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use nalgebra::Isometry3;
    use rapier3d_f64::prelude::{ColliderBuilder, RigidBodyBuilder};

    use super::*;

    #[test]
    fn rejects_invalid_timestep() {
        for dt in [0.0, -0.001, f64::NAN] {
            let result = RapierContext::new(&EngineParameters::default().with_dt(dt));
            assert!(matches!(result, Err(PhysicsError::InvalidTimestep(_))));
        }
    }

    #[test]
    fn floor_toggles() {
        let mut context = RapierContext::new(&EngineParameters::default()).unwrap();
        assert!(context.floor());
        assert_eq!(context.collider_set.len(), 1);

        context.set_floor(false);
        assert!(!context.floor());
        assert!(context.collider_set.is_empty());

        context.set_floor(true);
        context.set_floor(true);
        assert_eq!(context.collider_set.len(), 1);
    }

    #[test]
    fn ball_resting_on_floor_has_contacts() {
        let mut context = RapierContext::new(&EngineParameters::default()).unwrap();
        let body = context.rigid_body_set.insert(
            RigidBodyBuilder::dynamic()
                .position(Isometry3::translation(0.0, 0.0, 0.1))
                .build(),
        );
        let ball = context.collider_set.insert_with_parent(
            ColliderBuilder::ball(0.1)
                .collision_groups(RapierContext::robot_groups())
                .build(),
            body,
            &mut context.rigid_body_set,
        );
        for _ in 0..100 {
            context.step();
        }
        assert!(context.floor_contacts(ball) > 0);
        let z = context.rigid_body_set[body].translation().z;
        assert!((z - 0.1).abs() < 5e-3, "{z}");

        context.set_floor(false);
        assert_eq!(context.floor_contacts(ball), 0);
    }
}
