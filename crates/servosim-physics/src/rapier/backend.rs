//! [`RapierBackend`]: the physics backend built on `rapier3d`.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use nalgebra::{Isometry3, Point3, Vector3};
use rapier3d_f64::prelude::{RigidBody, RigidBodyHandle};
use servosim_urdf::RobotModel;
use tracing::{debug, info};

use crate::{
    backend::PhysicsBackend,
    error::PhysicsError,
    state::{BaseState, JointDrive, JointState, LinkMotion},
};

use super::{
    bridge::{register_robot, JointInfo, JointKind, RobotBodies},
    context::{EngineParameters, RapierContext},
};

/// Motor target velocity that keeps a torque motor saturated, so it always
/// applies its maximum force.
const SATURATED_VELOCITY: f64 = 1e10;
/// Motor damping of [`JointDrive::Brake`].
const BRAKE_DAMPING: f64 = 1e6;

// ---------------------------------------------------------------------------
// RapierBackend
// ---------------------------------------------------------------------------

/// Floating-base robot simulated by rapier, with an optional floor.
///
/// Joint torques go through force-based joint motors: a torque `τ` is a
/// velocity motor chasing an unreachable target with its force capped at
/// `|τ|`, and a brake chases zero velocity with the force capped at the
/// brake torque.
pub struct RapierBackend {
    context: RapierContext,
    robot: RobotBodies,
    params: EngineParameters,
    drives: HashMap<String, JointDrive>,
    /// Joint states after the last step.
    joints: HashMap<String, JointState>,
    /// Base state after the last step.
    base: BaseState,
    /// Contact points per link during the last step.
    contacts: HashMap<String, usize>,
    time: f64,
}

impl RapierBackend {
    /// Build the backend from a robot description, with the base at the
    /// world origin and every joint at zero.
    pub fn from_robot(robot: &RobotModel, params: EngineParameters) -> Result<Self, PhysicsError> {
        let mut context = RapierContext::new(&params)?;
        let bodies = register_robot(&mut context, robot)?;
        let mut backend = Self {
            drives: bodies
                .order
                .iter()
                .map(|joint| (joint.clone(), JointDrive::default()))
                .collect(),
            joints: bodies
                .order
                .iter()
                .map(|joint| (joint.clone(), JointState::default()))
                .collect(),
            contacts: bodies.links.keys().map(|link| (link.clone(), 0)).collect(),
            context,
            robot: bodies,
            params,
            base: BaseState::default(),
            time: 0.0,
        };
        for joint in backend.robot.order.clone() {
            backend.apply_drive(&joint, JointDrive::default());
        }
        backend.read_base();

        info!(
            robot = %robot.name,
            bodies = backend.context.rigid_body_set.len(),
            joints = backend.robot.joints.len(),
            dt = params.dt,
            floor = params.floor,
            "rapier backend ready"
        );
        Ok(backend)
    }

    pub const fn parameters(&self) -> &EngineParameters {
        &self.params
    }

    /// Set a joint position and velocity directly, moving its subtree.
    pub fn set_joint_state(
        &mut self,
        joint: &str,
        position: f64,
        velocity: f64,
    ) -> Result<(), PhysicsError> {
        self.actuated(joint)?;
        if let Some(state) = self.joints.get_mut(joint) {
            state.position = position;
            state.velocity = velocity;
        }
        let base = self.base;
        self.place_bodies(&base);
        Ok(())
    }

    fn actuated(&self, joint: &str) -> Result<&JointInfo, PhysicsError> {
        self.robot.joints.get(joint).ok_or_else(|| {
            if self.robot.fixed_joints.iter().any(|fixed| fixed == joint) {
                PhysicsError::FixedJoint(joint.into())
            } else {
                PhysicsError::UnknownJoint(joint.into())
            }
        })
    }

    fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.context.rigid_body_set.get(handle)
    }

    /// Velocity of a world point rigidly attached to a body.
    fn point_velocity(&self, handle: RigidBodyHandle, point: &Point3<f64>) -> Vector3<f64> {
        let Some(body) = self.body(handle) else {
            return Vector3::zeros();
        };
        let local_com = self.robot.local_com.get(&handle).copied().unwrap_or_else(Point3::origin);
        let com = body.position() * local_com;
        body.linvel() + body.angvel().cross(&(point - com))
    }

    fn apply_drive(&mut self, joint: &str, drive: JointDrive) {
        let Some(info) = self.robot.joints.get(joint) else {
            return;
        };
        let axis = info.kind.free_axis();
        let Some(impulse_joint) = self.context.impulse_joint_set.get_mut(info.handle, true) else {
            return;
        };
        let data = &mut impulse_joint.data;
        match drive {
            JointDrive::Torque(torque) if torque != 0.0 => {
                data.set_motor(axis, 0.0, torque.signum() * SATURATED_VELOCITY, 0.0, 1.0);
                data.set_motor_max_force(axis, torque.abs());
            }
            JointDrive::Torque(_) => {
                data.set_motor(axis, 0.0, 0.0, 0.0, 0.0);
                data.set_motor_max_force(axis, 0.0);
            }
            JointDrive::Brake => {
                data.set_motor_velocity(axis, 0.0, BRAKE_DAMPING);
                data.set_motor_max_force(axis, self.params.brake_torque);
            }
        }
    }

    // -----------------------------------------------------------------------
    // State readback
    // -----------------------------------------------------------------------

    fn read_base(&mut self) {
        let Some(root) = self.robot.root else {
            return;
        };
        let Some(body) = self.body(root) else {
            return;
        };
        let pose = *body.position();
        let angular_velocity = *body.angvel();
        let origin = Point3::from(pose.translation.vector);
        self.base = BaseState {
            pose,
            linear_velocity: self.point_velocity(root, &origin),
            angular_velocity: pose.rotation.inverse_transform_vector(&angular_velocity),
        };
    }

    /// Position and velocity of a joint from the poses of its two bodies.
    /// Revolute positions continue from `previous` across half turns.
    fn measure_joint(&self, info: &JointInfo, previous: f64) -> Option<(f64, f64)> {
        let parent = self.body(info.parent_body)?;
        let child = self.body(info.child_body)?;
        let frame = parent.position() * info.frame;
        let relative = frame.inverse() * child.position();
        let axis = frame.rotation * info.axis.into_inner();

        Some(match info.kind {
            JointKind::Revolute => {
                let rotation = relative.rotation;
                let angle = 2.0 * rotation.imag().dot(&info.axis.into_inner()).atan2(rotation.w);
                let turn = (angle - previous + PI).rem_euclid(TAU) - PI;
                (previous + turn, (child.angvel() - parent.angvel()).dot(&axis))
            }
            JointKind::Prismatic => {
                let origin = Point3::from(child.position().translation.vector);
                let velocity = self.point_velocity(info.child_body, &origin)
                    - self.point_velocity(info.parent_body, &origin);
                (relative.translation.vector.dot(&info.axis.into_inner()), velocity.dot(&axis))
            }
        })
    }

    fn read_joints(&mut self) {
        let mut joints = HashMap::with_capacity(self.joints.len());
        for name in &self.robot.order {
            let info = &self.robot.joints[name];
            let previous = self.joints.get(name).copied().unwrap_or_default();
            let (position, velocity) = self
                .measure_joint(info, previous.position)
                .unwrap_or((previous.position, previous.velocity));
            let torque = match self.drives.get(name) {
                Some(JointDrive::Torque(torque)) => *torque,
                Some(JointDrive::Brake) | None => 0.0,
            };
            joints.insert(
                name.clone(),
                JointState {
                    position,
                    velocity,
                    torque,
                },
            );
        }
        self.joints = joints;
    }

    fn read_contacts(&mut self) {
        for (link, count) in &mut self.contacts {
            *count = self.robot.colliders.get(link).map_or(0, |colliders| {
                colliders
                    .iter()
                    .map(|collider| self.context.floor_contacts(*collider))
                    .sum()
            });
        }
    }

    /// Move every body to match `base` and the current joint states.
    fn place_bodies(&mut self, base: &BaseState) {
        let Some(root) = self.robot.root else {
            return;
        };
        // Body frame pose, origin velocity and angular velocity, in world.
        let mut placed: HashMap<RigidBodyHandle, (Isometry3<f64>, Vector3<f64>, Vector3<f64>)> =
            HashMap::new();
        placed.insert(
            root,
            (base.pose, base.linear_velocity, base.angular_velocity_in_world()),
        );

        for name in &self.robot.order {
            let info = &self.robot.joints[name];
            let Some(&(parent_pose, parent_velocity, parent_rate)) = placed.get(&info.parent_body)
            else {
                continue;
            };
            let state = self.joints.get(name).copied().unwrap_or_default();
            let frame = parent_pose * info.frame;
            let axis = frame.rotation * info.axis.into_inner() * state.velocity;
            let pose = frame * info.motion(state.position);
            let lever = pose.translation.vector - parent_pose.translation.vector;
            let mut velocity = parent_velocity + parent_rate.cross(&lever);
            let mut rate = parent_rate;
            match info.kind {
                JointKind::Revolute => rate += axis,
                JointKind::Prismatic => velocity += axis,
            }
            placed.insert(info.child_body, (pose, velocity, rate));
        }

        for (handle, (pose, velocity, rate)) in placed {
            let local_com = self.robot.local_com.get(&handle).copied().unwrap_or_else(Point3::origin);
            let lever = (pose * local_com).coords - pose.translation.vector;
            if let Some(body) = self.context.rigid_body_set.get_mut(handle) {
                body.set_position(pose, true);
                body.set_linvel(velocity + rate.cross(&lever), true);
                body.set_angvel(rate, true);
            }
        }
    }
}

impl PhysicsBackend for RapierBackend {
    fn name(&self) -> &str {
        "rapier3d"
    }

    fn dt(&self) -> f64 {
        self.context.dt()
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn floor(&self) -> bool {
        self.context.floor()
    }

    fn set_floor(&mut self, enabled: bool) {
        self.context.set_floor(enabled);
        self.params.floor = enabled;
        if !enabled {
            self.contacts.values_mut().for_each(|count| *count = 0);
        }
    }

    fn set_joint_drive(&mut self, joint: &str, drive: JointDrive) -> Result<(), PhysicsError> {
        self.actuated(joint)?;
        self.apply_drive(joint, drive);
        self.drives.insert(joint.to_owned(), drive);
        Ok(())
    }

    fn joint_state(&self, joint: &str) -> Result<JointState, PhysicsError> {
        self.actuated(joint)?;
        Ok(self.joints.get(joint).copied().unwrap_or_default())
    }

    fn base_state(&self) -> &BaseState {
        &self.base
    }

    fn set_base_state(&mut self, state: BaseState) {
        self.place_bodies(&state);
        self.base = state;
    }

    fn link_motion(&self, link: &str) -> Result<LinkMotion, PhysicsError> {
        let frame = self
            .robot
            .links
            .get(link)
            .ok_or_else(|| PhysicsError::UnknownLink(link.into()))?;
        let body = self
            .body(frame.body)
            .ok_or_else(|| PhysicsError::UnknownLink(link.into()))?;
        let pose = body.position() * frame.offset;
        let origin = Point3::from(pose.translation.vector);
        Ok(LinkMotion {
            pose,
            linear_velocity: self.point_velocity(frame.body, &origin),
            angular_velocity: *body.angvel(),
        })
    }

    fn contact_points(&self, link: &str) -> Result<usize, PhysicsError> {
        self.contacts
            .get(link)
            .copied()
            .ok_or_else(|| PhysicsError::UnknownLink(link.into()))
    }

    fn step(&mut self) {
        self.context.step();
        self.time += self.context.dt();
        self.read_joints();
        self.read_base();
        self.read_contacts();
        debug!(
            time = self.time,
            z = self.base.pose.translation.z,
            contacts = self.contacts.values().sum::<usize>(),
            "step"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
