//! Robot description to rapier rigid bodies, colliders and impulse joints.
//!
//! Links joined by fixed joints are welded into one rigid body, carrying
//! their combined mass and all their colliders. Each actuated joint becomes
//! an impulse joint whose free axis is the x axis of both joint frames.

use std::collections::{HashMap, VecDeque};
use std::f64::consts::FRAC_PI_2;

use nalgebra::{Isometry3, Matrix3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use num_traits::Zero;
use rapier3d_f64::prelude::{
    ColliderBuilder, ColliderHandle, GenericJoint, GenericJointBuilder, ImpulseJointHandle,
    JointAxesMask, JointAxis, MassProperties, MotorModel, RigidBodyBuilder, RigidBodyHandle,
};
use servosim_urdf::{Collision, Geometry, Inertial, JointData, JointType, RobotModel};
use tracing::{debug, warn};

use crate::{error::PhysicsError, frames::origin_to_isometry};

use super::context::RapierContext;

/// Mass given to a body whose links carry no inertial (kg).
const PLACEHOLDER_MASS: f64 = 1e-3;
/// Principal inertia given alongside [`PLACEHOLDER_MASS`] (kg·m²).
const PLACEHOLDER_INERTIA: f64 = 1e-7;

// ---------------------------------------------------------------------------
// Registered robot
// ---------------------------------------------------------------------------

/// Rigid body carrying a link, and the link frame in that body's frame.
#[derive(Clone, Copy, Debug)]
pub struct LinkFrame {
    pub body: RigidBodyHandle,
    pub offset: Isometry3<f64>,
}

/// Motion allowed by an actuated joint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JointKind {
    Revolute,
    Prismatic,
}

impl JointKind {
    /// Free axis of the rapier joint.
    pub const fn free_axis(self) -> JointAxis {
        match self {
            Self::Revolute => JointAxis::AngX,
            Self::Prismatic => JointAxis::LinX,
        }
    }

    const fn locked_axes(self) -> JointAxesMask {
        match self {
            Self::Revolute => JointAxesMask::LOCKED_REVOLUTE_AXES,
            Self::Prismatic => JointAxesMask::LOCKED_PRISMATIC_AXES,
        }
    }
}

/// Per-joint metadata stored alongside the rapier handle.
#[derive(Clone, Copy, Debug)]
pub struct JointInfo {
    pub handle: ImpulseJointHandle,
    pub parent_body: RigidBodyHandle,
    pub child_body: RigidBodyHandle,
    /// Joint frame at zero position, in the parent body frame. The child
    /// body frame coincides with it at zero position.
    pub frame: Isometry3<f64>,
    /// Joint axis in the joint frame.
    pub axis: Unit<Vector3<f64>>,
    pub kind: JointKind,
}

impl JointInfo {
    /// Child body frame relative to the joint frame at `position`.
    pub fn motion(&self, position: f64) -> Isometry3<f64> {
        match self.kind {
            JointKind::Revolute => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, position),
            ),
            JointKind::Prismatic => Isometry3::translation(
                self.axis.x * position,
                self.axis.y * position,
                self.axis.z * position,
            ),
        }
    }
}

/// Handles of a robot registered in a [`RapierContext`].
#[derive(Clone, Debug, Default)]
pub struct RobotBodies {
    /// Body of the root link.
    pub root: Option<RigidBodyHandle>,
    pub links: HashMap<String, LinkFrame>,
    /// Actuated joints.
    pub joints: HashMap<String, JointInfo>,
    /// Actuated joint names, parents before children.
    pub order: Vec<String>,
    /// Fixed joint names.
    pub fixed_joints: Vec<String>,
    /// Center of mass of each body, in the body frame.
    pub local_com: HashMap<RigidBodyHandle, Point3<f64>>,
    /// Colliders of each link.
    pub colliders: HashMap<String, Vec<ColliderHandle>>,
}

// ---------------------------------------------------------------------------
// register_robot
// ---------------------------------------------------------------------------

/// Links welded into one rigid body.
struct Segment<'a> {
    /// World pose with the base at the origin and every joint at zero.
    pose: Isometry3<f64>,
    /// Links with their frame in the segment frame.
    links: Vec<(&'a str, Isometry3<f64>)>,
    /// Joint to the parent segment, with its frame in the parent segment.
    parent: Option<(usize, Isometry3<f64>, JointKind, &'a JointData)>,
}

/// Register a robot's links and joints with the rapier context.
///
/// Bodies are created with the base at the world origin and every joint at
/// zero.
pub fn register_robot(
    context: &mut RapierContext,
    model: &RobotModel,
) -> Result<RobotBodies, PhysicsError> {
    if model.total_mass() <= 0.0 {
        return Err(PhysicsError::MasslessRobot);
    }
    let segments = segment_tree(model)?;

    let friction = context.friction();
    let mut robot = RobotBodies::default();
    let mut bodies = Vec::with_capacity(segments.len());
    for segment in &segments {
        let (handle, local_com) = insert_segment_body(context, model, segment);
        robot.local_com.insert(handle, local_com);

        for &(link_name, offset) in &segment.links {
            robot.links.insert(
                link_name.to_owned(),
                LinkFrame {
                    body: handle,
                    offset,
                },
            );
            let colliders = model
                .links
                .get(link_name)
                .map(|link| link.collisions.as_slice())
                .unwrap_or_default()
                .iter()
                .filter_map(|collision| collider_for(collision, &offset, friction))
                .map(|collider| {
                    context.collider_set.insert_with_parent(
                        collider,
                        handle,
                        &mut context.rigid_body_set,
                    )
                })
                .collect();
            robot.colliders.insert(link_name.to_owned(), colliders);
        }
        bodies.push(handle);
    }
    robot.root = bodies.first().copied();

    for (index, segment) in segments.iter().enumerate() {
        let Some((parent, frame, kind, joint)) = &segment.parent else {
            continue;
        };
        let axis = joint_axis(joint)?;
        let data = build_rapier_joint(joint, *kind, frame, &axis);
        let handle =
            context
                .impulse_joint_set
                .insert(bodies[*parent], bodies[index], data, true);
        robot.joints.insert(
            joint.name.clone(),
            JointInfo {
                handle,
                parent_body: bodies[*parent],
                child_body: bodies[index],
                frame: *frame,
                axis,
                kind: *kind,
            },
        );
        robot.order.push(joint.name.clone());
    }
    robot.fixed_joints = model
        .joints
        .values()
        .filter(|joint| joint.joint_type == JointType::Fixed)
        .map(|joint| joint.name.clone())
        .collect();

    debug!(
        bodies = bodies.len(),
        joints = robot.joints.len(),
        colliders = robot.colliders.values().map(Vec::len).sum::<usize>(),
        "robot registered"
    );
    Ok(robot)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Group links into rigid segments, breadth first from the root.
fn segment_tree(model: &RobotModel) -> Result<Vec<Segment<'_>>, PhysicsError> {
    let root = model.root_link.as_str();
    let mut segments = vec![Segment {
        pose: Isometry3::identity(),
        links: vec![(root, Isometry3::identity())],
        parent: None,
    }];
    let mut queue = VecDeque::from([(root, 0, Isometry3::identity())]);

    while let Some((link, segment, offset)) = queue.pop_front() {
        for joint in model.child_joints(link) {
            let frame = offset * origin_to_isometry(&joint.origin);
            let kind = match joint.joint_type {
                JointType::Fixed => {
                    segments[segment].links.push((joint.child.as_str(), frame));
                    queue.push_back((joint.child.as_str(), segment, frame));
                    continue;
                }
                JointType::Revolute | JointType::Continuous => JointKind::Revolute,
                JointType::Prismatic => JointKind::Prismatic,
                other => {
                    return Err(PhysicsError::UnsupportedJoint {
                        name: joint.name.clone(),
                        kind: format!("{other:?}"),
                    })
                }
            };
            segments.push(Segment {
                pose: segments[segment].pose * frame,
                links: vec![(joint.child.as_str(), Isometry3::identity())],
                parent: Some((segment, frame, kind, joint)),
            });
            queue.push_back((joint.child.as_str(), segments.len() - 1, Isometry3::identity()));
        }
    }
    Ok(segments)
}

/// Insert the body of a segment and return it with its center of mass in
/// the body frame.
fn insert_segment_body(
    context: &mut RapierContext,
    model: &RobotModel,
    segment: &Segment<'_>,
) -> (RigidBodyHandle, Point3<f64>) {
    let mut mass = segment
        .links
        .iter()
        .filter_map(|(name, offset)| {
            let inertial = model.links.get(*name)?.inertial.as_ref()?;
            link_mass_properties(inertial).map(|m| m.transform_by(offset))
        })
        .fold(MassProperties::zero(), |total, m| total + m);
    if mass.mass() <= 0.0 {
        debug!(link = %segment.links[0].0, "massless segment, using placeholder inertia");
        mass = MassProperties::new(
            Point3::origin(),
            PLACEHOLDER_MASS,
            Vector3::repeat(PLACEHOLDER_INERTIA),
        );
    }

    let body = RigidBodyBuilder::dynamic()
        .position(segment.pose)
        .can_sleep(false)
        .additional_mass_properties(mass)
        .build();
    (context.rigid_body_set.insert(body), mass.local_com)
}

/// Mass properties of a URDF inertial, in the link frame.
fn link_mass_properties(inertial: &Inertial) -> Option<MassProperties> {
    if inertial.mass <= 0.0 {
        return None;
    }
    let [ixx, ixy, ixz, iyy, iyz, izz] = inertial.inertia;
    let inertia = Matrix3::new(ixx, ixy, ixz, ixy, iyy, iyz, ixz, iyz, izz);
    let frame = origin_to_isometry(&inertial.origin);
    let rotation = frame.rotation.to_rotation_matrix();
    let in_link = rotation.matrix() * inertia * rotation.matrix().transpose();
    Some(MassProperties::with_inertia_matrix(
        Point3::from(frame.translation.vector),
        inertial.mass,
        in_link,
    ))
}

/// Collider of a URDF collision element attached to a link at `offset` in
/// its body. Meshes are skipped.
fn collider_for(
    collision: &Collision,
    offset: &Isometry3<f64>,
    friction: f64,
) -> Option<rapier3d_f64::prelude::Collider> {
    let origin = offset * origin_to_isometry(&collision.origin);
    let (builder, position) = match &collision.geometry {
        Geometry::Sphere { radius } => (ColliderBuilder::ball(*radius), origin),
        Geometry::Box { size } => (
            ColliderBuilder::cuboid(size[0] / 2.0, size[1] / 2.0, size[2] / 2.0),
            origin,
        ),
        // Rapier cylinders extend along y, URDF cylinders along z.
        Geometry::Cylinder { radius, length } => (
            ColliderBuilder::cylinder(length / 2.0, *radius),
            origin * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
        ),
        Geometry::Mesh { filename, .. } => {
            warn!(%filename, "mesh collision geometry is not simulated");
            return None;
        }
    };
    Some(
        builder
            .position(position)
            .density(0.0)
            .friction(friction)
            .collision_groups(RapierContext::robot_groups())
            .build(),
    )
}

fn joint_axis(joint: &JointData) -> Result<Unit<Vector3<f64>>, PhysicsError> {
    let [x, y, z] = joint.axis;
    Unit::try_new(Vector3::new(x, y, z), 1e-12).ok_or_else(|| PhysicsError::ZeroAxis(joint.name.clone()))
}

/// Rotation taking the x axis onto `axis`.
fn x_onto(axis: &Unit<Vector3<f64>>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between_axis(&Vector3::x_axis(), axis)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::PI))
}

/// Build the rapier joint of an actuated URDF joint whose frame sits at
/// `frame` in the parent body.
fn build_rapier_joint(
    joint: &JointData,
    kind: JointKind,
    frame: &Isometry3<f64>,
    axis: &Unit<Vector3<f64>>,
) -> GenericJoint {
    let align = Isometry3::from_parts(Translation3::identity(), x_onto(axis));
    let free = kind.free_axis();
    let mut data = GenericJointBuilder::new(kind.locked_axes())
        .local_frame1(frame * align)
        .local_frame2(align)
        .contacts_enabled(false)
        .motor_model(free, MotorModel::ForceBased)
        .build();
    if joint.joint_type != JointType::Continuous {
        if let (Some(lower), Some(upper)) = (joint.limits.lower, joint.limits.upper) {
            data.set_limits(free, [lower, upper]);
        }
    }
    data
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
