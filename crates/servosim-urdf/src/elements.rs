//! Links, joints and the geometric pieces they are made of.

/// Kind of motion a joint allows between its parent and child links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    Revolute,
    /// Revolute without position limits, e.g. a wheel.
    Continuous,
    Prismatic,
    Fixed,
    Floating,
    Planar,
}

impl JointType {
    /// One degree of freedom that a servo can drive.
    pub const fn is_actuated(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous | Self::Prismatic)
    }

    /// Joint coordinates are angles (rad) rather than lengths (m).
    pub const fn is_rotational(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous)
    }
}

/// Range of travel and actuator capability of a joint.
///
/// Position bounds are absent on continuous joints and on joints whose
/// description leaves them unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointLimits {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// Peak torque (N·m) or force (N).
    pub effort: f64,
    pub velocity: f64,
}

impl JointLimits {
    /// Whether `position` lies within the bounds that are set.
    pub fn contains(&self, position: f64) -> bool {
        self.lower.map_or(true, |lower| position >= lower)
            && self.upper.map_or(true, |upper| position <= upper)
    }
}

/// Passive joint losses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointDynamics {
    /// Viscous coefficient, N·m·s/rad.
    pub damping: f64,
    /// Dry friction torque, N·m.
    pub friction: f64,
}

/// Placement of a frame in its parent: translation, then fixed-axis
/// roll-pitch-yaw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Origin {
    pub xyz: [f64; 3],
    pub rpy: [f64; 3],
}

impl Origin {
    pub const fn new(xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        Self { xyz, rpy }
    }

    pub fn is_identity(&self) -> bool {
        self.xyz.iter().chain(&self.rpy).all(|v| v.abs() < f64::EPSILON)
    }
}

/// Mass distribution of a link. The inertia tensor
/// `[ixx, ixy, ixz, iyy, iyz, izz]` is taken about the center of mass,
/// expressed in the `origin` frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inertial {
    pub origin: Origin,
    pub mass: f64,
    pub inertia: [f64; 6],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Sphere { radius: f64 },
    Box { size: [f64; 3] },
    /// Extends `length / 2` either side of the origin along local z.
    /// Capsules are loaded as cylinders.
    Cylinder { radius: f64, length: f64 },
    Mesh { filename: String, scale: [f64; 3] },
}

/// A shape that can touch the floor.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub name: Option<String>,
    pub origin: Origin,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkData {
    pub name: String,
    pub inertial: Option<Inertial>,
    pub collisions: Vec<Collision>,
}

impl LinkData {
    /// A massless link with no collision shapes, e.g. a sensor frame.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inertial: None,
            collisions: Vec::new(),
        }
    }

    pub fn mass(&self) -> f64 {
        self.inertial.as_ref().map_or(0.0, |inertial| inertial.mass)
    }
}

/// A joint between two links.
///
/// `origin` places the joint frame in the parent link frame; at zero
/// displacement the child link frame is the joint frame. `axis` is a unit
/// vector in the joint frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JointData {
    pub name: String,
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    pub origin: Origin,
    pub axis: [f64; 3],
    pub limits: JointLimits,
    pub dynamics: JointDynamics,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
