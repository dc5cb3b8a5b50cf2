//! Loading URDF documents through `urdf-rs`.

use std::path::Path;

use crate::elements::{
    Collision, Geometry, Inertial, JointData, JointDynamics, JointLimits, JointType, LinkData,
    Origin,
};
use crate::error::UrdfError;
use crate::model::RobotModel;

/// Read and parse the robot description at `path`.
pub fn parse_file(path: impl AsRef<Path>) -> Result<RobotModel, UrdfError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|source| UrdfError::Io {
        path: path.to_owned(),
        source,
    })?;
    parse_string(&xml)
}

/// Parse a robot description held in memory.
pub fn parse_string(xml: &str) -> Result<RobotModel, UrdfError> {
    let robot = urdf_rs::read_from_string(xml).map_err(|e| UrdfError::Parse(e.to_string()))?;
    let links = robot
        .links
        .iter()
        .map(|link| (link.name.clone(), LinkData::from(link)))
        .collect();
    let joints = robot
        .joints
        .iter()
        .map(|joint| Ok((joint.name.clone(), JointData::try_from(joint)?)))
        .collect::<Result<_, UrdfError>>()?;
    RobotModel::assemble(robot.name, links, joints)
}

// ---------------------------------------------------------------------------
// urdf-rs conversions
// ---------------------------------------------------------------------------

impl From<&urdf_rs::Pose> for Origin {
    fn from(pose: &urdf_rs::Pose) -> Self {
        Self::new(*pose.xyz, *pose.rpy)
    }
}

impl From<&urdf_rs::Inertial> for Inertial {
    fn from(inertial: &urdf_rs::Inertial) -> Self {
        let t = &inertial.inertia;
        Self {
            origin: (&inertial.origin).into(),
            mass: inertial.mass.value,
            inertia: [t.ixx, t.ixy, t.ixz, t.iyy, t.iyz, t.izz],
        }
    }
}

impl From<&urdf_rs::Geometry> for Geometry {
    fn from(geometry: &urdf_rs::Geometry) -> Self {
        match geometry {
            urdf_rs::Geometry::Sphere { radius } => Self::Sphere { radius: *radius },
            urdf_rs::Geometry::Box { size } => Self::Box { size: **size },
            urdf_rs::Geometry::Cylinder { radius, length }
            | urdf_rs::Geometry::Capsule { radius, length } => Self::Cylinder {
                radius: *radius,
                length: *length,
            },
            urdf_rs::Geometry::Mesh { filename, scale } => Self::Mesh {
                filename: filename.clone(),
                scale: scale.as_ref().map_or([1.0; 3], |s| **s),
            },
        }
    }
}

impl From<&urdf_rs::Link> for LinkData {
    fn from(link: &urdf_rs::Link) -> Self {
        Self {
            name: link.name.clone(),
            inertial: Some((&link.inertial).into()),
            collisions: link
                .collision
                .iter()
                .map(|c| Collision {
                    name: c.name.clone(),
                    origin: (&c.origin).into(),
                    geometry: (&c.geometry).into(),
                })
                .collect(),
        }
    }
}

impl TryFrom<&urdf_rs::JointType> for JointType {
    type Error = UrdfError;

    fn try_from(joint_type: &urdf_rs::JointType) -> Result<Self, Self::Error> {
        Ok(match joint_type {
            urdf_rs::JointType::Revolute => Self::Revolute,
            urdf_rs::JointType::Continuous => Self::Continuous,
            urdf_rs::JointType::Prismatic => Self::Prismatic,
            urdf_rs::JointType::Fixed => Self::Fixed,
            urdf_rs::JointType::Floating => Self::Floating,
            urdf_rs::JointType::Planar => Self::Planar,
            urdf_rs::JointType::Spherical => {
                return Err(UrdfError::UnsupportedJointType("spherical".to_owned()));
            }
        })
    }
}

impl TryFrom<&urdf_rs::Joint> for JointData {
    type Error = UrdfError;

    fn try_from(joint: &urdf_rs::Joint) -> Result<Self, Self::Error> {
        let joint_type = JointType::try_from(&joint.joint_type)?;
        let limit = &joint.limit;
        // urdf-rs fills absent bounds with zeros.
        let bounded =
            joint_type != JointType::Continuous && (limit.upper - limit.lower).abs() > 0.0;
        Ok(Self {
            name: joint.name.clone(),
            joint_type,
            parent: joint.parent.link.clone(),
            child: joint.child.link.clone(),
            origin: (&joint.origin).into(),
            axis: *joint.axis.xyz,
            limits: JointLimits {
                lower: bounded.then_some(limit.lower),
                upper: bounded.then_some(limit.upper),
                effort: limit.effort,
                velocity: limit.velocity,
            },
            dynamics: joint
                .dynamics
                .as_ref()
                .map_or_else(JointDynamics::default, |d| JointDynamics {
                    damping: d.damping,
                    friction: d.friction,
                }),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SENSOR_ONLY_URDF: &str = r#"
        <robot name="imu_board">
            <link name="board"/>
        </robot>
    "#;

    const LEG_URDF: &str = r#"
        <robot name="leg">
            <link name="base">
                <inertial>
                    <mass value="1.0"/>
                    <inertia ixx="0.01" ixy="0" ixz="0" iyy="0.02" iyz="0" izz="0.03"/>
                </inertial>
            </link>
            <link name="shin">
                <inertial>
                    <origin xyz="0 0 -0.06" rpy="0 0 0"/>
                    <mass value="0.5"/>
                    <inertia ixx="0.001" ixy="0" ixz="0" iyy="0.001" iyz="0" izz="0.0005"/>
                </inertial>
            </link>
            <link name="wheel_tire">
                <inertial>
                    <mass value="0.3"/>
                    <inertia ixx="0.0003" ixy="0" ixz="0" iyy="0.00054" iyz="0" izz="0.0003"/>
                </inertial>
                <collision name="tire">
                    <origin xyz="0 0 0" rpy="1.5707963267948966 0 0"/>
                    <geometry>
                        <cylinder radius="0.06" length="0.03"/>
                    </geometry>
                </collision>
            </link>
            <link name="imu"/>
            <joint name="knee" type="revolute">
                <parent link="base"/>
                <child link="shin"/>
                <origin xyz="0 0.1 -0.1" rpy="0 0 0"/>
                <axis xyz="0 1 0"/>
                <limit lower="-1.57" upper="1.57" effort="16" velocity="10"/>
                <dynamics damping="0.01" friction="0.05"/>
            </joint>
            <joint name="wheel" type="continuous">
                <parent link="shin"/>
                <child link="wheel_tire"/>
                <origin xyz="0 0 -0.12" rpy="0 0 0"/>
                <axis xyz="0 1 0"/>
                <limit effort="1.7" velocity="100"/>
            </joint>
            <joint name="imu_mount" type="fixed">
                <parent link="base"/>
                <child link="imu"/>
                <origin xyz="0 0 0.05" rpy="0 3.141592653589793 0"/>
            </joint>
        </robot>
    "#;

    #[test]
    fn single_link_robot() {
        let model = parse_string(SENSOR_ONLY_URDF).unwrap();
        assert_eq!(model.name, "imu_board");
        assert_eq!(model.root_link, "board");
        assert_eq!(model.dof(), 0);
        assert!(model.link("board").unwrap().collisions.is_empty());
    }

    #[test]
    fn leg_counts() {
        let model = parse_string(LEG_URDF).unwrap();
        assert_eq!(model.name, "leg");
        assert_eq!(model.links.len(), 4);
        assert_eq!(model.joints.len(), 3);
        assert_eq!(model.dof(), 2);
        assert_eq!(model.root_link, "base");
        assert!((model.total_mass() - 1.8).abs() < 1e-12);
    }

    #[test]
    fn joint_kinds() {
        let model = parse_string(LEG_URDF).unwrap();
        assert_eq!(model.joint("knee").unwrap().joint_type, JointType::Revolute);
        assert_eq!(model.joint("wheel").unwrap().joint_type, JointType::Continuous);
        assert_eq!(model.joint("imu_mount").unwrap().joint_type, JointType::Fixed);
    }

    #[test]
    fn knee_limits() {
        let model = parse_string(LEG_URDF).unwrap();
        let lim = &model.joint("knee").unwrap().limits;
        assert!((lim.lower.unwrap() - (-1.57)).abs() < 1e-12);
        assert!((lim.upper.unwrap() - 1.57).abs() < 1e-12);
        assert!((lim.effort - 16.0).abs() < f64::EPSILON);
        assert!((lim.velocity - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wheel_is_unbounded() {
        let model = parse_string(LEG_URDF).unwrap();
        let lim = &model.joint("wheel").unwrap().limits;
        assert!(lim.lower.is_none());
        assert!(lim.upper.is_none());
        assert!((lim.effort - 1.7).abs() < f64::EPSILON);
    }

    #[test]
    fn friction_and_damping() {
        let model = parse_string(LEG_URDF).unwrap();
        let knee = model.joint("knee").unwrap();
        assert!((knee.dynamics.damping - 0.01).abs() < f64::EPSILON);
        assert!((knee.dynamics.friction - 0.05).abs() < f64::EPSILON);
        let wheel = model.joint("wheel").unwrap();
        assert!(wheel.dynamics.friction.abs() < f64::EPSILON);
    }

    #[test]
    fn mount_frames() {
        let model = parse_string(LEG_URDF).unwrap();
        let knee = model.joint("knee").unwrap();
        assert!((knee.axis[1] - 1.0).abs() < f64::EPSILON);
        assert!((knee.origin.xyz[2] + 0.1).abs() < f64::EPSILON);
        let mount = model.joint("imu_mount").unwrap();
        assert!((mount.origin.rpy[1] - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(mount.parent, "base");
        assert_eq!(mount.child, "imu");
    }

    #[test]
    fn shin_inertia() {
        let model = parse_string(LEG_URDF).unwrap();
        let shin = model.link("shin").unwrap().inertial.as_ref().unwrap();
        assert!((shin.mass - 0.5).abs() < f64::EPSILON);
        assert!((shin.origin.xyz[2] + 0.06).abs() < f64::EPSILON);
        let base = model.link("base").unwrap().inertial.as_ref().unwrap();
        assert!((base.inertia[3] - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn tire_is_a_cylinder() {
        let model = parse_string(LEG_URDF).unwrap();
        let tire = model.link("wheel_tire").unwrap();
        assert_eq!(tire.collisions.len(), 1);
        assert_eq!(tire.collisions[0].name.as_deref(), Some("tire"));
        match &tire.collisions[0].geometry {
            Geometry::Cylinder { radius, length } => {
                assert!((radius - 0.06).abs() < f64::EPSILON);
                assert!((length - 0.03).abs() < f64::EPSILON);
            }
            other => panic!("tire geometry: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_string("<not valid urdf>"),
            Err(UrdfError::Parse(_))
        ));
    }

    #[test]
    fn unreadable_file() {
        let err = parse_file("/nonexistent/robot.urdf").unwrap_err();
        assert!(matches!(err, UrdfError::Io { .. }));
    }

    #[test]
    fn joint_to_missing_link() {
        let xml = r#"
            <robot name="broken">
                <link name="base"/>
                <joint name="j" type="fixed">
                    <parent link="base"/>
                    <child link="ghost"/>
                </joint>
            </robot>
        "#;
        assert!(matches!(parse_string(xml), Err(UrdfError::MissingLink(l)) if l == "ghost"));
    }

    #[test]
    fn spherical_joint_rejected() {
        let xml = r#"
            <robot name="ball">
                <link name="base"/>
                <link name="arm"/>
                <joint name="shoulder" type="spherical">
                    <parent link="base"/>
                    <child link="arm"/>
                </joint>
            </robot>
        "#;
        assert!(matches!(
            parse_string(xml),
            Err(UrdfError::UnsupportedJointType(t)) if t == "spherical"
        ));
    }

    #[test]
    fn disconnected_links_rejected() {
        let xml = r#"
            <robot name="two_roots">
                <link name="a"/>
                <link name="b"/>
            </robot>
        "#;
        assert!(matches!(
            parse_string(xml),
            Err(UrdfError::MultipleRootLinks(roots)) if roots == vec!["a", "b"]
        ));
    }
}
