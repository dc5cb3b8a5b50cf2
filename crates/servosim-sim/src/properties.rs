//! Per-joint actuator properties.

use std::collections::BTreeMap;

use servosim_actuator_core::friction::FrictionModel;
use servosim_urdf::{JointData, RobotModel};
use tracing::warn;

use crate::error::SimError;

/// Friction and torque limit of one actuated joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointProperties {
    /// Kinetic friction torque (N·m).
    pub friction: f64,
    /// Maximum torque the servo can produce (N·m).
    pub maximum_torque: f64,
}

impl JointProperties {
    /// Properties from the robot description. `friction` overrides the
    /// description's friction when given.
    ///
    /// The description's effort limit must be positive.
    pub fn from_joint(joint: &JointData, friction: Option<f64>) -> Result<Self, SimError> {
        let maximum_torque = joint.limits.effort;
        if maximum_torque.is_nan() || maximum_torque <= 0.0 {
            return Err(SimError::NonPositiveTorqueLimit {
                joint: joint.name.clone(),
                effort: maximum_torque,
            });
        }
        Ok(Self {
            friction: friction.unwrap_or(joint.dynamics.friction).max(0.0),
            maximum_torque,
        })
    }

    pub const fn friction_model(&self) -> FrictionModel {
        FrictionModel::kinetic(self.friction)
    }
}

/// Properties of every actuated joint of `model`, with friction overrides.
///
/// Overrides naming a joint that is not actuated are ignored.
pub fn joint_properties(
    model: &RobotModel,
    friction_overrides: &BTreeMap<String, f64>,
) -> Result<BTreeMap<String, JointProperties>, SimError> {
    for joint in friction_overrides.keys() {
        if !matches!(model.joint(joint), Ok(j) if j.joint_type.is_actuated()) {
            warn!(joint = %joint, "ignoring friction of a joint that is not actuated");
        }
    }
    model
        .actuated_joints()
        .map(|joint| {
            let friction = friction_overrides.get(&joint.name).copied();
            JointProperties::from_joint(joint, friction).map(|p| (joint.name.clone(), p))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use servosim_test_utils::WHEELED_BIPED_URDF;
    use servosim_urdf::parse_string;

    use super::*;

    #[test]
    fn properties_from_description() {
        let model = parse_string(WHEELED_BIPED_URDF).unwrap();
        let props = joint_properties(&model, &BTreeMap::new()).unwrap();
        assert_eq!(props.len(), 6);
        assert!(!props.contains_key("imu_joint"));
        assert!((props["left_hip"].maximum_torque - 16.0).abs() < f64::EPSILON);
        assert!((props["right_wheel"].maximum_torque - 1.7).abs() < f64::EPSILON);
        assert!(props.values().all(|p| p.friction.abs() < f64::EPSILON));
    }

    #[test]
    fn friction_override() {
        let model = parse_string(WHEELED_BIPED_URDF).unwrap();
        let overrides = BTreeMap::from([
            ("left_wheel".to_owned(), 0.1),
            ("imu_joint".to_owned(), 3.0),
            ("tail".to_owned(), 1.0),
        ]);
        let props = joint_properties(&model, &overrides).unwrap();
        assert!((props["left_wheel"].friction - 0.1).abs() < f64::EPSILON);
        assert!(props["right_wheel"].friction.abs() < f64::EPSILON);
        assert!(!props.contains_key("tail"));
    }

    #[test]
    fn zero_effort_limit_is_rejected() {
        let urdf = WHEELED_BIPED_URDF.replacen(r#"effort="1.7""#, r#"effort="0""#, 1);
        let model = parse_string(&urdf).unwrap();
        let err = joint_properties(&model, &BTreeMap::new()).unwrap_err();
        assert!(
            matches!(&err, SimError::NonPositiveTorqueLimit { joint, .. } if joint == "left_wheel"),
            "{err}"
        );
    }

    #[test]
    fn friction_model_opposes_motion() {
        let props = JointProperties {
            friction: 0.1,
            maximum_torque: 1.0,
        };
        assert!((props.friction_model().compute(2.0) + 0.1).abs() < f64::EPSILON);
    }
}
