//! The kinematic tree of a robot.

use std::collections::{BTreeMap, BTreeSet};

use crate::elements::{JointData, LinkData};
use crate::error::UrdfError;

/// A robot as a tree of links connected by joints.
///
/// Links and joints are kept in name order so that walking the tree visits
/// them in the same order on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotModel {
    pub name: String,
    pub links: BTreeMap<String, LinkData>,
    pub joints: BTreeMap<String, JointData>,
    /// The only link that is not the child of a joint.
    pub root_link: String,
}

impl RobotModel {
    /// Check that `joints` connect `links` into a single tree and find its
    /// root.
    pub fn assemble(
        name: impl Into<String>,
        links: BTreeMap<String, LinkData>,
        joints: BTreeMap<String, JointData>,
    ) -> Result<Self, UrdfError> {
        if let Some(dangling) = joints
            .values()
            .flat_map(|joint| [&joint.parent, &joint.child])
            .find(|link| !links.contains_key(link.as_str()))
        {
            return Err(UrdfError::MissingLink(dangling.clone()));
        }

        let children: BTreeSet<&str> = joints.values().map(|j| j.child.as_str()).collect();
        let mut roots = links.keys().filter(|link| !children.contains(link.as_str()));
        let root_link = match (roots.next(), roots.next()) {
            (None, _) => return Err(UrdfError::NoRootLink),
            (Some(root), None) => root.clone(),
            (Some(first), Some(second)) => {
                let mut all = vec![first.clone(), second.clone()];
                all.extend(roots.cloned());
                return Err(UrdfError::MultipleRootLinks(all));
            }
        };

        Ok(Self {
            name: name.into(),
            links,
            joints,
            root_link,
        })
    }

    pub fn link(&self, name: &str) -> Result<&LinkData, UrdfError> {
        self.links
            .get(name)
            .ok_or_else(|| UrdfError::MissingLink(name.to_owned()))
    }

    pub fn joint(&self, name: &str) -> Result<&JointData, UrdfError> {
        self.joints
            .get(name)
            .ok_or_else(|| UrdfError::MissingJoint(name.to_owned()))
    }

    /// Joints a servo can drive, in name order.
    pub fn actuated_joints(&self) -> impl Iterator<Item = &JointData> {
        self.joints.values().filter(|j| j.joint_type.is_actuated())
    }

    pub fn dof(&self) -> usize {
        self.actuated_joints().count()
    }

    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.keys().map(String::as_str).collect()
    }

    pub fn actuated_joint_names(&self) -> Vec<&str> {
        self.actuated_joints().map(|j| j.name.as_str()).collect()
    }

    /// Joints hanging off `link`.
    pub fn child_joints<'a>(&'a self, link: &'a str) -> impl Iterator<Item = &'a JointData> + 'a {
        self.joints.values().filter(move |j| j.parent == link)
    }

    /// The joint `link` hangs from. `None` for the root.
    pub fn parent_joint(&self, link: &str) -> Option<&JointData> {
        self.joints.values().find(|j| j.child == link)
    }

    /// Total mass in kg.
    pub fn total_mass(&self) -> f64 {
        self.links.values().map(LinkData::mass).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
