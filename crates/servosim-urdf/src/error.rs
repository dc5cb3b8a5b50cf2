//! Failures while loading a robot description.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum UrdfError {
    #[error("cannot read robot description {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The XML is malformed or is not a URDF document.
    #[error("invalid robot description: {0}")]
    Parse(String),

    #[error("robot description has no link named {0:?}")]
    MissingLink(String),

    #[error("robot description has no joint named {0:?}")]
    MissingJoint(String),

    #[error("{0} joints are not supported")]
    UnsupportedJointType(String),

    /// Every link is the child of some joint, so the tree has a cycle.
    #[error("kinematic tree has no root link")]
    NoRootLink,

    /// Links that are nobody's child, in name order.
    #[error("kinematic tree is disconnected, root candidates: {}", .0.join(", "))]
    MultipleRootLinks(Vec<String>),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
