// servosim-urdf: robot descriptions as an in-memory kinematic tree.
//
// `parse_file` and `parse_string` load URDF into a `RobotModel`. The
// physics engine builds its articulated bodies from it and the actuation
// interface reads joint friction and effort limits from it.

pub mod elements;
pub mod error;
pub mod model;
pub mod parser;

pub use elements::{
    Collision, Geometry, Inertial, JointData, JointDynamics, JointLimits, JointType, LinkData,
    Origin,
};
pub use error::UrdfError;
pub use model::RobotModel;
pub use parser::{parse_file, parse_string};
