//! Reference frames and the pure transforms between them.
//!
//! - **world**: +z up, gravity along -z.
//! - **base**: the root link frame of the robot.
//! - **imu**: the frame of the link carrying the IMU.
//! - **ars**: attitude reference frame of the IMU filter, +x forward, +y
//!   right, +z down. It is the world frame turned upside down about x.

use nalgebra::{Isometry3, Matrix4, Quaternion, Translation3, UnitQuaternion, Vector3};
use servosim_urdf::Origin;

/// Rotation from the world frame to the ARS frame, `diag(1, -1, -1)`.
pub fn rotation_world_to_ars() -> UnitQuaternion<f64> {
    // Half-turn about x, exact.
    UnitQuaternion::new_unchecked(Quaternion::new(0.0, 1.0, 0.0, 0.0))
}

/// `R_world_to_ars · R_base_to_world · R_imu_to_base`.
pub fn orientation_imu_in_ars(
    orientation_base_in_world: &UnitQuaternion<f64>,
    rotation_imu_to_base: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    rotation_world_to_ars() * orientation_base_in_world * rotation_imu_to_base
}

/// Rotation of `frame` relative to `reference`, both given in the world.
pub fn relative_rotation(
    reference_in_world: &Isometry3<f64>,
    frame_in_world: &Isometry3<f64>,
) -> UnitQuaternion<f64> {
    reference_in_world.rotation.inverse() * frame_in_world.rotation
}

/// Express a world-frame vector in a frame with the given orientation.
pub fn world_to_frame(
    orientation_frame_in_world: &UnitQuaternion<f64>,
    vector_in_world: &Vector3<f64>,
) -> Vector3<f64> {
    orientation_frame_in_world.inverse_transform_vector(vector_in_world)
}

/// 4×4 homogeneous matrix of a rigid transform.
pub fn homogeneous(transform: &Isometry3<f64>) -> Matrix4<f64> {
    transform.to_homogeneous()
}

/// URDF roll-pitch-yaw (fixed X, Y, Z axes) to a rotation.
pub fn rpy_to_rotation(rpy: &[f64; 3]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2])
}

/// URDF origin to a rigid transform.
pub fn origin_to_isometry(origin: &Origin) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(origin.xyz[0], origin.xyz[1], origin.xyz[2]),
        rpy_to_rotation(&origin.rpy),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
