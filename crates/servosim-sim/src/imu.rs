//! IMU synthesis from the ground-truth motion of the IMU link.
//!
//! Orientation is reported in the ARS frame of the IMU filter, angular
//! velocity and linear acceleration in the IMU frame. Linear acceleration is
//! the finite difference of the IMU link velocity between two reads, so it
//! carries gravity during free fall and reads zero at rest on the floor.

use nalgebra::{UnitQuaternion, Vector3};
use servosim_core::Dictionary;
use servosim_physics::{
    frames::{orientation_imu_in_ars, rotation_world_to_ars, world_to_frame},
    state::LinkMotion,
};

/// Observation namespace of IMU readings.
pub const IMU_NAMESPACE: &str = "imu";

/// Latest IMU readings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuData {
    /// Orientation of the IMU frame in the ARS frame.
    pub orientation_imu_in_ars: UnitQuaternion<f64>,
    /// Angular velocity of the IMU, in the IMU frame (rad/s).
    pub angular_velocity_imu_in_imu: Vector3<f64>,
    /// Linear acceleration of the IMU, in the IMU frame (m/s²).
    pub linear_acceleration_imu_in_imu: Vector3<f64>,
    /// Linear velocity of the IMU, in the world frame (m/s). Not measurable
    /// by a real IMU.
    pub linear_velocity_imu_in_world: Vector3<f64>,
}

impl Default for ImuData {
    fn default() -> Self {
        Self {
            orientation_imu_in_ars: UnitQuaternion::identity(),
            angular_velocity_imu_in_imu: Vector3::zeros(),
            linear_acceleration_imu_in_imu: Vector3::zeros(),
            linear_velocity_imu_in_world: Vector3::zeros(),
        }
    }
}

impl ImuData {
    /// Readings for the given link motion, without
    /// acceleration history.
    pub fn initial(
        imu: &LinkMotion,
        orientation_base_in_world: &UnitQuaternion<f64>,
        rotation_imu_to_base: &UnitQuaternion<f64>,
    ) -> Self {
        let mut data = Self {
            linear_velocity_imu_in_world: imu.linear_velocity,
            ..Self::default()
        };
        data.set_attitude(imu, orientation_base_in_world, rotation_imu_to_base);
        data
    }

    fn set_attitude(
        &mut self,
        imu: &LinkMotion,
        orientation_base_in_world: &UnitQuaternion<f64>,
        rotation_imu_to_base: &UnitQuaternion<f64>,
    ) {
        self.orientation_imu_in_ars =
            orientation_imu_in_ars(orientation_base_in_world, rotation_imu_to_base);
        self.angular_velocity_imu_in_imu = world_to_frame(&imu.pose.rotation, &imu.angular_velocity);
    }

    /// Update from the IMU link motion after a step of `dt` seconds.
    pub fn update(
        &mut self,
        imu: &LinkMotion,
        orientation_base_in_world: &UnitQuaternion<f64>,
        rotation_imu_to_base: &UnitQuaternion<f64>,
        dt: f64,
    ) {
        let acceleration_in_world = (imu.linear_velocity - self.linear_velocity_imu_in_world) / dt;
        self.linear_acceleration_imu_in_imu = world_to_frame(&imu.pose.rotation, &acceleration_in_world);
        self.linear_velocity_imu_in_world = imu.linear_velocity;
        self.set_attitude(imu, orientation_base_in_world, rotation_imu_to_base);
    }

    /// Orientation of the IMU frame in the world frame.
    pub fn orientation_imu_in_world(&self) -> UnitQuaternion<f64> {
        rotation_world_to_ars().inverse() * self.orientation_imu_in_ars
    }

    /// Write `imu.{orientation, angular_velocity, linear_acceleration}`.
    pub fn write(&self, observation: &mut Dictionary) {
        let output = observation.child_mut(IMU_NAMESPACE);
        output.insert("orientation", self.orientation_imu_in_ars);
        output.insert("angular_velocity", self.angular_velocity_imu_in_imu);
        output.insert("linear_acceleration", self.linear_acceleration_imu_in_imu);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
