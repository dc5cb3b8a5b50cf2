// servosim-sim: servo actuation and sensor emulation over a physics backend.
//
// `SimInterface` stands in for the servo bus of a real robot: it converts
// servo commands into joint torques, steps the simulation once per cycle,
// and reports servo replies, IMU readings and contact counts. `MockInterface`
// answers the same calls without any physics.

pub mod buffer;
pub mod contacts;
pub mod error;
pub mod imu;
pub mod interface;
pub mod mock_interface;
pub mod properties;
pub mod sim_interface;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        buffer::{ActuationBuffer, SERVO_NAMESPACE, observe_servos},
        contacts::ContactMonitor,
        error::SimError,
        imu::{IMU_NAMESPACE, ImuData},
        interface::{CycleCallback, Interface},
        mock_interface::MockInterface,
        properties::{JointProperties, joint_properties},
        sim_interface::SimInterface,
    };
}

pub use error::SimError;
pub use interface::Interface;
pub use sim_interface::SimInterface;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the prelude re-exports compile.
    #[test]
    fn prelude_exports() {
        use prelude::*;

        fn _accepts_interface(_: &dyn Interface) {}

        let _imu = ImuData::default();
        let _contacts = ContactMonitor::new();
        assert_eq!(SERVO_NAMESPACE, "servo");
        assert_eq!(IMU_NAMESPACE, "imu");
    }
}
