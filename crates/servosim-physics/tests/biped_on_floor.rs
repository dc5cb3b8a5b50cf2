//! Integration test: the wheeled biped on the floor plane.
//!
//! Drops the biped onto the floor with braked joints and checks that:
//! 1. It lands on its tires, a few millimetres from the touchdown height
//! 2. Only the tires touch the floor
//! 3. Driving both wheels forward spins them and carries the tires along +x
//! 4. Removing the floor lets the robot fall again
//!
//! The biped stands on two line contacts, balanced in pitch only by
//! symmetry, so every check runs over a short horizon.

use nalgebra::Isometry3;
use servosim_physics::prelude::*;
use servosim_test_utils::WHEELED_BIPED_URDF;

const DT: f64 = 0.001;
/// Base height at which the tires touch the floor with straight legs.
const TOUCHDOWN_HEIGHT: f64 = 0.37;
const WHEELS: [&str; 2] = ["left_wheel", "right_wheel"];
const TIRES: [&str; 2] = ["left_wheel_tire", "right_wheel_tire"];
const LEG_JOINTS: [&str; 4] = ["left_hip", "left_knee", "right_hip", "right_knee"];

fn dropped_biped(height: f64) -> RapierBackend {
    let robot = servosim_urdf::parse_string(WHEELED_BIPED_URDF).unwrap();
    let mut backend =
        RapierBackend::from_robot(&robot, EngineParameters::default().with_dt(DT)).unwrap();
    for joint in LEG_JOINTS.iter().chain(&WHEELS) {
        backend.set_joint_drive(joint, JointDrive::Brake).unwrap();
    }
    backend.set_base_state(BaseState {
        pose: Isometry3::translation(0.0, 0.0, height),
        ..BaseState::default()
    });
    backend
}

fn settle(backend: &mut RapierBackend, steps: usize) {
    for _ in 0..steps {
        backend.step();
    }
}

#[test]
fn biped_lands_on_its_tires() {
    let mut backend = dropped_biped(TOUCHDOWN_HEIGHT + 0.01);
    settle(&mut backend, 300);

    let base = backend.base_state();
    let z = base.pose.translation.z;
    assert!(z < TOUCHDOWN_HEIGHT + 1e-3, "{z}");
    assert!(z > TOUCHDOWN_HEIGHT - 0.01, "{z}");
    assert!(base.linear_velocity.z.abs() < 0.05);

    for tire in TIRES {
        assert!(backend.contact_points(tire).unwrap() > 0, "{tire}");
    }
    assert_eq!(backend.contact_points("base").unwrap(), 0);
    assert_eq!(backend.contact_points("left_shin").unwrap(), 0);
}

#[test]
fn braked_joints_hold_on_landing() {
    let mut backend = dropped_biped(TOUCHDOWN_HEIGHT + 0.01);
    settle(&mut backend, 300);
    for joint in LEG_JOINTS {
        let state = backend.joint_state(joint).unwrap();
        assert!(state.position.abs() < 0.01, "{joint}: {}", state.position);
    }
}

#[test]
fn driven_wheels_roll_forward() {
    let mut backend = dropped_biped(TOUCHDOWN_HEIGHT + 0.005);
    settle(&mut backend, 200);
    let start = backend.link_motion("left_wheel_tire").unwrap().pose.translation.x;

    for wheel in WHEELS {
        backend.set_joint_drive(wheel, JointDrive::Torque(0.2)).unwrap();
    }
    settle(&mut backend, 100);

    for wheel in WHEELS {
        let state = backend.joint_state(wheel).unwrap();
        assert!(state.velocity > 0.0, "{wheel}: {}", state.velocity);
        assert!((state.torque - 0.2).abs() < f64::EPSILON);
    }
    for tire in TIRES {
        let motion = backend.link_motion(tire).unwrap();
        assert!(motion.linear_velocity.x > 0.0, "{tire}: {}", motion.linear_velocity);
    }
    let end = backend.link_motion("left_wheel_tire").unwrap().pose.translation.x;
    assert!(end > start);
}

#[test]
fn floor_can_be_removed_after_landing() {
    let mut backend = dropped_biped(TOUCHDOWN_HEIGHT + 0.01);
    settle(&mut backend, 300);
    backend.set_floor(false);
    for tire in TIRES {
        assert_eq!(backend.contact_points(tire).unwrap(), 0);
    }
    let before = backend.base_state().pose.translation.z;
    settle(&mut backend, 10);
    assert!(backend.base_state().pose.translation.z < before);
    for tire in TIRES {
        assert_eq!(backend.contact_points(tire).unwrap(), 0);
    }
}
