//! Wheeled biped fixture.
//!
//! A 1 kg body with two legs, each a hip and a knee pitching about `y` and a
//! wheel at the foot. The IMU is mounted upside down on top of the body. With
//! every joint at zero the tire bottoms sit 0.37 m below the base origin.

use std::path::PathBuf;

use servosim_actuator_core::layout::ServoLayout;

/// URDF of the wheeled biped.
pub const WHEELED_BIPED_URDF: &str = r#"<?xml version="1.0"?>
<robot name="wheeled_biped">
  <link name="base">
    <inertial>
      <mass value="1.0"/>
      <inertia ixx="0.0025" ixy="0" ixz="0" iyy="0.0017" iyz="0" izz="0.0027"/>
    </inertial>
  </link>

  <link name="imu"/>
  <joint name="imu_joint" type="fixed">
    <parent link="base"/>
    <child link="imu"/>
    <origin xyz="0 0 0.05" rpy="0 3.141592653589793 0"/>
  </joint>

  <!-- Left leg -->
  <link name="left_thigh">
    <inertial>
      <origin xyz="0 0 -0.065"/>
      <mass value="0.5"/>
      <inertia ixx="0.0008" ixy="0" ixz="0" iyy="0.0008" iyz="0" izz="0.0002"/>
    </inertial>
  </link>
  <joint name="left_hip" type="revolute">
    <parent link="base"/>
    <child link="left_thigh"/>
    <origin xyz="0 0.06 -0.05"/>
    <axis xyz="0 1 0"/>
    <limit lower="-1.6" upper="1.6" effort="16" velocity="10"/>
  </joint>
  <link name="left_shin">
    <inertial>
      <origin xyz="0 0 -0.065"/>
      <mass value="0.5"/>
      <inertia ixx="0.0008" ixy="0" ixz="0" iyy="0.0008" iyz="0" izz="0.0002"/>
    </inertial>
  </link>
  <joint name="left_knee" type="revolute">
    <parent link="left_thigh"/>
    <child link="left_shin"/>
    <origin xyz="0 0 -0.13"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.5" upper="2.5" effort="16" velocity="10"/>
  </joint>
  <link name="left_wheel_tire">
    <inertial>
      <mass value="0.3"/>
      <inertia ixx="0.0003" ixy="0" ixz="0" iyy="0.00054" iyz="0" izz="0.0003"/>
    </inertial>
    <collision>
      <origin rpy="1.5707963267948966 0 0"/>
      <geometry><cylinder radius="0.06" length="0.03"/></geometry>
    </collision>
  </link>
  <joint name="left_wheel" type="continuous">
    <parent link="left_shin"/>
    <child link="left_wheel_tire"/>
    <origin xyz="0 0 -0.13"/>
    <axis xyz="0 1 0"/>
    <limit effort="1.7" velocity="100"/>
  </joint>

  <!-- Right leg -->
  <link name="right_thigh">
    <inertial>
      <origin xyz="0 0 -0.065"/>
      <mass value="0.5"/>
      <inertia ixx="0.0008" ixy="0" ixz="0" iyy="0.0008" iyz="0" izz="0.0002"/>
    </inertial>
  </link>
  <joint name="right_hip" type="revolute">
    <parent link="base"/>
    <child link="right_thigh"/>
    <origin xyz="0 -0.06 -0.05"/>
    <axis xyz="0 1 0"/>
    <limit lower="-1.6" upper="1.6" effort="16" velocity="10"/>
  </joint>
  <link name="right_shin">
    <inertial>
      <origin xyz="0 0 -0.065"/>
      <mass value="0.5"/>
      <inertia ixx="0.0008" ixy="0" ixz="0" iyy="0.0008" iyz="0" izz="0.0002"/>
    </inertial>
  </link>
  <joint name="right_knee" type="revolute">
    <parent link="right_thigh"/>
    <child link="right_shin"/>
    <origin xyz="0 0 -0.13"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.5" upper="2.5" effort="16" velocity="10"/>
  </joint>
  <link name="right_wheel_tire">
    <inertial>
      <mass value="0.3"/>
      <inertia ixx="0.0003" ixy="0" ixz="0" iyy="0.00054" iyz="0" izz="0.0003"/>
    </inertial>
    <collision>
      <origin rpy="1.5707963267948966 0 0"/>
      <geometry><cylinder radius="0.06" length="0.03"/></geometry>
    </collision>
  </link>
  <joint name="right_wheel" type="continuous">
    <parent link="right_shin"/>
    <child link="right_wheel_tire"/>
    <origin xyz="0 0 -0.13"/>
    <axis xyz="0 1 0"/>
    <limit effort="1.7" velocity="100"/>
  </joint>
</robot>
"#;

/// Servos 1 to 3 drive the right leg on bus 1, servos 4 to 6 the left leg
/// on bus 2, each ordered hip, knee, wheel.
pub fn wheeled_biped_layout() -> ServoLayout {
    let mut layout = ServoLayout::new();
    let servos = [
        (1, 1, "right_hip"),
        (2, 1, "right_knee"),
        (3, 1, "right_wheel"),
        (4, 2, "left_hip"),
        (5, 2, "left_knee"),
        (6, 2, "left_wheel"),
    ];
    for (servo_id, bus_id, joint) in servos {
        layout
            .add_servo(servo_id, bus_id, joint)
            .expect("fixture servo ids and joints are distinct");
    }
    layout
}

/// Write `contents` to a file named `name` under a per-process temporary
/// directory and return its path.
pub fn write_fixture(name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("servosim_fixtures_{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
