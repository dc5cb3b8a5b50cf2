use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::error::{ConfigError, DictionaryError};

/// Namespace of the simulator in configuration and observation trees.
pub const SIM_NAMESPACE: &str = "bullet";

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_dt() -> f64 {
    0.001
}
const fn default_true() -> bool {
    true
}
const fn default_gravity() -> [f64; 3] {
    [0.0, 0.0, -9.81]
}
const fn default_torque_control_kp() -> f64 {
    20.0
}
const fn default_torque_control_kd() -> f64 {
    1.0
}
fn default_imu_link() -> String {
    "imu".into()
}
const fn default_orientation() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

// ---------------------------------------------------------------------------
// SimParameters
// ---------------------------------------------------------------------------

/// Parameters of a simulated actuation interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParameters {
    /// Simulation timestep in seconds (default: 0.001 = 1000 Hz).
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Display toggle. Headless engines record it and ignore it.
    #[serde(default)]
    pub gui: bool,

    /// Whether a ground plane exists at `z = 0`.
    #[serde(default = "default_true")]
    pub floor: bool,

    /// Gravity in the world frame (m/s²).
    #[serde(default = "default_gravity")]
    pub gravity: [f64; 3],

    /// Path to the robot URDF.
    #[serde(default)]
    pub robot_description_path: PathBuf,

    /// Kinetic friction overrides (N·m), keyed by joint name.
    #[serde(default)]
    pub joint_friction: BTreeMap<String, f64>,

    /// Proportional gain of the servo position loop (N·m/rad).
    #[serde(default = "default_torque_control_kp")]
    pub torque_control_kp: f64,

    /// Derivative gain of the servo position loop (N·m·s/rad).
    #[serde(default = "default_torque_control_kd")]
    pub torque_control_kd: f64,

    /// Link carrying the IMU.
    #[serde(default = "default_imu_link")]
    pub imu_link: String,

    /// Initial base position in the world frame (m).
    #[serde(default)]
    pub position_base_in_world: [f64; 3],

    /// Initial base orientation `[w, x, y, z]`.
    #[serde(default = "default_orientation")]
    pub orientation_base_in_world: [f64; 4],

    /// Initial base linear velocity in the world frame (m/s).
    #[serde(default)]
    pub linear_velocity_base_to_world_in_world: [f64; 3],

    /// Initial base angular velocity in the base frame (rad/s).
    #[serde(default)]
    pub angular_velocity_base_in_base: [f64; 3],

    /// Links whose floor contacts are counted.
    #[serde(default)]
    pub monitor_contacts: BTreeSet<String>,
}

impl Default for SimParameters {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            gui: false,
            floor: true,
            gravity: default_gravity(),
            robot_description_path: PathBuf::new(),
            joint_friction: BTreeMap::new(),
            torque_control_kp: default_torque_control_kp(),
            torque_control_kd: default_torque_control_kd(),
            imu_link: default_imu_link(),
            position_base_in_world: [0.0; 3],
            orientation_base_in_world: default_orientation(),
            linear_velocity_base_to_world_in_world: [0.0; 3],
            angular_velocity_base_in_base: [0.0; 3],
            monitor_contacts: BTreeSet::new(),
        }
    }
}

impl SimParameters {
    /// Reject timesteps, gains and friction values the controller cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dt.is_nan() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidTimestep(self.dt));
        }
        for (field, gain) in [
            ("torque_control_kp", self.torque_control_kp),
            ("torque_control_kd", self.torque_control_kd),
        ] {
            if gain.is_nan() || gain < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    message: format!("must be non-negative, got {gain}"),
                });
            }
        }
        if let Some((joint, friction)) = self
            .joint_friction
            .iter()
            .find(|(_, friction)| friction.is_nan() || **friction < 0.0)
        {
            return Err(ConfigError::InvalidValue {
                field: format!("joint_friction.{joint}"),
                message: format!("must be non-negative, got {friction}"),
            });
        }
        if self.orientation_quaternion().norm() <= f64::EPSILON {
            return Err(ConfigError::InvalidValue {
                field: "orientation_base_in_world".into(),
                message: "must not be a zero quaternion".into(),
            });
        }
        Ok(())
    }

    /// Load and validate a TOML parameter file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let params: Self = toml::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    /// Simulation rate in Hz.
    pub fn frequency(&self) -> f64 {
        1.0 / self.dt
    }

    pub fn gravity_vector(&self) -> Vector3<f64> {
        Vector3::from(self.gravity)
    }

    fn orientation_quaternion(&self) -> Quaternion<f64> {
        let [w, x, y, z] = self.orientation_base_in_world;
        Quaternion::new(w, x, y, z)
    }

    /// Initial base orientation, normalized.
    pub fn initial_orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(self.orientation_quaternion())
    }

    pub fn initial_position(&self) -> Vector3<f64> {
        Vector3::from(self.position_base_in_world)
    }

    pub fn initial_linear_velocity(&self) -> Vector3<f64> {
        Vector3::from(self.linear_velocity_base_to_world_in_world)
    }

    pub fn initial_angular_velocity(&self) -> Vector3<f64> {
        Vector3::from(self.angular_velocity_base_in_base)
    }

    /// Update from the simulator namespace of a configuration tree.
    ///
    /// Only keys present in `config` are changed; unknown keys are ignored.
    /// A present key of the wrong type is an error and leaves `self`
    /// untouched.
    pub fn configure(&mut self, config: &Dictionary) -> Result<(), DictionaryError> {
        let Some(sim) = config.child(SIM_NAMESPACE) else {
            return Ok(());
        };
        let mut next = self.clone();

        if let Some(dt) = sim.get_opt("dt")? {
            next.dt = dt;
        }
        if let Some(gravity) = sim.get_opt::<Vector3<f64>>("gravity")? {
            next.gravity = gravity.into();
        }
        if let Some(path) = sim.get_opt::<String>("robot_description_path")? {
            next.robot_description_path = PathBuf::from(path);
        }
        if let Some(link) = sim.get_opt("imu_link")? {
            next.imu_link = link;
        }
        if let Some(kp) = sim.get_opt("torque_control.kp")? {
            next.torque_control_kp = kp;
        }
        if let Some(kd) = sim.get_opt("torque_control.kd")? {
            next.torque_control_kd = kd;
        }
        if let Some(friction) = sim.child("joint_friction") {
            for joint in friction.keys() {
                next.joint_friction
                    .insert(joint.to_owned(), friction.get(joint)?);
            }
        }

        ResetRequest::from_dictionary(config)?.apply_to(&mut next);
        *self = next;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ResetRequest
// ---------------------------------------------------------------------------

/// Sparse state change requested through `reset`.
///
/// Every field is optional: absent keys leave the corresponding state
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetRequest {
    pub gui: Option<bool>,
    pub floor: Option<bool>,
    pub orientation_base_in_world: Option<UnitQuaternion<f64>>,
    pub position_base_in_world: Option<Vector3<f64>>,
    pub linear_velocity_base_to_world_in_world: Option<Vector3<f64>>,
    pub angular_velocity_base_in_base: Option<Vector3<f64>>,
    /// `monitor.contacts.<link>` entries, `true` to start counting.
    pub monitor_contacts: BTreeMap<String, bool>,
}

impl ResetRequest {
    /// Parse the simulator namespace of a configuration tree.
    pub fn from_dictionary(config: &Dictionary) -> Result<Self, DictionaryError> {
        let Some(sim) = config.child(SIM_NAMESPACE) else {
            return Ok(Self::default());
        };
        let mut request = Self {
            gui: sim.get_opt("gui")?,
            floor: sim.get_opt("floor")?,
            ..Self::default()
        };
        if let Some(reset) = sim.child("reset") {
            request.orientation_base_in_world = reset.get_opt("orientation_base_in_world")?;
            request.position_base_in_world = reset.get_opt("position_base_in_world")?;
            request.linear_velocity_base_to_world_in_world =
                reset.get_opt("linear_velocity_base_to_world_in_world")?;
            request.angular_velocity_base_in_base =
                reset.get_opt("angular_velocity_base_in_base")?;
        }
        if let Some(contacts) = sim.child("monitor.contacts") {
            for link in contacts.keys() {
                request
                    .monitor_contacts
                    .insert(link.to_owned(), contacts.get(link)?);
            }
        }
        Ok(request)
    }

    /// Whether the request touches the base state.
    pub const fn moves_base(&self) -> bool {
        self.orientation_base_in_world.is_some()
            || self.position_base_in_world.is_some()
            || self.linear_velocity_base_to_world_in_world.is_some()
            || self.angular_velocity_base_in_base.is_some()
    }

    /// Fold the request into initial parameters.
    pub fn apply_to(&self, params: &mut SimParameters) {
        if let Some(gui) = self.gui {
            params.gui = gui;
        }
        if let Some(floor) = self.floor {
            params.floor = floor;
        }
        if let Some(q) = self.orientation_base_in_world {
            params.orientation_base_in_world = [q.w, q.i, q.j, q.k];
        }
        if let Some(p) = self.position_base_in_world {
            params.position_base_in_world = p.into();
        }
        if let Some(v) = self.linear_velocity_base_to_world_in_world {
            params.linear_velocity_base_to_world_in_world = v.into();
        }
        if let Some(w) = self.angular_velocity_base_in_base {
            params.angular_velocity_base_in_base = w.into();
        }
        for (link, enabled) in &self.monitor_contacts {
            if *enabled {
                params.monitor_contacts.insert(link.clone());
            } else {
                params.monitor_contacts.remove(link);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Defaults ----

    #[test]
    fn sim_parameters_default_values() {
        let params = SimParameters::default();
        assert!((params.dt - 0.001).abs() < f64::EPSILON);
        assert!(!params.gui);
        assert!(params.floor);
        assert!((params.gravity[2] - (-9.81)).abs() < f64::EPSILON);
        assert!((params.torque_control_kp - 20.0).abs() < f64::EPSILON);
        assert!((params.torque_control_kd - 1.0).abs() < f64::EPSILON);
        assert_eq!(params.imu_link, "imu");
        assert!(params.initial_orientation().angle() < f64::EPSILON);
        assert!(params.monitor_contacts.is_empty());
        assert!((params.frequency() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn serde_defaults_match_default_impl() {
        let params: SimParameters = toml::from_str("").unwrap();
        assert_eq!(params, SimParameters::default());
    }

    // ---- Validation ----

    #[test]
    fn validate_ok() {
        assert!(SimParameters::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_dt() {
        for dt in [0.0, -0.001, f64::NAN] {
            let params = SimParameters {
                dt,
                ..SimParameters::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ConfigError::InvalidTimestep(_))
            ));
        }
    }

    #[test]
    fn validate_rejects_negative_gain() {
        let params = SimParameters {
            torque_control_kd: -1.0,
            ..SimParameters::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("torque_control_kd"));
    }

    #[test]
    fn validate_rejects_negative_friction() {
        let mut params = SimParameters::default();
        params.joint_friction.insert("left_wheel".into(), -0.1);
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("joint_friction.left_wheel"));
    }

    #[test]
    fn validate_rejects_zero_quaternion() {
        let params = SimParameters {
            orientation_base_in_world: [0.0; 4],
            ..SimParameters::default()
        };
        assert!(params.validate().is_err());
    }

    // ---- TOML ----

    #[test]
    fn from_toml_partial() {
        let params: SimParameters = toml::from_str(
            r#"
            dt = 0.005
            floor = false
            robot_description_path = "robot.urdf"

            [joint_friction]
            left_wheel = 0.1
            "#,
        )
        .unwrap();
        assert!((params.dt - 0.005).abs() < f64::EPSILON);
        assert!(!params.floor);
        assert_eq!(params.robot_description_path, PathBuf::from("robot.urdf"));
        assert!((params.joint_friction["left_wheel"] - 0.1).abs() < f64::EPSILON);
        assert_eq!(params.imu_link, "imu");
    }

    #[test]
    fn from_file_not_found() {
        let err = SimParameters::from_file("/nonexistent/sim.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    // ---- configure ----

    #[test]
    fn configure_reads_sim_namespace() {
        let config = Dictionary::from_toml_str(
            r#"
            [bullet]
            dt = 0.002
            floor = false
            imu_link = "imu_frame"

            [bullet.torque_control]
            kp = 10.0

            [bullet.joint_friction]
            left_wheel = 0.1

            [bullet.reset]
            position_base_in_world = [0.0, 0.0, 0.6]

            [bullet.monitor.contacts]
            left_wheel_tire = true
            "#,
        )
        .unwrap();

        let mut params = SimParameters::default();
        params.configure(&config).unwrap();
        assert!((params.dt - 0.002).abs() < f64::EPSILON);
        assert!(!params.floor);
        assert_eq!(params.imu_link, "imu_frame");
        assert!((params.torque_control_kp - 10.0).abs() < f64::EPSILON);
        assert!((params.torque_control_kd - 1.0).abs() < f64::EPSILON);
        assert!((params.joint_friction["left_wheel"] - 0.1).abs() < f64::EPSILON);
        assert!((params.position_base_in_world[2] - 0.6).abs() < f64::EPSILON);
        assert!(params.monitor_contacts.contains("left_wheel_tire"));
    }

    #[test]
    fn configure_without_namespace_is_noop() {
        let mut config = Dictionary::new();
        config.insert("dt", 0.5);
        let mut params = SimParameters::default();
        params.configure(&config).unwrap();
        assert_eq!(params, SimParameters::default());
    }

    #[test]
    fn configure_type_error_leaves_parameters_untouched() {
        let mut config = Dictionary::new();
        config.child_mut("bullet").insert("dt", 0.002);
        config.child_mut("bullet").insert("floor", "yes");
        let mut params = SimParameters::default();
        assert!(params.configure(&config).is_err());
        assert_eq!(params, SimParameters::default());
    }

    // ---- ResetRequest ----

    #[test]
    fn reset_request_empty_config() {
        let request = ResetRequest::from_dictionary(&Dictionary::new()).unwrap();
        assert_eq!(request, ResetRequest::default());
        assert!(!request.moves_base());
    }

    #[test]
    fn reset_request_ignores_unknown_keys() {
        let mut config = Dictionary::new();
        let sim = config.child_mut("bullet");
        sim.insert("follower_camera", true);
        sim.child_mut("reset").insert("joint_configuration", vec![0.0; 6]);
        let request = ResetRequest::from_dictionary(&config).unwrap();
        assert_eq!(request, ResetRequest::default());
    }

    #[test]
    fn reset_request_parses_base_state() {
        let mut config = Dictionary::new();
        let reset = config.child_mut("bullet").child_mut("reset");
        reset.insert("orientation_base_in_world", vec![0.707, 0.0, -0.707, 0.0]);
        reset.insert("angular_velocity_base_in_base", Vector3::new(7.0, 8.0, 9.0));

        let request = ResetRequest::from_dictionary(&config).unwrap();
        assert!(request.moves_base());
        assert!(request.position_base_in_world.is_none());
        let w = request.angular_velocity_base_in_base.unwrap();
        assert!((w.x - 7.0).abs() < f64::EPSILON);
        let q = request.orientation_base_in_world.unwrap();
        assert!((q.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn reset_request_contact_toggles() {
        let mut config = Dictionary::new();
        let contacts = config
            .child_mut("bullet")
            .child_mut("monitor")
            .child_mut("contacts");
        contacts.insert("left_wheel_tire", true);
        contacts.insert("right_wheel_tire", false);

        let request = ResetRequest::from_dictionary(&config).unwrap();
        let mut params = SimParameters::default();
        params.monitor_contacts.insert("right_wheel_tire".into());
        request.apply_to(&mut params);
        assert!(params.monitor_contacts.contains("left_wheel_tire"));
        assert!(!params.monitor_contacts.contains("right_wheel_tire"));
    }

    #[test]
    fn reset_request_type_mismatch() {
        let mut config = Dictionary::new();
        config
            .child_mut("bullet")
            .child_mut("reset")
            .insert("position_base_in_world", true);
        let err = ResetRequest::from_dictionary(&config).unwrap_err();
        assert!(matches!(err, DictionaryError::TypeMismatch { .. }));
    }
}
