//! Actuation interface over a physics backend.
//!
//! Each cycle turns the servo commands into joint drives, steps the backend
//! once, and reads the post-step joint states back as bus replies:
//!
//! ```text
//! commands ─► TorqueController ─► PhysicsBackend::step ─► replies ─► callback
//!                 │                         │
//!            IMU sample                     └─► contacts ─► observe()
//! ```
//!
//! The IMU is sampled before the step, so its readings lag the base state
//! by one step.
//!
//! `Stopped` and `Fault` servos output no torque and their joint is braked,
//! so a stopped joint holds still. `Position` servos run the torque loop of
//! [`TorqueController`] against the joint's friction and torque limit.

use std::collections::BTreeMap;

use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector3};
use servosim_actuator_core::{
    control::{MeasuredState, TorqueController, TorqueTarget},
    layout::ServoLayout,
    protocol::{Data, Mode, Output, QueryResult, ServoCommand, ServoReply, radians_to_revolutions},
    telemetry::Telemetry,
};
use servosim_core::{
    Dictionary,
    config::{ResetRequest, SIM_NAMESPACE, SimParameters},
};
use servosim_physics::{
    backend::PhysicsBackend,
    frames::{homogeneous, relative_rotation},
    rapier::{EngineParameters, RapierBackend},
    state::{BaseState, JointDrive},
};
use servosim_urdf::RobotModel;
use tracing::{debug, info, warn};

use crate::{
    contacts::ContactMonitor,
    error::SimError,
    imu::ImuData,
    interface::{CycleCallback, Interface, check_batch},
    properties::{JointProperties, joint_properties},
};

// ---------------------------------------------------------------------------
// SimInterface
// ---------------------------------------------------------------------------

/// Simulated servos, IMU and contact sensors.
pub struct SimInterface<B: PhysicsBackend = RapierBackend> {
    layout: ServoLayout,
    params: SimParameters,
    backend: B,
    controller: TorqueController,
    joint_properties: BTreeMap<String, JointProperties>,
    /// Latest reply per joint name.
    servo_reply: BTreeMap<String, ServoReply>,
    imu_data: ImuData,
    contacts: ContactMonitor,
}

impl SimInterface<RapierBackend> {
    /// Load the robot description at `params.robot_description_path` and
    /// simulate it with rapier.
    pub fn new(layout: &ServoLayout, params: SimParameters) -> Result<Self, SimError> {
        params.validate()?;
        let model = servosim_urdf::parse_file(&params.robot_description_path)?;
        Self::with_model(layout, params, &model)
    }

    /// Simulate an already parsed robot description with rapier.
    pub fn with_model(
        layout: &ServoLayout,
        params: SimParameters,
        model: &RobotModel,
    ) -> Result<Self, SimError> {
        let engine_params = EngineParameters::default()
            .with_dt(params.dt)
            .with_gravity(params.gravity_vector())
            .with_floor(params.floor);
        let engine = RapierBackend::from_robot(model, engine_params)?;
        Self::with_backend(layout, params, model, engine)
    }
}

impl<B: PhysicsBackend> SimInterface<B> {
    /// Drive a physics backend simulating `model`.
    pub fn with_backend(
        layout: &ServoLayout,
        params: SimParameters,
        model: &RobotModel,
        mut backend: B,
    ) -> Result<Self, SimError> {
        params.validate()?;

        for joint in layout.joints() {
            if !matches!(model.joint(joint), Ok(j) if j.joint_type.is_actuated()) {
                return Err(SimError::JointNotInDescription(joint.to_owned()));
            }
        }
        if model.link(&params.imu_link).is_err() {
            return Err(SimError::MissingImuLink(params.imu_link.clone()));
        }
        let properties = joint_properties(model, &params.joint_friction)?;

        let mut contacts = ContactMonitor::new();
        for surface in &params.monitor_contacts {
            if model.link(surface).is_err() {
                return Err(SimError::UnknownContactSurface(surface.clone()));
            }
            contacts.enable(surface.clone());
        }

        if params.gui {
            warn!("no display available, simulating headless");
        }
        backend.set_floor(params.floor);
        backend.set_base_state(BaseState {
            pose: Isometry3::from_parts(
                Translation3::from(params.initial_position()),
                params.initial_orientation(),
            ),
            linear_velocity: params.initial_linear_velocity(),
            angular_velocity: params.initial_angular_velocity(),
        });

        let servo_reply = layout
            .iter()
            .map(|(id, _, joint)| {
                let reply = ServoReply {
                    id,
                    result: QueryResult::default(),
                };
                (joint.to_owned(), reply)
            })
            .collect();

        let mut interface = Self {
            layout: layout.clone(),
            controller: TorqueController::new(params.torque_control_kp, params.torque_control_kd),
            joint_properties: properties,
            params,
            backend,
            servo_reply,
            imu_data: ImuData::default(),
            contacts,
        };
        interface.read_joint_states(&[])?;
        interface.prime_imu()?;
        interface.contacts.refresh(&interface.backend)?;

        info!(
            robot = %model.name,
            engine = interface.backend.name(),
            servos = interface.layout.len(),
            dt = interface.params.dt,
            floor = interface.params.floor,
            "simulated actuation interface ready"
        );
        Ok(interface)
    }

    // -----------------------------------------------------------------------
    // Torque control
    // -----------------------------------------------------------------------

    /// Torque the servo of `joint_name` would apply now for the given
    /// targets, in SI units (N·m, rad, rad/s).
    ///
    /// Reads the joint state left by the last cycle.
    pub fn compute_joint_torque(
        &self,
        joint_name: &str,
        feedforward_torque: f64,
        target_position: f64,
        target_velocity: f64,
        kp_scale: f64,
        kd_scale: f64,
        maximum_torque: f64,
    ) -> Result<f64, SimError> {
        let target = TorqueTarget::new(
            feedforward_torque,
            target_position,
            target_velocity,
            kp_scale,
            kd_scale,
            maximum_torque,
        );
        self.torque_for_target(joint_name, &target)
    }

    fn torque_for_target(&self, joint_name: &str, target: &TorqueTarget) -> Result<f64, SimError> {
        let props = self
            .joint_properties
            .get(joint_name)
            .ok_or_else(|| SimError::UnknownJoint(joint_name.to_owned()))?;
        let state = self.backend.joint_state(joint_name)?;
        Ok(self.controller.compute(
            target,
            MeasuredState::new(state.position, state.velocity),
            &props.friction_model(),
            props.maximum_torque,
        ))
    }

    fn joint_drive(&self, joint_name: &str, command: &ServoCommand) -> Result<JointDrive, SimError> {
        let target = match command.mode {
            Mode::Stopped | Mode::Fault => return Ok(JointDrive::Brake),
            Mode::Position => TorqueTarget::from_command(&command.position),
            Mode::ZeroVelocity => TorqueTarget::zero_velocity(command.position.maximum_torque),
        };
        Ok(JointDrive::Torque(self.torque_for_target(joint_name, &target)?))
    }

    // -----------------------------------------------------------------------
    // Sensor reads
    // -----------------------------------------------------------------------

    /// Refresh every servo reply from the backend. Commanded servos echo the
    /// mode of their command.
    fn read_joint_states(&mut self, commands: &[ServoCommand]) -> Result<(), SimError> {
        let modes: BTreeMap<i32, Mode> = commands.iter().map(|c| (c.id, c.mode)).collect();
        for (joint, reply) in &mut self.servo_reply {
            let state = self.backend.joint_state(joint)?;
            let maximum_torque = self
                .joint_properties
                .get(joint)
                .map_or(f64::INFINITY, |p| p.maximum_torque);
            let mode = modes.get(&reply.id).copied().unwrap_or(reply.result.mode);
            let torque = if mode.is_stopped() { 0.0 } else { state.torque };
            let telemetry = Telemetry::from_torque(torque, maximum_torque);

            reply.result = QueryResult {
                mode,
                position: radians_to_revolutions(state.position),
                velocity: radians_to_revolutions(state.velocity),
                torque,
                voltage: telemetry.voltage,
                temperature: telemetry.temperature,
                ..QueryResult::default()
            };
        }
        Ok(())
    }

    /// Rotation of the IMU link frame relative to the base frame.
    fn rotation_imu_to_base(&self) -> Result<UnitQuaternion<f64>, SimError> {
        let imu = self.backend.link_motion(&self.params.imu_link)?;
        Ok(relative_rotation(&self.backend.base_state().pose, &imu.pose))
    }

    /// Reset IMU readings to the current state, without acceleration.
    fn prime_imu(&mut self) -> Result<(), SimError> {
        let imu = self.backend.link_motion(&self.params.imu_link)?;
        let base = self.backend.base_state().pose.rotation;
        self.imu_data = ImuData::initial(&imu, &base, &self.rotation_imu_to_base()?);
        Ok(())
    }

    fn update_imu(&mut self) -> Result<(), SimError> {
        let imu = self.backend.link_motion(&self.params.imu_link)?;
        let base = self.backend.base_state().pose.rotation;
        let mount = self.rotation_imu_to_base()?;
        self.imu_data.update(&imu, &base, &mount, self.backend.dt());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Homogeneous transform from the base frame to the world frame.
    pub fn transform_base_to_world(&self) -> Matrix4<f64> {
        homogeneous(&self.backend.base_state().pose)
    }

    /// Linear velocity of the base, in the world frame (m/s).
    pub fn linear_velocity_base_to_world_in_world(&self) -> Vector3<f64> {
        self.backend.base_state().linear_velocity
    }

    /// Angular velocity of the base, in the base frame (rad/s).
    pub fn angular_velocity_base_in_base(&self) -> Vector3<f64> {
        self.backend.base_state().angular_velocity
    }

    pub const fn joint_properties(&self) -> &BTreeMap<String, JointProperties> {
        &self.joint_properties
    }

    /// Latest reply per joint name.
    pub const fn servo_reply(&self) -> &BTreeMap<String, ServoReply> {
        &self.servo_reply
    }

    pub const fn imu_data(&self) -> &ImuData {
        &self.imu_data
    }

    pub const fn parameters(&self) -> &SimParameters {
        &self.params
    }

    pub const fn contacts(&self) -> &ContactMonitor {
        &self.contacts
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: PhysicsBackend> Interface for SimInterface<B> {
    fn servo_layout(&self) -> &ServoLayout {
        &self.layout
    }

    fn reset(&mut self, config: &Dictionary) -> Result<(), SimError> {
        let request = ResetRequest::from_dictionary(config)?;
        for (surface, enabled) in &request.monitor_contacts {
            if *enabled && self.backend.contact_points(surface).is_err() {
                return Err(SimError::UnknownContactSurface(surface.clone()));
            }
        }

        if request.gui == Some(true) {
            warn!("no display available, simulating headless");
        }
        if let Some(floor) = request.floor {
            self.backend.set_floor(floor);
        }
        if request.moves_base() {
            let mut base = *self.backend.base_state();
            if let Some(orientation) = request.orientation_base_in_world {
                base.pose.rotation = orientation;
            }
            if let Some(position) = request.position_base_in_world {
                base.pose.translation = Translation3::from(position);
            }
            if let Some(velocity) = request.linear_velocity_base_to_world_in_world {
                base.linear_velocity = velocity;
            }
            if let Some(velocity) = request.angular_velocity_base_in_base {
                base.angular_velocity = velocity;
            }
            self.backend.set_base_state(base);
            self.prime_imu()?;
        }
        for (surface, enabled) in &request.monitor_contacts {
            if *enabled {
                self.contacts.enable(surface.clone());
            } else {
                self.contacts.disable(surface);
            }
        }
        self.contacts.refresh(&self.backend)?;
        request.apply_to(&mut self.params);

        info!(
            floor = self.backend.floor(),
            moved_base = request.moves_base(),
            monitored_contacts = request.monitor_contacts.len(),
            "reset"
        );
        Ok(())
    }

    fn observe(&self, observation: &mut Dictionary) {
        self.imu_data.write(observation);

        let base = self.backend.base_state();
        let sim = observation.child_mut(SIM_NAMESPACE);
        sim.child_mut("imu")
            .insert("linear_velocity", self.imu_data.linear_velocity_imu_in_world);

        let output = sim.child_mut("base");
        output.insert("position", base.pose.translation.vector);
        output.insert("orientation", base.pose.rotation);
        output.insert("linear_velocity", base.linear_velocity);
        output.insert("angular_velocity", base.angular_velocity);

        self.contacts.write(sim);
    }

    fn cycle(&mut self, data: &mut Data<'_>, callback: CycleCallback<'_>) -> Result<(), SimError> {
        check_batch(data)?;

        // Resolve every id before touching the simulation.
        let joints = data
            .commands
            .iter()
            .map(|command| {
                self.layout
                    .joint_name(command.id)
                    .map(str::to_owned)
                    .ok_or(SimError::UnknownServo(command.id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let drives = data
            .commands
            .iter()
            .zip(&joints)
            .map(|(command, joint)| self.joint_drive(joint, command))
            .collect::<Result<Vec<_>, _>>()?;
        for (joint, drive) in joints.iter().zip(drives) {
            self.backend.set_joint_drive(joint, drive)?;
        }

        // The IMU samples the state the commands were computed from.
        self.update_imu()?;
        self.backend.step();

        self.read_joint_states(data.commands)?;
        self.contacts.refresh(&self.backend)?;

        for (reply, joint) in data.replies.iter_mut().zip(&joints) {
            if let Some(latest) = self.servo_reply.get(joint) {
                *reply = *latest;
            }
        }
        debug!(time = self.backend.time(), servos = joints.len(), "cycle");

        callback(&Output {
            query_result_size: data.replies.len(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
