//! Command and reply buffers of a control loop, and their conversions
//! to and from action/observation trees.
//!
//! Action and observation trees use SI units (rad, rad/s, N·m) under
//! `servo.<joint>`; the buffers hold bus units (rev, rev/s).

use std::collections::BTreeMap;

use servosim_actuator_core::{
    layout::ServoLayout,
    protocol::{
        Data, Mode, PositionCommand, ServoCommand, ServoReply, radians_to_revolutions,
        revolutions_to_radians,
    },
};
use servosim_core::{Dictionary, error::DictionaryError};
use tracing::warn;

/// Namespace of servo actions and observations.
pub const SERVO_NAMESPACE: &str = "servo";

// ---------------------------------------------------------------------------
// ActuationBuffer
// ---------------------------------------------------------------------------

/// One command and one reply per servo of a layout, in servo id order.
#[derive(Debug, Clone)]
pub struct ActuationBuffer {
    /// Joint name of each command slot.
    joints: Vec<String>,
    commands: Vec<ServoCommand>,
    replies: Vec<ServoReply>,
}

impl ActuationBuffer {
    /// Buffers filled with stop commands.
    pub fn new(layout: &ServoLayout) -> Self {
        let joints: Vec<String> = layout.joints().map(str::to_owned).collect();
        let commands: Vec<ServoCommand> = layout.iter().map(|(id, _, _)| ServoCommand::stop(id)).collect();
        let replies = commands
            .iter()
            .map(|c| ServoReply {
                id: c.id,
                ..ServoReply::default()
            })
            .collect();
        Self {
            joints,
            commands,
            replies,
        }
    }

    /// Stop every servo.
    pub fn write_stop_commands(&mut self) {
        for command in &mut self.commands {
            *command = ServoCommand::stop(command.id);
        }
    }

    /// Fill position commands from `servo.<joint>` entries of an action.
    ///
    /// Servos without an entry are stopped. Absent fields take the
    /// [`PositionCommand`] defaults.
    pub fn write_position_commands(&mut self, action: &Dictionary) -> Result<(), DictionaryError> {
        for (joint, command) in self.joints.iter().zip(&mut self.commands) {
            let Some(target) = action
                .child(SERVO_NAMESPACE)
                .and_then(|servos| servos.child(joint))
            else {
                warn!(joint = %joint, "no action for joint, stopping its servo");
                *command = ServoCommand::stop(command.id);
                continue;
            };
            let defaults = PositionCommand::default();
            let position = PositionCommand {
                position: radians_to_revolutions(target.get_or("position", f64::NAN)?),
                velocity: radians_to_revolutions(target.get_or("velocity", 0.0)?),
                feedforward_torque: target.get_or("feedforward_torque", defaults.feedforward_torque)?,
                kp_scale: target.get_or("kp_scale", defaults.kp_scale)?,
                kd_scale: target.get_or("kd_scale", defaults.kd_scale)?,
                maximum_torque: target.get_or("maximum_torque", defaults.maximum_torque)?,
            };
            *command = ServoCommand::position(command.id, position);
        }
        Ok(())
    }

    /// Seed `servo.<joint>` entries of an action with the measured
    /// positions of the last replies and zero velocity.
    pub fn initialize_action(&self, action: &mut Dictionary) {
        let servos = action.child_mut(SERVO_NAMESPACE);
        for (joint, reply) in self.joints.iter().zip(&self.replies) {
            let target = servos.child_mut(joint);
            target.insert("position", revolutions_to_radians(reply.result.position));
            target.insert("velocity", 0.0);
            target.insert("feedforward_torque", 0.0);
            target.insert("kp_scale", 1.0);
            target.insert("kd_scale", 1.0);
        }
    }

    /// Cycle data borrowing both buffers.
    pub fn data(&mut self) -> Data<'_> {
        Data::new(&self.commands, &mut self.replies)
    }

    pub fn commands(&self) -> &[ServoCommand] {
        &self.commands
    }

    pub fn replies(&self) -> &[ServoReply] {
        &self.replies
    }

    /// Whether every servo is commanded to stop.
    pub fn is_stopped(&self) -> bool {
        self.commands.iter().all(|c| c.mode == Mode::Stopped)
    }
}

// ---------------------------------------------------------------------------
// Servo observation
// ---------------------------------------------------------------------------

/// Write `servo.<joint>.{position, velocity, torque, temperature, voltage}`
/// for every reply of a known servo, in SI units.
pub fn observe_servos(
    observation: &mut Dictionary,
    servo_joint_map: &BTreeMap<i32, String>,
    replies: &[ServoReply],
) {
    let servos = observation.child_mut(SERVO_NAMESPACE);
    for reply in replies {
        let Some(joint) = servo_joint_map.get(&reply.id) else {
            continue;
        };
        let output = servos.child_mut(joint);
        output.insert("position", revolutions_to_radians(reply.result.position));
        output.insert("velocity", revolutions_to_radians(reply.result.velocity));
        output.insert("torque", reply.result.torque);
        output.insert("temperature", reply.result.temperature);
        output.insert("voltage", reply.result.voltage);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
