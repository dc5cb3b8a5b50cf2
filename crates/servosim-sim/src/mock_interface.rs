//! Physics-free actuation interface.
//!
//! Replies echo the commands: velocity targets integrate into positions,
//! feedforward torques are reported as output torques. Useful to exercise a
//! control loop without a robot description.

use std::collections::BTreeMap;

use servosim_actuator_core::{
    layout::ServoLayout,
    protocol::{Data, Output, QueryResult, ServoCommand},
};
use servosim_core::Dictionary;
use tracing::info;

use crate::{
    error::SimError,
    imu::ImuData,
    interface::{CycleCallback, Interface, check_batch},
};

/// Interface answering commands without simulating anything.
#[derive(Debug, Clone)]
pub struct MockInterface {
    layout: ServoLayout,
    /// Cycle period (s).
    dt: f64,
    query_results: BTreeMap<i32, QueryResult>,
    imu_data: ImuData,
}

impl MockInterface {
    pub fn new(layout: &ServoLayout, dt: f64) -> Self {
        let query_results = layout
            .servo_bus_map()
            .keys()
            .map(|&id| (id, unmeasured()))
            .collect();
        info!(servos = layout.len(), dt, "mock actuation interface ready");
        Self {
            layout: layout.clone(),
            dt,
            query_results,
            imu_data: ImuData::default(),
        }
    }

    /// Latest result of a servo.
    pub fn query_result(&self, servo_id: i32) -> Option<&QueryResult> {
        self.query_results.get(&servo_id)
    }

    fn apply(&mut self, command: &ServoCommand) -> Result<(), SimError> {
        let result = self
            .query_results
            .get_mut(&command.id)
            .ok_or(SimError::UnknownServo(command.id))?;
        let target = &command.position;
        result.mode = command.mode;
        if target.position.is_nan() && !target.velocity.is_nan() && !result.position.is_nan() {
            result.position += target.velocity * self.dt;
        } else {
            result.position = target.position;
        }
        result.velocity = target.velocity;
        result.torque = target.feedforward_torque;
        Ok(())
    }
}

/// Result of a servo that was never commanded.
fn unmeasured() -> QueryResult {
    QueryResult {
        position: f64::NAN,
        velocity: f64::NAN,
        torque: f64::NAN,
        q_current: f64::NAN,
        d_current: f64::NAN,
        voltage: f64::NAN,
        temperature: f64::NAN,
        ..QueryResult::default()
    }
}

impl Interface for MockInterface {
    fn servo_layout(&self) -> &ServoLayout {
        &self.layout
    }

    fn reset(&mut self, _config: &Dictionary) -> Result<(), SimError> {
        Ok(())
    }

    fn observe(&self, observation: &mut Dictionary) {
        self.imu_data.write(observation);
    }

    fn cycle(&mut self, data: &mut Data<'_>, callback: CycleCallback<'_>) -> Result<(), SimError> {
        check_batch(data)?;
        if let Some(unknown) = data
            .commands
            .iter()
            .find(|c| !self.query_results.contains_key(&c.id))
        {
            return Err(SimError::UnknownServo(unknown.id));
        }

        for command in data.commands {
            self.apply(command)?;
        }
        for (reply, command) in data.replies.iter_mut().zip(data.commands) {
            reply.id = command.id;
            if let Some(result) = self.query_results.get(&command.id) {
                reply.result = *result;
            }
        }

        callback(&Output {
            query_result_size: data.replies.len(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
