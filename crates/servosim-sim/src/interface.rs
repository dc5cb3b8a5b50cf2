//! Actuation interface trait.
//!
//! An [`Interface`] stands where the servo bus driver of a real robot would:
//! it takes one command per servo each cycle, fills one reply per servo, and
//! hands control back through a completion callback. Implementations differ
//! in what sits behind the bus (a physics simulation, a mock).

use std::collections::BTreeMap;

use servosim_actuator_core::{
    layout::ServoLayout,
    protocol::{Data, Output},
};
use servosim_core::Dictionary;

use crate::error::SimError;

/// Continuation invoked once at the end of every cycle, on the caller's
/// thread, before `cycle` returns.
pub type CycleCallback<'a> = Box<dyn FnOnce(&Output) + 'a>;

/// Command/reply cycle, reset and observation over a set of servos.
pub trait Interface: Send {
    /// Servo layout the interface was built with.
    fn servo_layout(&self) -> &ServoLayout;

    /// Map from servo id to bus id.
    fn servo_bus_map(&self) -> &BTreeMap<i32, i32> {
        self.servo_layout().servo_bus_map()
    }

    /// Map from servo id to joint name.
    fn servo_joint_map(&self) -> &BTreeMap<i32, String> {
        self.servo_layout().servo_joint_map()
    }

    /// Reconfigure or teleport from a configuration tree. Absent keys leave
    /// the corresponding state unchanged.
    fn reset(&mut self, config: &Dictionary) -> Result<(), SimError>;

    /// Write interface observations. Does not advance the interface.
    fn observe(&self, observation: &mut Dictionary);

    /// Send commands, fill replies, then call `callback` exactly once.
    fn cycle(&mut self, data: &mut Data<'_>, callback: CycleCallback<'_>) -> Result<(), SimError>;
}

/// Check that a batch has one reply slot per command.
pub(crate) fn check_batch(data: &Data<'_>) -> Result<(), SimError> {
    if data.commands.len() == data.replies.len() {
        Ok(())
    } else {
        Err(SimError::BatchSizeMismatch {
            commands: data.commands.len(),
            replies: data.replies.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
