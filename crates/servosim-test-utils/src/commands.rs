//! Command batch helpers for tests.

use servosim_actuator_core::{
    layout::ServoLayout,
    protocol::{PositionCommand, ServoCommand, ServoReply},
};

/// A `Stopped` command for every servo of the layout, in servo id order.
pub fn stop_commands(layout: &ServoLayout) -> Vec<ServoCommand> {
    layout.iter().map(|(id, _, _)| ServoCommand::stop(id)).collect()
}

/// The same `Position` command for every servo of the layout.
pub fn position_commands(layout: &ServoLayout, position: PositionCommand) -> Vec<ServoCommand> {
    layout
        .iter()
        .map(|(id, _, _)| ServoCommand::position(id, position))
        .collect()
}

/// Default replies sized for `commands`.
pub fn reply_buffer(commands: &[ServoCommand]) -> Vec<ServoReply> {
    vec![ServoReply::default(); commands.len()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
