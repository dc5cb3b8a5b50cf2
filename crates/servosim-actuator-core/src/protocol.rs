//! Command and reply frames exchanged with servos on the bus.
//!
//! Units follow the moteus register map: positions in revolutions,
//! velocities in revolutions per second, torques in N·m. A `NaN` position
//! means "no position target".

use std::f64::consts::TAU;

/// Convert bus positions (rev) or velocities (rev/s) to SI.
pub fn revolutions_to_radians(revolutions: f64) -> f64 {
    revolutions * TAU
}

/// Convert SI positions (rad) or velocities (rad/s) to bus units.
pub fn radians_to_revolutions(radians: f64) -> f64 {
    radians / TAU
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Servo control mode, a subset of the moteus modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Power stage off. Simulated joints are braked to rest.
    #[default]
    Stopped,
    /// Latched fault. Behaves like `Stopped`.
    Fault,
    /// Position/velocity/feedforward loop.
    Position,
    /// Hold zero velocity with the command's torque limit.
    ZeroVelocity,
}

impl Mode {
    /// Whether the servo applies no commanded torque in this mode.
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped | Self::Fault)
    }
}

// ---------------------------------------------------------------------------
// PositionCommand
// ---------------------------------------------------------------------------

/// Position-mode command fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionCommand {
    /// Target position (rev), `NaN` for none.
    pub position: f64,
    /// Target velocity (rev/s).
    pub velocity: f64,
    /// Feedforward torque (N·m).
    pub feedforward_torque: f64,
    /// Scale on the proportional gain, in `[0, 1]`.
    pub kp_scale: f64,
    /// Scale on the derivative gain, in `[0, 1]`.
    pub kd_scale: f64,
    /// Torque limit (N·m), `NaN` for the joint's own limit.
    pub maximum_torque: f64,
}

impl Default for PositionCommand {
    fn default() -> Self {
        Self {
            position: f64::NAN,
            velocity: 0.0,
            feedforward_torque: 0.0,
            kp_scale: 1.0,
            kd_scale: 1.0,
            maximum_torque: f64::NAN,
        }
    }
}

impl PositionCommand {
    pub const fn with_position(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    pub const fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub const fn with_feedforward_torque(mut self, torque: f64) -> Self {
        self.feedforward_torque = torque;
        self
    }

    pub const fn with_gain_scales(mut self, kp_scale: f64, kd_scale: f64) -> Self {
        self.kp_scale = kp_scale;
        self.kd_scale = kd_scale;
        self
    }

    pub const fn with_maximum_torque(mut self, torque: f64) -> Self {
        self.maximum_torque = torque;
        self
    }
}

// ---------------------------------------------------------------------------
// ServoCommand
// ---------------------------------------------------------------------------

/// One servo's command for the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServoCommand {
    pub id: i32,
    pub mode: Mode,
    pub position: PositionCommand,
}

impl ServoCommand {
    /// A `Stopped` command for servo `id`.
    pub fn stop(id: i32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// A `Position` command for servo `id`.
    pub const fn position(id: i32, position: PositionCommand) -> Self {
        Self {
            id,
            mode: Mode::Position,
            position,
        }
    }
}

// ---------------------------------------------------------------------------
// QueryResult / ServoReply
// ---------------------------------------------------------------------------

/// Measured servo state returned by a query.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueryResult {
    pub mode: Mode,
    /// Position (rev).
    pub position: f64,
    /// Velocity (rev/s).
    pub velocity: f64,
    /// Output torque (N·m).
    pub torque: f64,
    /// Quadrature current (A).
    pub q_current: f64,
    /// Direct current (A).
    pub d_current: f64,
    pub rezero_state: bool,
    /// Bus voltage (V).
    pub voltage: f64,
    /// Controller temperature (°C).
    pub temperature: f64,
    pub fault: i32,
}

/// One servo's reply for the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServoReply {
    pub id: i32,
    pub result: QueryResult,
}

// ---------------------------------------------------------------------------
// Data / Output
// ---------------------------------------------------------------------------

/// Command batch and reply buffer of one cycle, processed in order.
#[derive(Debug)]
pub struct Data<'a> {
    pub commands: &'a [ServoCommand],
    pub replies: &'a mut [ServoReply],
}

impl<'a> Data<'a> {
    pub fn new(commands: &'a [ServoCommand], replies: &'a mut [ServoReply]) -> Self {
        Self { commands, replies }
    }

    /// Number of commands in the batch.
    pub const fn len(&self) -> usize {
        self.commands.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Summary passed to the cycle completion callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Output {
    /// Number of replies written to the batch.
    pub query_result_size: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
