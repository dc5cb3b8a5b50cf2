//! Illustrative servo telemetry.
//!
//! Temperature and bus voltage are deterministic functions of the load ratio
//! `r = clamp(|τ| / τmax, 0, 1)`: the controller warms up and the supply sags
//! as the servo works harder. Not a thermal or electrical model.

/// Temperature at zero load (°C).
pub const IDLE_TEMPERATURE: f64 = 25.0;

/// Temperature rise at full load (°C).
pub const FULL_LOAD_TEMPERATURE_RISE: f64 = 45.0;

/// Bus voltage at zero load (V).
pub const NOMINAL_VOLTAGE: f64 = 24.0;

/// Voltage sag at full load (V).
pub const FULL_LOAD_VOLTAGE_SAG: f64 = 2.0;

/// Synthesized servo telemetry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Telemetry {
    /// Controller temperature (°C), in `[25, 70]`.
    pub temperature: f64,
    /// Bus voltage (V), in `[22, 24]`.
    pub voltage: f64,
}

impl Telemetry {
    /// Telemetry of a servo applying `torque` with limit `maximum_torque`.
    pub fn from_torque(torque: f64, maximum_torque: f64) -> Self {
        let load = load_ratio(torque, maximum_torque);
        Self {
            temperature: FULL_LOAD_TEMPERATURE_RISE.mul_add(load, IDLE_TEMPERATURE),
            voltage: (-FULL_LOAD_VOLTAGE_SAG).mul_add(load, NOMINAL_VOLTAGE),
        }
    }

    /// Telemetry of an idle servo.
    pub const fn idle() -> Self {
        Self {
            temperature: IDLE_TEMPERATURE,
            voltage: NOMINAL_VOLTAGE,
        }
    }
}

/// `|torque| / maximum_torque` clamped to `[0, 1]`; 0 for degenerate inputs.
pub fn load_ratio(torque: f64, maximum_torque: f64) -> f64 {
    if !torque.is_finite() || maximum_torque.is_nan() || maximum_torque <= 0.0 {
        return 0.0;
    }
    (torque.abs() / maximum_torque).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
