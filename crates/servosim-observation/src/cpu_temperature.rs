//! CPU temperature source with a hysteresis warning.

use std::path::Path;

use servosim_core::Dictionary;
use tracing::warn;

use crate::{error::ObservationError, source::Source};

/// Observation key of the CPU temperature.
pub const CPU_TEMPERATURE_PREFIX: &str = "cpu_temperature";

/// Temperature above which throttling may occur (°C).
pub const CONCERNING_TEMPERATURE: f64 = 75.0;

/// The warning clears once the temperature drops below this fraction of
/// [`CONCERNING_TEMPERATURE`].
pub const HYSTERESIS_FACTOR: f64 = 0.95;

/// Temperature below which a raised warning clears (°C).
pub const CLEAR_TEMPERATURE: f64 = HYSTERESIS_FACTOR * CONCERNING_TEMPERATURE;

/// Hysteresis state of the overheating warning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WarningState {
    #[default]
    Normal,
    /// Warned above [`CONCERNING_TEMPERATURE`], not yet back under
    /// [`CLEAR_TEMPERATURE`].
    Warned,
}

impl WarningState {
    /// Next state after a reading (°C).
    #[must_use]
    pub fn next(self, temperature: f64) -> Self {
        match self {
            Self::Normal if temperature > CONCERNING_TEMPERATURE => Self::Warned,
            Self::Warned if temperature < CLEAR_TEMPERATURE => Self::Normal,
            state => state,
        }
    }
}

/// Latest CPU temperature reading.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CpuTemperature {
    temperature: f64,
    warning: WarningState,
    is_disabled: bool,
}

impl CpuTemperature {
    pub const fn new() -> Self {
        Self {
            temperature: 0.0,
            warning: WarningState::Normal,
            is_disabled: false,
        }
    }

    /// Record a reading (°C). Warns once when it crosses
    /// [`CONCERNING_TEMPERATURE`].
    pub fn update(&mut self, temperature: f64) {
        self.temperature = temperature;
        let next = self.warning.next(temperature);
        if self.warning == WarningState::Normal && next == WarningState::Warned {
            warn!(
                temperature,
                "CPU temperature > {CONCERNING_TEMPERATURE} °C, thermal throttling may occur"
            );
        }
        self.warning = next;
    }

    /// Stop writing observations.
    pub fn disable(&mut self) {
        self.is_disabled = true;
    }

    pub const fn is_disabled(&self) -> bool {
        self.is_disabled
    }

    pub const fn warning(&self) -> WarningState {
        self.warning
    }

    pub const fn has_warned(&self) -> bool {
        matches!(self.warning, WarningState::Warned)
    }

    /// Latest reading (°C), 0 before the first one.
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Source for CpuTemperature {
    fn prefix(&self) -> &str {
        CPU_TEMPERATURE_PREFIX
    }

    fn write(&mut self, observation: &mut Dictionary) {
        if self.is_disabled {
            return;
        }
        observation.insert(CPU_TEMPERATURE_PREFIX, self.temperature);
    }
}

/// Read a temperature file in millidegrees Celsius, as exposed by Linux
/// thermal zones, and return degrees Celsius.
pub fn read_millidegrees(path: impl AsRef<Path>) -> Result<f64, ObservationError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ObservationError::Io {
        path: path.to_owned(),
        source,
    })?;
    content
        .trim()
        .parse::<f64>()
        .map(|millidegrees| millidegrees / 1000.0)
        .map_err(|_| ObservationError::InvalidReading {
            path: path.to_owned(),
            content,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
