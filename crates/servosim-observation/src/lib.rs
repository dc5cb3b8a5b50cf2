// servosim-observation: observation sources outside the actuation cycle.
//
// A `Source` writes its readings under its own prefix of the observation
// tree; an `ObserverPipeline` runs sources in order. Readings pushed from
// other threads reach their source through `TemperatureSubscriber`.

pub mod cpu_temperature;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod subscriber;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        cpu_temperature::{CPU_TEMPERATURE_PREFIX, CpuTemperature, WarningState, read_millidegrees},
        error::ObservationError,
        pipeline::ObserverPipeline,
        source::Source,
        subscriber::{TemperaturePublisher, TemperatureSubscriber},
    };
}

pub use pipeline::ObserverPipeline;
pub use source::Source;
