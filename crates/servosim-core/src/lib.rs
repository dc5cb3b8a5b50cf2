// servosim-core: configuration/observation tree, simulation parameters and
// errors shared by every servosim crate.

pub mod config;
pub mod dictionary;
pub mod error;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        config::{ResetRequest, SIM_NAMESPACE, SimParameters},
        dictionary::{Dictionary, FromValue, Value},
        error::{ConfigError, DictionaryError},
    };
}

pub use dictionary::{Dictionary, Value};
