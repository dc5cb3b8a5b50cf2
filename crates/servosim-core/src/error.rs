use thiserror::Error;

/// Failed typed access to a [`Dictionary`](crate::Dictionary). Keys are
/// dotted paths from the root of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error("no value at {0}")]
    MissingKey(String),

    #[error("{key} holds a {found}, wanted a {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot store {key}: {message}")]
    Unsupported { key: String, message: String },
}

/// Rejected simulation parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read parameters: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed parameter file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error("timestep must be positive, got {0} s")]
    InvalidTimestep(f64),

    #[error("{field} {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_converts() {
        let err: ConfigError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ConfigError::Io(_)));
        assert_eq!(err.to_string(), "cannot read parameters: gone");
    }

    #[test]
    fn dictionary_errors_pass_through() {
        let inner = DictionaryError::MissingKey("bullet.dt".into());
        let err: ConfigError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[test]
    fn dictionary_messages() {
        assert_eq!(
            DictionaryError::MissingKey("bullet.gui".into()).to_string(),
            "no value at bullet.gui"
        );
        assert_eq!(
            DictionaryError::TypeMismatch {
                key: "bullet.floor".into(),
                expected: "bool",
                found: "float"
            }
            .to_string(),
            "bullet.floor holds a float, wanted a bool"
        );
        assert_eq!(
            DictionaryError::Unsupported {
                key: "when".into(),
                message: "mixed arrays".into()
            }
            .to_string(),
            "cannot store when: mixed arrays"
        );
    }

    #[test]
    fn parameter_messages() {
        assert_eq!(
            ConfigError::InvalidTimestep(-0.001).to_string(),
            "timestep must be positive, got -0.001 s"
        );
        assert_eq!(
            ConfigError::InvalidValue {
                field: "torque_control_kd".into(),
                message: "must be non-negative".into()
            }
            .to_string(),
            "torque_control_kd must be non-negative"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn errors_are_send_sync() {
        assert_send_sync::<DictionaryError>();
        assert_send_sync::<ConfigError>();
    }
}
