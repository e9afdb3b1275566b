use thiserror::Error;

use crate::config::SettingKey;

/// Plugin-specific error types
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Settings listener for '{key}' failed: {message}")]
    Listener { key: SettingKey, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Host communication error: {0}")]
    Communication(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

impl PluginError {
    /// Create a configuration error
    pub fn config(msg: &str) -> Self {
        PluginError::Configuration(msg.to_string())
    }

    /// Create a file system error
    pub fn filesystem(msg: &str) -> Self {
        PluginError::FileSystem(msg.to_string())
    }

    /// Create a persistence error
    pub fn persistence(msg: &str) -> Self {
        PluginError::Persistence(msg.to_string())
    }

    /// Create a listener error for a setting key
    pub fn listener(key: SettingKey, err: &anyhow::Error) -> Self {
        PluginError::Listener {
            key,
            message: format!("{:#}", err),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: &str) -> Self {
        PluginError::InvalidInput(msg.to_string())
    }

    /// Create a host communication error
    pub fn communication(msg: &str) -> Self {
        PluginError::Communication(msg.to_string())
    }

    /// Create an unknown error
    pub fn unknown(msg: &str) -> Self {
        PluginError::Unknown(msg.to_string())
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PluginError::Configuration(msg) => format!("Configuration issue: {}", msg),
            PluginError::Serialization(e) => format!("Settings data could not be read: {}", e),
            PluginError::FileSystem(msg) => format!("File operation failed: {}", msg),
            PluginError::Persistence(msg) => format!("Settings could not be saved: {}", msg),
            PluginError::Listener { key, message } => {
                format!("Applying the change to '{}' failed: {}", key, message)
            }
            PluginError::InvalidInput(msg) => format!("Invalid value: {}", msg),
            PluginError::Communication(msg) => format!("Host communication failed: {}", msg),
            PluginError::Unknown(msg) => format!("Unexpected error: {}", msg),
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            PluginError::Configuration(_) => false,
            PluginError::Serialization(_) => true,
            PluginError::FileSystem(_) => true,
            PluginError::Persistence(_) => true,
            PluginError::Listener { .. } => true,
            PluginError::InvalidInput(_) => true,
            PluginError::Communication(_) => false,
            PluginError::Unknown(_) => false,
        }
    }
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::FileSystem(err.to_string())
    }
}
