//! Error types for the breakflow_core library.

use crate::types::EngineState;
use crate::media::MediaError;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for breakflow_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command was issued in a state where it is not legal.
    /// The engine state is left untouched.
    #[error("'{command}' is not allowed while {state}")]
    InvalidTransition {
        command: &'static str,
        state: EngineState,
    },

    /// A break command that conflicts with the current rest mode
    #[error("'{command}' is not allowed {}", rest_phrase(.resting))]
    RestMode {
        command: &'static str,
        resting: bool,
    },

    /// Checkpoint label does not belong to the displayed exercise
    #[error("Exercise '{exercise}' has no checkpoint '{label}'")]
    UnknownCheckpoint { exercise: String, label: String },

    /// Camera could not be acquired
    #[error("Camera error: {0}")]
    Media(#[from] MediaError),

    /// Session settings rejected at configuration time
    #[error("Invalid session settings: {0}")]
    InvalidSettings(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),
}

fn rest_phrase(resting: &bool) -> &'static str {
    if *resting {
        "while resting"
    } else {
        "outside rest mode"
    }
}

impl Error {
    /// Rejected commands are expected during normal use and are never fatal.
    pub fn is_rejected_command(&self) -> bool {
        matches!(
            self,
            Error::InvalidTransition { .. }
                | Error::RestMode { .. }
                | Error::UnknownCheckpoint { .. }
        )
    }
}
