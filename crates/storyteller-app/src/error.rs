//! Storyteller: application error types.

use storyteller_core::error::SequencerError;
use thiserror::Error;

/// Startup and runtime errors for the console application.
#[derive(Debug, Error)]
pub enum AppError {
    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The settings file could not be parsed.
    #[error("settings error: {0}")]
    Settings(#[from] serde_yaml::Error),

    /// Terminal or file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A page refused an action.
    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    /// A page stopped before reaching the expected state.
    #[error("page closed before {0}")]
    PageClosed(&'static str),
}
