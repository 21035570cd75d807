//! Error types for PetalSonic Studio

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StudioError {
    #[error("Audio system not initialized: {0}")]
    NotInitialized(String),

    #[error("Audio system already initialized")]
    AlreadyInitialized,

    #[error("Event {0} is already playing")]
    AlreadyPlaying(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Audio engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StudioError {
    /// Returns true for misuse of the API (as opposed to engine failures).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized(_)
                | Self::AlreadyInitialized
                | Self::AlreadyPlaying(_)
                | Self::InvalidState(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
