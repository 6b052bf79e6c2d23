//! Error - Failures surfaced to the host
//!
//! Ticks never fail. Commands issued in the wrong state, bad configs, storage
//! trouble and a missing async runtime are the only things reported.

use thiserror::Error;

use crate::game_server::simulation::GameState;

/// Errors from the file-backed key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the game server and its driver
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("cannot {command} while {from:?}")]
    InvalidTransition {
        from: GameState,
        command: &'static str,
    },

    #[error("periodic sources could not be started: {0}")]
    NoRuntime(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
