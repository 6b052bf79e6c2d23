//! Game Server Module
//!
//! Runs the endless-runner simulation in Rust: player integration, track
//! recycling, score timing, input intents, highscore persistence and the
//! menu / playing / game-over state machine.
//! Communicates with the JS frontend via Tauri commands when built with the
//! `desktop` feature.

pub mod driver;
pub mod error;
pub mod highscore;
pub mod input;
pub mod player;
pub mod score;
pub mod session;
pub mod simulation;
pub mod track;

pub use driver::SessionDriver;
pub use error::{GameError, StoreError};
pub use highscore::{HighscoreStore, JsonFileStore, KeyValueStore, MemoryStore, HIGHSCORE_KEY};
pub use input::{
    InputTranslator, Key, KeyBus, KeyEvent, KeyEventKind, KeyResponse, SubscriptionId,
};
pub use player::{CameraPose, PlayerController, PlayerState, TickResult, Vec3};
pub use score::{format_clock, ScoreKeeper};
pub use session::{RunSession, RunnerConfig, SessionSnapshot};
pub use simulation::{
    create_shared_server, GameOverReport, GameServer, GameState, ServerStats, SharedGameServer,
};
pub use track::{TrackRecycler, TrackSegment};
