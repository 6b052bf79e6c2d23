//! Simulation - Main game server and state machine
//!
//! Owns the menu / playing / game-over lifecycle, drives the run once per
//! frame, keeps the highscore, and provides the interface for Tauri commands.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::game_server::error::GameError;
use crate::game_server::highscore::HighscoreStore;
use crate::game_server::input::{InputTranslator, KeyEvent, KeyResponse};
use crate::game_server::session::{RunSession, RunnerConfig, SessionSnapshot};

/// Top-level game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Menu,
    Playing,
    GameOver,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub tick_rate: f32,
    pub avg_tick_time_ms: f32,
    pub frame_count: u64,
    pub segment_count: u32,
    pub game_state: GameState,
}

/// Result of a finished run, shown on the game-over screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverReport {
    pub score: u32,
    pub highscore: u32,
    pub is_new_highscore: bool,
}

/// Called once per fall-off
pub type GameOverListener = Box<dyn FnMut(&GameOverReport) + Send>;

/// Main game server
pub struct GameServer {
    /// Current game state
    state: GameState,
    /// Configuration every run is built from
    config: RunnerConfig,
    /// Active run (kept through game over, dropped on return to menu)
    session: Option<RunSession>,
    /// Held-key intents
    input: InputTranslator,
    /// Durable best score
    highscore: HighscoreStore,
    /// Outcome of the last finished run
    last_report: Option<GameOverReport>,
    /// Game-over subscribers
    listeners: Vec<GameOverListener>,
    /// Last frame timestamp
    last_tick: Instant,
    /// Recent tick durations for averaging
    tick_times: Vec<f32>,
    /// Frames simulated since the server was created
    frame_count: u64,
    /// Wakes the score timer when the score deadline moves
    score_rearm: Arc<Notify>,
}

impl GameServer {
    /// Create a new game server
    pub fn new(config: RunnerConfig, highscore: HighscoreStore) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self::from_parts(config, highscore))
    }

    fn from_parts(config: RunnerConfig, highscore: HighscoreStore) -> Self {
        Self {
            state: GameState::Menu,
            input: InputTranslator::new(config.max_intent),
            config,
            session: None,
            highscore,
            last_report: None,
            listeners: Vec::new(),
            last_tick: Instant::now(),
            tick_times: Vec::with_capacity(60),
            frame_count: 0,
            score_rearm: Arc::new(Notify::new()),
        }
    }

    /// menu -> playing
    pub fn start(&mut self, now: Instant) -> Result<(), GameError> {
        self.expect_state(GameState::Menu, "start")?;
        self.begin_run(now);
        Ok(())
    }

    /// game over -> playing
    pub fn restart(&mut self, now: Instant) -> Result<(), GameError> {
        self.expect_state(GameState::GameOver, "restart")?;
        self.begin_run(now);
        Ok(())
    }

    /// game over -> menu
    pub fn main_menu(&mut self) -> Result<(), GameError> {
        self.expect_state(GameState::GameOver, "return to menu")?;
        self.session = None;
        self.input.clear();
        self.state = GameState::Menu;
        log::info!("Returned to main menu");
        Ok(())
    }

    /// Reset the current run in place
    pub fn reset_game(&mut self, now: Instant) -> Result<(), GameError> {
        self.expect_state(GameState::Playing, "reset")?;
        self.begin_run(now);
        Ok(())
    }

    fn begin_run(&mut self, now: Instant) {
        match &mut self.session {
            Some(session) => session.restart(now),
            None => {
                let mut session = RunSession::new(&self.config);
                session.restart(now);
                self.session = Some(session);
            }
        }
        self.input.clear();
        self.last_report = None;
        self.last_tick = now;
        self.state = GameState::Playing;
        self.score_rearm.notify_one();
        log::info!("Run started");
    }

    fn expect_state(&self, expected: GameState, command: &'static str) -> Result<(), GameError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GameError::InvalidTransition {
                from: self.state,
                command,
            })
        }
    }

    /// Pause or resume the run. Only valid while playing.
    pub fn set_paused(&mut self, paused: bool, now: Instant) -> Result<(), GameError> {
        self.expect_state(GameState::Playing, if paused { "pause" } else { "resume" })?;
        let Some(session) = &mut self.session else {
            return Ok(());
        };
        if session.paused == paused {
            return Ok(());
        }

        session.set_paused(paused, now);
        self.score_rearm.notify_one();
        if !paused {
            // Paused time must not show up as one huge frame
            self.last_tick = now;
        }
        log::info!("Run {}", if paused { "paused" } else { "resumed" });
        Ok(())
    }

    pub fn toggle_pause(&mut self, now: Instant) -> Result<(), GameError> {
        let paused = self.is_paused();
        self.set_paused(!paused, now)
    }

    /// Feed a key event. Pause toggles only apply while playing.
    pub fn handle_key(&mut self, event: KeyEvent, now: Instant) -> KeyResponse {
        let mut response = self.input.handle(event);
        if response.pause_toggled {
            response.pause_toggled = self.toggle_pause(now).is_ok();
        }
        response
    }

    /// Perform a single simulation tick, timed against the previous one
    pub fn tick(&mut self) -> Option<SessionSnapshot> {
        if !self.is_simulating() {
            return self.get_snapshot();
        }

        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.tick_with_delta(delta, now)
    }

    /// Perform a single simulation tick with an explicit frame delta
    pub fn tick_with_delta(&mut self, delta: f32, now: Instant) -> Option<SessionSnapshot> {
        if !self.is_simulating() {
            return self.get_snapshot();
        }

        let tick_start = std::time::Instant::now();

        let intent = self.input.intent();
        let fell_off = self
            .session
            .as_mut()
            .and_then(|session| session.update(delta, intent))
            .is_some_and(|result| result.fell_off);

        if fell_off {
            self.finish_run(now);
        }

        // Record tick time
        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > 60 {
            self.tick_times.remove(0);
        }
        self.frame_count += 1;

        self.get_snapshot()
    }

    fn is_simulating(&self) -> bool {
        self.state == GameState::Playing && self.session.as_ref().is_some_and(|s| !s.paused)
    }

    /// Convert elapsed unpaused time into score. Returns units added.
    pub fn accrue_score(&mut self, now: Instant) -> u32 {
        if self.state != GameState::Playing {
            return 0;
        }
        self.session
            .as_mut()
            .map(|session| session.score.accrue(now))
            .unwrap_or(0)
    }

    fn finish_run(&mut self, now: Instant) {
        let Some(session) = &mut self.session else {
            return;
        };
        session.score.pause(now);
        let score = session.score.score();

        let is_new_highscore = self.highscore.record(score);
        let report = GameOverReport {
            score,
            highscore: self.highscore.get(),
            is_new_highscore,
        };
        self.state = GameState::GameOver;
        self.input.clear();
        self.last_report = Some(report);
        log::info!(
            "Game over with score {} (highscore {}{})",
            report.score,
            report.highscore,
            if is_new_highscore { ", new" } else { "" }
        );

        for listener in &mut self.listeners {
            listener(&report);
        }
    }

    /// Subscribe to game-over notifications
    pub fn on_game_over(&mut self, listener: impl FnMut(&GameOverReport) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Current score (0 with no run)
    pub fn score(&self) -> u32 {
        self.session.as_ref().map(|s| s.score.score()).unwrap_or(0)
    }

    /// When the score timer should next accrue. `None` while nothing accrues.
    pub fn next_score_due(&self) -> Option<Instant> {
        if self.state != GameState::Playing {
            return None;
        }
        self.session.as_ref().and_then(|s| s.score.next_due())
    }

    /// Notified whenever the score deadline moves (run start, pause, resume)
    pub fn score_rearm(&self) -> Arc<Notify> {
        Arc::clone(&self.score_rearm)
    }

    pub fn is_paused(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.paused)
    }

    pub fn highscore(&self) -> u32 {
        self.highscore.get()
    }

    /// Forget the stored highscore
    pub fn reset_stats(&mut self) {
        self.highscore.clear();
        log::info!("Highscore cleared");
    }

    pub fn last_report(&self) -> Option<GameOverReport> {
        self.last_report
    }

    /// Current (lateral, vertical) intent
    pub fn intent(&self) -> (i32, i32) {
        self.input.intent()
    }

    pub fn session(&self) -> Option<&RunSession> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Get current run snapshot
    pub fn get_snapshot(&self) -> Option<SessionSnapshot> {
        self.session.as_ref().map(|session| SessionSnapshot {
            state: self.state,
            paused: session.paused,
            score: session.score.score(),
            highscore: self.highscore.get(),
            player: session.player.position(),
            camera: session.player.camera(),
            segments: session.track.segments().to_vec(),
        })
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            tick_rate: self.config.frame_rate,
            avg_tick_time_ms: avg_tick_time,
            frame_count: self.frame_count,
            segment_count: self.config.segment_count as u32,
            game_state: self.state,
        }
    }

    /// Get current game state
    pub fn get_state(&self) -> GameState {
        self.state
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::from_parts(RunnerConfig::default(), HighscoreStore::default())
    }
}

/// Thread-safe game server wrapper shared by the driver and the host
pub type SharedGameServer = Arc<Mutex<GameServer>>;

/// Create a new shared game server
pub fn create_shared_server(server: GameServer) -> SharedGameServer {
    Arc::new(Mutex::new(server))
}
