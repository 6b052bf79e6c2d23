//! Session - Run configuration and per-run state
//!
//! A run owns the player, the track and the score keeper. It is created on
//! start, reset on restart and dropped when returning to the menu.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::game_server::error::GameError;
use crate::game_server::player::{CameraPose, PlayerController, TickResult, Vec3};
use crate::game_server::score::ScoreKeeper;
use crate::game_server::simulation::GameState;
use crate::game_server::track::{TrackRecycler, TrackSegment};

/// Accepted frame rates (Hz); the frame period must stay representable
pub const MIN_FRAME_RATE: f32 = 1.0;
pub const MAX_FRAME_RATE: f32 = 1000.0;

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Constant forward speed (units/s)
    pub forward_speed: f32,
    /// Speed per intent step, both axes (units/s)
    pub lateral_speed: f32,
    /// Number of track segments
    pub segment_count: usize,
    /// Length of each segment along z
    pub segment_length: f32,
    /// Width of the track
    pub segment_width: f32,
    /// Half the player's width, keeps the player fully on the track
    pub player_half_width: f32,
    /// Spawn position
    pub player_start: Vec3,
    /// Run ends once the player's y drops below this
    pub fall_threshold: f32,
    /// Downward acceleration after leaving the track
    pub gravity: f32,
    /// Camera position relative to the player
    pub camera_offset: Vec3,
    /// How far ahead of the player the camera looks
    pub look_ahead: f32,
    /// Intent accumulator clamp
    pub max_intent: i32,
    /// Wall-clock time per score unit (ms)
    pub score_period_ms: u64,
    /// Frame loop rate for the async driver (frames/s)
    pub frame_rate: f32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            forward_speed: 6.0,
            lateral_speed: 6.0,
            segment_count: 10,
            segment_length: 20.0,
            segment_width: 20.0,
            player_half_width: 1.0,
            player_start: Vec3::new(0.0, 1.0, 0.0),
            fall_threshold: -5.0,
            gravity: 9.81,
            camera_offset: Vec3::new(0.0, 3.0, 8.0),
            look_ahead: 5.0,
            max_intent: 3,
            score_period_ms: 1000,
            frame_rate: 60.0,
        }
    }
}

impl RunnerConfig {
    /// Largest |x| the player may reach
    pub fn lateral_bound(&self) -> f32 {
        self.segment_width / 2.0 - self.player_half_width
    }

    pub fn score_period(&self) -> Duration {
        Duration::from_millis(self.score_period_ms)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frame_rate)
    }

    /// Reject configs the simulation cannot run with
    pub fn validate(&self) -> Result<(), GameError> {
        let finite = [
            self.forward_speed,
            self.lateral_speed,
            self.segment_length,
            self.segment_width,
            self.player_half_width,
            self.player_start.x,
            self.player_start.y,
            self.player_start.z,
            self.fall_threshold,
            self.gravity,
            self.camera_offset.x,
            self.camera_offset.y,
            self.camera_offset.z,
            self.look_ahead,
            self.frame_rate,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(GameError::InvalidConfig("all values must be finite".into()));
        }
        if self.segment_count == 0 {
            return Err(GameError::InvalidConfig("segment_count must be at least 1".into()));
        }
        if self.segment_length <= 0.0 || self.segment_width <= 0.0 {
            return Err(GameError::InvalidConfig("segment size must be positive".into()));
        }
        if self.player_half_width < 0.0 || self.lateral_bound() < 0.0 {
            return Err(GameError::InvalidConfig(format!(
                "player half width {} does not fit on a track {} wide",
                self.player_half_width, self.segment_width
            )));
        }
        if self.fall_threshold >= self.player_start.y {
            return Err(GameError::InvalidConfig(
                "fall_threshold must be below the spawn height".into(),
            ));
        }
        if self.max_intent < 0 {
            return Err(GameError::InvalidConfig("max_intent must not be negative".into()));
        }
        if self.score_period_ms == 0 {
            return Err(GameError::InvalidConfig("score_period_ms must be positive".into()));
        }
        if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&self.frame_rate) {
            return Err(GameError::InvalidConfig(format!(
                "frame_rate must be within {}..={}",
                MIN_FRAME_RATE, MAX_FRAME_RATE
            )));
        }
        Ok(())
    }
}

/// State of one run
#[derive(Debug, Clone)]
pub struct RunSession {
    pub player: PlayerController,
    pub track: TrackRecycler,
    pub score: ScoreKeeper,
    pub paused: bool,
}

impl RunSession {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            player: PlayerController::new(config),
            track: TrackRecycler::new(
                config.segment_count,
                config.segment_length,
                config.segment_width,
            ),
            score: ScoreKeeper::new(config.score_period()),
            paused: false,
        }
    }

    /// Back to the initial layout with score accrual running from `now`
    pub fn restart(&mut self, now: Instant) {
        self.player.reset();
        self.track.reset();
        self.score.reset();
        self.score.start(now);
        self.paused = false;
    }

    pub fn set_paused(&mut self, paused: bool, now: Instant) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.score.pause(now);
        } else {
            self.score.start(now);
        }
    }

    /// One frame: move the player, then recycle against the new position.
    /// Returns `None` while paused.
    pub fn update(&mut self, delta: f32, intent: (i32, i32)) -> Option<TickResult> {
        if self.paused {
            return None;
        }

        let (lateral, vertical) = intent;
        let result = self.player.tick(delta, lateral, vertical, &self.track);

        // A finished run leaves the track where it was
        if !result.fell_off {
            self.track.recycle(self.player.position().z);
        }

        Some(result)
    }
}

/// Compact run snapshot for IPC transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: GameState,
    pub paused: bool,
    pub score: u32,
    pub highscore: u32,
    pub player: Vec3,
    pub camera: CameraPose,
    pub segments: Vec<TrackSegment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunnerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lateral_bound(), 9.0);
        assert_eq!(config.score_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_configs() {
        let bad = [
            RunnerConfig {
                segment_count: 0,
                ..Default::default()
            },
            RunnerConfig {
                segment_length: -1.0,
                ..Default::default()
            },
            RunnerConfig {
                player_half_width: 11.0,
                ..Default::default()
            },
            RunnerConfig {
                score_period_ms: 0,
                ..Default::default()
            },
            RunnerConfig {
                frame_rate: f32::NAN,
                ..Default::default()
            },
            RunnerConfig {
                frame_rate: 1e9,
                ..Default::default()
            },
            RunnerConfig {
                frame_rate: 1e-6,
                ..Default::default()
            },
            RunnerConfig {
                frame_rate: 0.0,
                ..Default::default()
            },
            RunnerConfig {
                fall_threshold: 2.0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_frame_rate_limits_give_usable_periods() {
        for frame_rate in [MIN_FRAME_RATE, MAX_FRAME_RATE] {
            let config = RunnerConfig {
                frame_rate,
                ..Default::default()
            };
            assert!(config.validate().is_ok());
            assert!(!config.frame_period().is_zero());
        }
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{"segment_count": 4, "forward_speed": 10.0}"#).unwrap();
        assert_eq!(config.segment_count, 4);
        assert_eq!(config.forward_speed, 10.0);
        assert_eq!(config.segment_length, 20.0);
    }

    #[test]
    fn test_update_moves_then_recycles() {
        let config = RunnerConfig::default();
        let mut session = RunSession::new(&config);
        // 25 units forward in one frame
        let result = session.update(25.0 / 6.0, (0, 0)).unwrap();
        assert!(!result.fell_off);
        assert_eq!(session.track.segments()[0].z, -200.0);
    }

    #[test]
    fn test_paused_update_is_noop() {
        let now = Instant::now();
        let config = RunnerConfig::default();
        let mut session = RunSession::new(&config);
        session.restart(now);
        session.set_paused(true, now);
        assert!(session.update(1.0, (3, 3)).is_none());
        assert_eq!(session.player.position(), config.player_start);
        assert!(!session.score.is_running());

        session.set_paused(false, now);
        assert!(session.score.is_running());
        assert!(session.update(1.0, (0, 0)).is_some());
    }
}
