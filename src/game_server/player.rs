//! Player - Player state and per-frame integration
//!
//! The player drifts forward (towards -z) at a constant speed, steered by
//! lateral and vertical intents. The camera follows at a fixed offset.
//! Once the player leaves the track it falls, and dropping below the
//! fall threshold ends the run.

use serde::{Deserialize, Serialize};

use crate::game_server::session::RunnerConfig;
use crate::game_server::track::TrackRecycler;

/// Plain 3D vector in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Where the camera sits and what it looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
}

/// Mutable player state, reset on every (re)start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// World position
    pub position: Vec3,
    /// Vertical velocity (units/s), only nonzero while falling
    pub vertical_velocity: f32,
    /// Set once the player has left the track; never cleared mid-run
    pub falling: bool,
}

impl PlayerState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            vertical_velocity: 0.0,
            falling: false,
        }
    }
}

/// Outcome of one player tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickResult {
    /// Player dropped below the fall threshold this tick
    pub fell_off: bool,
    pub camera: CameraPose,
}

/// Integrates the player once per frame
#[derive(Debug, Clone)]
pub struct PlayerController {
    state: PlayerState,
    start: Vec3,
    forward_speed: f32,
    lateral_speed: f32,
    lateral_bound: f32,
    fall_threshold: f32,
    gravity: f32,
    camera_offset: Vec3,
    look_ahead: f32,
}

impl PlayerController {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            state: PlayerState::at(config.player_start),
            start: config.player_start,
            forward_speed: config.forward_speed,
            lateral_speed: config.lateral_speed,
            lateral_bound: config.lateral_bound(),
            fall_threshold: config.fall_threshold,
            gravity: config.gravity,
            camera_offset: config.camera_offset,
            look_ahead: config.look_ahead,
        }
    }

    /// Put the player back at the spawn point
    pub fn reset(&mut self) {
        self.state = PlayerState::at(self.start);
    }

    /// Advance the player by `delta` seconds.
    ///
    /// Negative or non-finite deltas are treated as zero. `track` is only
    /// read to decide whether the player is still standing on it.
    pub fn tick(
        &mut self,
        delta: f32,
        lateral_intent: i32,
        vertical_intent: i32,
        track: &TrackRecycler,
    ) -> TickResult {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        let state = &mut self.state;

        // Forward drift plus intent steering
        state.position.z -= self.forward_speed * delta;
        state.position.x += lateral_intent as f32 * self.lateral_speed * delta;
        state.position.z -= vertical_intent as f32 * self.lateral_speed * delta;

        state.position.x = state
            .position
            .x
            .clamp(-self.lateral_bound, self.lateral_bound);

        if !state.falling && !track.supports(state.position.x, state.position.z) {
            log::info!(
                "Player left the track at x={:.2}, z={:.2}",
                state.position.x,
                state.position.z
            );
            state.falling = true;
        }

        if state.falling {
            state.vertical_velocity -= self.gravity * delta;
            state.position.y += state.vertical_velocity * delta;
        }

        TickResult {
            fell_off: state.position.y < self.fall_threshold,
            camera: self.camera(),
        }
    }

    /// Camera pose derived from the current player position
    pub fn camera(&self) -> CameraPose {
        let position = self.state.position;
        CameraPose {
            position: position + self.camera_offset,
            look_at: Vec3::new(position.x, position.y, position.z - self.look_ahead),
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn lateral_bound(&self) -> f32 {
        self.lateral_bound
    }
}
