//! Endless Runner - simulation core and Tauri backend
//!
//! The `game_server` module holds the whole simulation and can be driven
//! without any window. The `desktop` feature adds the Tauri command surface.

pub mod game_server;

#[cfg(feature = "desktop")]
mod desktop;

#[cfg(feature = "desktop")]
pub use desktop::run;
