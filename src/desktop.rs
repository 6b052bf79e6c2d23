//! Desktop - Tauri commands and window setup
//!
//! Owns the shared game server, the key bus and the driver for the lifetime
//! of the app. The frontend only renders snapshots and forwards keys.

use std::sync::{Arc, Mutex};

use tauri::{Emitter, Manager, State};
use tokio::time::Instant;

use crate::game_server::{
    create_shared_server, GameOverReport, GameServer, GameState, HighscoreStore, JsonFileStore,
    Key, KeyBus, KeyEvent, KeyResponse, MemoryStore, RunnerConfig, ServerStats, SessionDriver,
    SessionSnapshot, SharedGameServer,
};

/// Driver slot, emptied on exit so the periodic tasks stop
struct DriverSlot(Mutex<Option<SessionDriver>>);

/// Start a run from the main menu
#[tauri::command]
fn start_game(server: State<'_, SharedGameServer>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.start(Instant::now()).map_err(|e| e.to_string())
}

/// Start a new run from the game-over screen
#[tauri::command]
fn restart_game(server: State<'_, SharedGameServer>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.restart(Instant::now()).map_err(|e| e.to_string())
}

/// Leave the game-over screen for the main menu
#[tauri::command]
fn main_menu(server: State<'_, SharedGameServer>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.main_menu().map_err(|e| e.to_string())
}

/// Reset the current run in place
#[tauri::command]
fn reset_game(server: State<'_, SharedGameServer>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.reset_game(Instant::now()).map_err(|e| e.to_string())
}

/// Pause or resume the run
#[tauri::command]
fn set_paused(server: State<'_, SharedGameServer>, paused: bool) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server
        .set_paused(paused, Instant::now())
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn is_paused(server: State<'_, SharedGameServer>) -> Result<bool, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.is_paused())
}

#[tauri::command]
fn get_score(server: State<'_, SharedGameServer>) -> Result<u32, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.score())
}

#[tauri::command]
fn get_highscore(server: State<'_, SharedGameServer>) -> Result<u32, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.highscore())
}

/// Forget the stored highscore
#[tauri::command]
fn reset_stats(server: State<'_, SharedGameServer>) -> Result<(), String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    server.reset_stats();
    Ok(())
}

/// Forward a DOM key event; the response says whether to `preventDefault`
#[tauri::command]
fn key_event(
    server: State<'_, SharedGameServer>,
    key: String,
    code: String,
    pressed: bool,
) -> Result<KeyResponse, String> {
    let key = Key::from_dom(&key, &code);
    let event = if pressed {
        KeyEvent::pressed(key)
    } else {
        KeyEvent::released(key)
    };
    let mut server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.handle_key(event, Instant::now()))
}

/// Perform a simulation tick and return the current state
#[tauri::command]
fn tick(server: State<'_, SharedGameServer>) -> Result<Option<SessionSnapshot>, String> {
    let mut server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.tick())
}

/// Get current run snapshot without advancing simulation
#[tauri::command]
fn get_snapshot(server: State<'_, SharedGameServer>) -> Result<Option<SessionSnapshot>, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.get_snapshot())
}

/// Get the outcome of the last finished run
#[tauri::command]
fn get_last_report(
    server: State<'_, SharedGameServer>,
) -> Result<Option<GameOverReport>, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.last_report())
}

/// Get server statistics
#[tauri::command]
fn get_stats(server: State<'_, SharedGameServer>) -> Result<ServerStats, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.get_stats())
}

/// Get current game state
#[tauri::command]
fn get_game_state(server: State<'_, SharedGameServer>) -> Result<GameState, String> {
    let server = server.lock().map_err(|e| e.to_string())?;
    Ok(server.get_state())
}

fn highscore_store(app: &tauri::App) -> HighscoreStore {
    match app.path().app_data_dir() {
        Ok(dir) => HighscoreStore::new(JsonFileStore::open(dir.join("highscore.json"))),
        Err(e) => {
            log::warn!("No app data dir, highscore will not persist: {}", e);
            HighscoreStore::new(MemoryStore::new())
        }
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let mut server = GameServer::new(RunnerConfig::default(), highscore_store(app))?;
            let handle = app.handle().clone();
            server.on_game_over(move |report| {
                if let Err(e) = handle.emit("game-over", *report) {
                    log::warn!("Could not emit game-over: {}", e);
                }
            });
            let server = create_shared_server(server);

            let keys = KeyBus::new();
            let driver_server = Arc::clone(&server);
            let driver = tauri::async_runtime::block_on(async move {
                SessionDriver::start(driver_server, &keys)
            })?;

            app.manage(server);
            app.manage(DriverSlot(Mutex::new(Some(driver))));
            log::info!("Endless Runner game server initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            start_game,
            restart_game,
            main_menu,
            reset_game,
            set_paused,
            is_paused,
            get_score,
            get_highscore,
            reset_stats,
            key_event,
            tick,
            get_snapshot,
            get_last_report,
            get_stats,
            get_game_state,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| {
            if let tauri::RunEvent::Exit = event {
                let slot = app.state::<DriverSlot>();
                let driver = slot.0.lock().ok().and_then(|mut slot| slot.take());
                drop(driver);
            }
        });
}
