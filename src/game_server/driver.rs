//! Driver - Periodic tasks that keep a run moving
//!
//! Three independent tokio tasks share the server: the frame loop (player
//! and track), the score timer (wall clock), and the key pump (injected key
//! events). They are not synchronized with each other. The score timer
//! sleeps until the run's next score deadline, so its phase follows the run
//! start and resumes rather than the moment the driver was started. Each task has its
//! own shutdown channel and all of them stop when the driver is dropped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use crate::game_server::error::GameError;
use crate::game_server::input::{KeyBus, KeyEvent, SubscriptionId};
use crate::game_server::simulation::{GameServer, SharedGameServer};

/// One spawned task and its shutdown signal
struct PeriodicTask {
    name: &'static str,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    fn spawn<F, Fut>(runtime: &Handle, name: &'static str, body: F) -> Self
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = runtime.spawn(body(shutdown_rx));
        Self {
            name,
            shutdown_tx,
            handle,
        }
    }

    fn signal(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Owns the periodic work for a shared game server
pub struct SessionDriver {
    tasks: Vec<PeriodicTask>,
    keys: KeyBus,
    subscription: SubscriptionId,
}

impl SessionDriver {
    /// Start all tasks on the current tokio runtime
    pub fn start(server: SharedGameServer, keys: &KeyBus) -> Result<Self, GameError> {
        let runtime = Handle::try_current().map_err(|e| GameError::NoRuntime(e.to_string()))?;
        Ok(Self::start_on(&runtime, server, keys))
    }

    /// Start all tasks on the given runtime
    pub fn start_on(runtime: &Handle, server: SharedGameServer, keys: &KeyBus) -> Self {
        let (frame_period, score_period, score_rearm) = {
            let server = lock(&server);
            (
                server.config().frame_period(),
                server.config().score_period(),
                server.score_rearm(),
            )
        };
        let (subscription, key_rx) = keys.subscribe();

        let frame_server = Arc::clone(&server);
        let score_server = Arc::clone(&server);
        let key_server = server;

        let tasks = vec![
            PeriodicTask::spawn(runtime, "frame loop", move |shutdown| {
                run_frame_loop(frame_server, frame_period, shutdown)
            }),
            PeriodicTask::spawn(runtime, "score timer", move |shutdown| {
                run_score_timer(score_server, score_rearm, shutdown)
            }),
            PeriodicTask::spawn(runtime, "key pump", move |shutdown| {
                run_key_pump(key_server, key_rx, shutdown)
            }),
        ];

        log::info!(
            "Driver started: frame every {:?}, score every {:?}",
            frame_period,
            score_period
        );

        Self {
            tasks,
            keys: keys.clone(),
            subscription,
        }
    }

    /// Signal every task and wait for them to exit
    pub async fn shutdown(mut self) {
        self.keys.unsubscribe(self.subscription);
        for task in std::mem::take(&mut self.tasks) {
            task.signal();
            if let Err(e) = task.handle.await {
                log::warn!("{} ended abnormally: {}", task.name, e);
            }
        }
        log::info!("Driver stopped");
    }

    /// Whether every task is still alive
    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| !t.handle.is_finished())
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        self.keys.unsubscribe(self.subscription);
        for task in &self.tasks {
            task.signal();
            task.handle.abort();
        }
    }
}

fn lock(server: &Mutex<GameServer>) -> MutexGuard<'_, GameServer> {
    server.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_frame_loop(
    server: SharedGameServer,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut frames = interval(period);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                lock(&server).tick();
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

async fn run_score_timer(
    server: SharedGameServer,
    rearm: Arc<Notify>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let due = lock(&server).next_score_due();
        tokio::select! {
            _ = wait_for(due) => {
                lock(&server).accrue_score(Instant::now());
            }
            // Deadline moved; recompute it
            _ = rearm.notified() => {}
            _ = shutdown_rx.recv() => break,
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn run_key_pump(
    server: SharedGameServer,
    mut key_rx: mpsc::UnboundedReceiver<KeyEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = key_rx.recv() => match event {
                Some(event) => {
                    lock(&server).handle_key(event, Instant::now());
                }
                None => break,
            },
            _ = shutdown_rx.recv() => break,
        }
    }
}
