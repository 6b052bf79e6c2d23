//! Input - Key events to movement intents
//!
//! Raw key presses become two bounded intent accumulators (lateral and
//! vertical) plus an edge-triggered pause toggle. Releasing either key of an
//! axis zeroes that axis.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    PauseToggle,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent` (`key`, `code`) pair to a game key
    pub fn from_dom(key: &str, code: &str) -> Self {
        match key {
            "ArrowLeft" => Key::Left,
            "ArrowRight" => Key::Right,
            "ArrowUp" => Key::Up,
            "ArrowDown" => Key::Down,
            _ if code == "Space" => Key::PauseToggle,
            _ => Key::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventKind {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn pressed(key: Key) -> Self {
        Self {
            key,
            kind: KeyEventKind::Pressed,
        }
    }

    pub fn released(key: Key) -> Self {
        Self {
            key,
            kind: KeyEventKind::Released,
        }
    }
}

/// What the host should do with the event it just forwarded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyResponse {
    /// Suppress the browser default (page scroll on Space)
    pub prevent_default: bool,
    /// The pause flag should flip
    pub pause_toggled: bool,
}

/// Holds the current intent pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTranslator {
    lateral: i32,
    vertical: i32,
    max_intent: i32,
}

impl InputTranslator {
    pub fn new(max_intent: i32) -> Self {
        Self {
            lateral: 0,
            vertical: 0,
            max_intent: max_intent.abs(),
        }
    }

    pub fn handle(&mut self, event: KeyEvent) -> KeyResponse {
        let max = self.max_intent;
        match (event.kind, event.key) {
            (KeyEventKind::Pressed, Key::Left) => self.lateral = (self.lateral - 1).max(-max),
            (KeyEventKind::Pressed, Key::Right) => self.lateral = (self.lateral + 1).min(max),
            (KeyEventKind::Pressed, Key::Down) => self.vertical = (self.vertical + 1).min(max),
            (KeyEventKind::Pressed, Key::Up) => self.vertical = (self.vertical - 1).max(-max),
            (KeyEventKind::Pressed, Key::PauseToggle) => {
                return KeyResponse {
                    prevent_default: true,
                    pause_toggled: true,
                };
            }
            (KeyEventKind::Released, Key::Left | Key::Right) => self.lateral = 0,
            (KeyEventKind::Released, Key::Up | Key::Down) => self.vertical = 0,
            _ => {}
        }
        KeyResponse::default()
    }

    /// Current `(lateral, vertical)` intent
    pub fn intent(&self) -> (i32, i32) {
        (self.lateral, self.vertical)
    }

    pub fn clear(&mut self) {
        self.lateral = 0;
        self.vertical = 0;
    }
}

pub type SubscriptionId = u64;

#[derive(Default)]
struct BusInner {
    next_id: SubscriptionId,
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<KeyEvent>)>,
}

/// Injected key event source. The host publishes, the driver subscribes.
#[derive(Clone, Default)]
pub struct KeyBus {
    inner: Arc<Mutex<BusInner>>,
}

impl KeyBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<KeyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, tx));
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Deliver an event to every live subscriber. Returns how many got it.
    pub fn publish(&self, event: KeyEvent) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
        inner.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dom() {
        assert_eq!(Key::from_dom("ArrowLeft", "ArrowLeft"), Key::Left);
        assert_eq!(Key::from_dom("ArrowDown", "ArrowDown"), Key::Down);
        assert_eq!(Key::from_dom(" ", "Space"), Key::PauseToggle);
        assert_eq!(Key::from_dom("a", "KeyA"), Key::Other);
    }

    #[test]
    fn test_presses_accumulate_up_to_clamp() {
        let mut input = InputTranslator::new(3);
        for _ in 0..5 {
            input.handle(KeyEvent::pressed(Key::Right));
        }
        assert_eq!(input.intent(), (3, 0));
        for _ in 0..10 {
            input.handle(KeyEvent::pressed(Key::Left));
        }
        assert_eq!(input.intent(), (-3, 0));
    }

    #[test]
    fn test_up_and_down_move_vertical() {
        let mut input = InputTranslator::new(3);
        input.handle(KeyEvent::pressed(Key::Down));
        input.handle(KeyEvent::pressed(Key::Down));
        assert_eq!(input.intent(), (0, 2));
        for _ in 0..6 {
            input.handle(KeyEvent::pressed(Key::Up));
        }
        assert_eq!(input.intent(), (0, -3));
    }

    #[test]
    fn test_release_zeroes_axis() {
        let mut input = InputTranslator::new(3);
        input.handle(KeyEvent::pressed(Key::Right));
        input.handle(KeyEvent::pressed(Key::Right));
        input.handle(KeyEvent::pressed(Key::Up));
        // Releasing the opposite key still zeroes the axis
        input.handle(KeyEvent::released(Key::Left));
        assert_eq!(input.intent(), (0, -1));
        input.handle(KeyEvent::released(Key::Down));
        assert_eq!(input.intent(), (0, 0));
    }

    #[test]
    fn test_pause_toggle_response() {
        let mut input = InputTranslator::new(3);
        let response = input.handle(KeyEvent::pressed(Key::PauseToggle));
        assert!(response.prevent_default);
        assert!(response.pause_toggled);
        assert_eq!(input.intent(), (0, 0));

        let response = input.handle(KeyEvent::released(Key::PauseToggle));
        assert_eq!(response, KeyResponse::default());
    }

    #[tokio::test]
    async fn test_bus_subscribe_publish_unsubscribe() {
        let bus = KeyBus::new();
        let (first, mut rx1) = bus.subscribe();
        let (_second, mut rx2) = bus.subscribe();

        assert_eq!(bus.publish(KeyEvent::pressed(Key::Left)), 2);
        assert_eq!(rx1.recv().await, Some(KeyEvent::pressed(Key::Left)));
        assert_eq!(rx2.recv().await, Some(KeyEvent::pressed(Key::Left)));

        bus.unsubscribe(first);
        assert_eq!(bus.publish(KeyEvent::released(Key::Left)), 1);
        assert_eq!(rx1.recv().await, None);
        assert_eq!(rx2.recv().await, Some(KeyEvent::released(Key::Left)));
    }

    #[test]
    fn test_bus_drops_closed_receivers() {
        let bus = KeyBus::new();
        let (_, rx) = bus.subscribe();
        drop(rx);
        assert_eq!(bus.publish(KeyEvent::pressed(Key::Up)), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
