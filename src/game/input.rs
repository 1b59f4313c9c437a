use std::{
    collections::HashMap,
    time::Duration
};

use serde::{
    Deserialize,
    Serialize
};

use crate::TOUCH_KEY;

/// Raw host input, keys named like browser `KeyboardEvent.key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputEvent {
    KeyDown { key: String },
    KeyUp { key: String },
    TouchStart,
    TouchEnd,
}

impl InputEvent {
    pub fn key_down<S: AsRef<str>>(key: S) -> Self {
        Self::KeyDown { key: key.as_ref().to_string() }
    }

    pub fn key_up<S: AsRef<str>>(key: S) -> Self {
        Self::KeyUp { key: key.as_ref().to_string() }
    }
}

/// Held inputs and the moment each was first pressed.
#[derive(Debug, Default)]
pub struct InputState {
    pressed_at: HashMap<String, Duration>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &InputEvent, now: Duration) {
        match event {
            InputEvent::KeyDown { key } => self.press(key, now),
            InputEvent::KeyUp { key } => self.release(key),
            InputEvent::TouchStart => self.press(TOUCH_KEY, now),
            InputEvent::TouchEnd => self.release(TOUCH_KEY),
        }
    }

    /// Key-repeat presses of a held key keep the original timestamp.
    pub fn press(&mut self, key: &str, now: Duration) {
        if !self.pressed_at.contains_key(key) {
            log::trace!("Key '{key}' down at {now:?}");
            self.pressed_at.insert(key.to_string(), now);
        }
    }

    pub fn release(&mut self, key: &str) {
        if self.pressed_at.remove(key).is_some() {
            log::trace!("Key '{key}' up");
        }
    }

    pub fn is_down(&self, key: &str) -> bool {
        self.pressed_at.contains_key(key)
    }

    pub fn pressed_at(&self, key: &str) -> Option<Duration> {
        self.pressed_at.get(key).copied()
    }

    /// Whether `key` is held and was pressed within `(from, to]`. Consecutive
    /// windows share an end, so each press lands in exactly one of them.
    pub fn pressed_between(&self, key: &str, from: Duration, to: Duration) -> bool {
        self.pressed_at(key)
            .is_some_and(|at| from < at && at <= to)
    }

    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.pressed_at.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.pressed_at.clear();
    }
}
