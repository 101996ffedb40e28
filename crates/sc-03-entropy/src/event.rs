//! Input events fed to the collector.

use std::time::Instant;

/// Screen coordinates of a pointer or touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// A key, pointer or touch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub at: Instant,
    /// Pointer position, if the event has one.
    pub screen: Option<Position>,
    /// Active touch points.
    pub touches: Vec<Position>,
}

impl InputEvent {
    /// Event with timing only, stamped now.
    pub fn now() -> Self {
        Self::at(Instant::now())
    }

    /// Event with timing only.
    pub fn at(at: Instant) -> Self {
        Self {
            at,
            screen: None,
            touches: Vec::new(),
        }
    }

    pub fn with_screen(mut self, x: i64, y: i64) -> Self {
        self.screen = Some(Position::new(x, y));
        self
    }

    pub fn with_touch(mut self, x: i64, y: i64) -> Self {
        self.touches.push(Position::new(x, y));
        self
    }
}
