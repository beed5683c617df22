//! Context lifecycle events and their handler registry

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;

use crate::error::{AutomationError, Result};
use crate::input::MouseButton;

/// The fixed set of events a context emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Capture,
    PointerMove,
    Click,
    KeyPress,
    ContextClose,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Capture,
        EventKind::PointerMove,
        EventKind::Click,
        EventKind::KeyPress,
        EventKind::ContextClose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Capture => "capture",
            EventKind::PointerMove => "pointerMove",
            EventKind::Click => "click",
            EventKind::KeyPress => "keyPress",
            EventKind::ContextClose => "contextClose",
        }
    }
}

impl FromStr for EventKind {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "capture" => Ok(EventKind::Capture),
            "pointerMove" | "pointer_move" => Ok(EventKind::PointerMove),
            "click" => Ok(EventKind::Click),
            "keyPress" | "key_press" => Ok(EventKind::KeyPress),
            "contextClose" | "context_close" => Ok(EventKind::ContextClose),
            other => Err(AutomationError::UnknownEvent(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to handlers
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Capture(&'a RgbaImage),
    PointerMove { x: i32, y: i32 },
    Click { x: i32, y: i32, button: MouseButton },
    KeyPress(&'a str),
    ContextClose,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Capture(_) => EventKind::Capture,
            Event::PointerMove { .. } => EventKind::PointerMove,
            Event::Click { .. } => EventKind::Click,
            Event::KeyPress(_) => EventKind::KeyPress,
            Event::ContextClose => EventKind::ContextClose,
        }
    }
}

pub type Handler = Box<dyn FnMut(&Event<'_>) -> anyhow::Result<()> + Send>;

/// Handlers per event kind, in registration order
#[derive(Default)]
pub struct EventHandlers {
    handlers: Vec<(EventKind, Handler)>,
}

impl EventHandlers {
    pub fn register<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.handlers.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Run every handler for the event's kind, stopping at the first error
    pub fn emit(&mut self, event: &Event<'_>) -> anyhow::Result<()> {
        let kind = event.kind();
        for (_, handler) in self.handlers.iter_mut().filter(|(k, _)| *k == kind) {
            handler(event)?;
        }
        Ok(())
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &self.count(kind));
        }
        map.finish()
    }
}
