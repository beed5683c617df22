//! Session layer: contexts, their configuration and events

pub mod config;
pub mod context;
pub mod events;
pub mod window;

pub use config::ContextConfig;
pub use context::{AutomationContext, ContextStats};
pub use events::{Event, EventKind};
