//! Capture/input backend abstraction
//!
//! This module provides a platform-agnostic interface for screen capture and
//! input synthesis, with a portable generic implementation and a native
//! implementation that talks to the display server directly.

pub mod factory;
pub mod generic;
pub mod native;

use image::RgbaImage;
use serde::Serialize;

use crate::error::{AutomationError, Result};
use crate::input::MouseButton;
use crate::screenshot::Screenshot;

pub use factory::{
    BackendKind, auto_select, available_backends, backend_info, comparison_table, create_backend,
};

/// Static description of what a backend can do
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapabilityDescriptor {
    /// Backend name (e.g. "Generic", "Native X11")
    pub name: &'static str,
    /// Can capture a window without activating it
    pub background_capture: bool,
    /// Can deliver input to a process without activating it
    pub background_input: bool,
    /// Needs the OS accessibility/input-injection permission
    pub requires_accessibility: bool,
    /// Needs the OS screen-recording permission
    pub requires_screen_recording: bool,
    /// Approximate throughput relative to the generic backend
    pub performance_multiplier: f32,
    /// Platform the backend runs on
    pub platform: &'static str,
}

/// Trait for capture/input backend implementations.
///
/// Input methods return a human-readable acknowledgement for the planning
/// client. Every action pauses for the backend's configured action delay
/// after it completes.
pub trait Backend: Send {
    fn capabilities(&self) -> CapabilityDescriptor;

    /// Rasterize the full display, persisting it to the capture directory
    /// when `persist` is set
    fn capture(&self, persist: bool) -> Result<Screenshot>;

    fn screen_size(&self) -> Result<(u32, u32)>;

    fn cursor_position(&self) -> Result<(String, (i32, i32))>;

    fn pointer_move(&self, x: i32, y: i32) -> Result<String>;

    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<String>;

    fn double_click(&self, x: i32, y: i32) -> Result<String>;

    fn drag(&self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> Result<String>;

    /// Scroll by `amount` lines (positive scrolls up), optionally after
    /// moving to `at`
    fn scroll(&self, amount: i32, at: Option<(i32, i32)>) -> Result<String>;

    /// Press a `+`-joined key combination such as `command+s`
    fn key_press(&self, combo: &str) -> Result<String>;

    fn type_text(&self, text: &str) -> Result<String>;

    /// Capture the window of `pid` without activating it.
    ///
    /// `Ok(None)` when the process owns no window or every capture strategy
    /// failed.
    fn background_capture(&self, pid: u32) -> Result<Option<RgbaImage>> {
        let _ = pid;
        Err(self.not_supported("background capture"))
    }

    /// Deliver a key combination to `pid` without activating it.
    ///
    /// `Ok(false)` when the process no longer exists.
    fn background_key(&self, pid: u32, combo: &str) -> Result<bool> {
        let _ = (pid, combo);
        Err(self.not_supported("background input"))
    }

    /// Deliver a click to `pid` without activating it
    fn background_click(&self, pid: u32, x: i32, y: i32, button: MouseButton) -> Result<bool> {
        let _ = (pid, x, y, button);
        Err(self.not_supported("background input"))
    }

    /// Type `text` into `pid` without activating it.
    ///
    /// `Ok(false)` when the process no longer exists.
    fn background_type(&self, pid: u32, text: &str) -> Result<bool> {
        let _ = (pid, text);
        Err(self.not_supported("background input"))
    }

    #[doc(hidden)]
    fn not_supported(&self, operation: &'static str) -> AutomationError {
        AutomationError::NotSupported {
            backend: self.capabilities().name,
            operation,
        }
    }
}

/// First 50 characters of typed text, for acknowledgement messages
pub(crate) fn preview(text: &str) -> String {
    const LIMIT: usize = 50;
    if text.chars().count() > LIMIT {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
