//! Isolated automation sessions
//!
//! An [`AutomationContext`] owns one backend and two storage directories
//! derived from its own id, so any number of contexts can run side by side
//! without touching each other's files. Every action checks that the context
//! is open, delegates to the backend, bumps the counters on success and then
//! fires the matching event synchronously.
//!
//! A context moves from open to closed exactly once. Closing fires
//! `contextClose`, releases the backend and, when configured, deletes the
//! directories the context created. Dropping a context closes it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::config::ContextConfig;
use super::events::{Event, EventHandlers, EventKind};
use crate::backend::{Backend, BackendKind, CapabilityDescriptor, create_backend};
use crate::error::{AutomationError, Result};
use crate::input::MouseButton;
use crate::screenshot::Screenshot;

/// A directory used by a context, and whether the context created it
#[derive(Debug, Clone)]
struct ContextDir {
    path: PathBuf,
    owned: bool,
}

impl ContextDir {
    /// Use the caller's directory, or create a fresh one under the temp root
    fn resolve(requested: Option<&Path>, prefix: &str, context_id: &str) -> Result<Self> {
        let (path, owned) = match requested {
            Some(path) => (path.to_path_buf(), false),
            None => (
                std::env::temp_dir().join(format!("{prefix}_{context_id}")),
                true,
            ),
        };

        fs::create_dir_all(&path).map_err(|source| AutomationError::Storage {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, owned })
    }

    fn remove(&self) {
        if !self.owned || !self.path.exists() {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!("Removed {}", self.path.display()),
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Snapshot of a context's identity and counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextStats {
    pub context_id: String,
    pub backend_name: String,
    pub created_at: DateTime<Utc>,
    pub closed: bool,
    pub action_count: u64,
    pub screenshot_count: u64,
    pub screenshot_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub metadata: Map<String, Value>,
}

impl ContextStats {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One isolated automation session
pub struct AutomationContext {
    context_id: String,
    backend: Option<Box<dyn Backend>>,
    backend_name: String,
    screenshot_dir: ContextDir,
    temp_dir: ContextDir,
    cleanup_on_close: bool,
    metadata: Map<String, Value>,
    action_count: u64,
    screenshot_count: u64,
    closed: bool,
    created_at: DateTime<Utc>,
    handlers: EventHandlers,
}

impl AutomationContext {
    /// Create a context whose backend comes from the factory.
    ///
    /// An unrecognized backend kind is rejected before anything is written
    /// to disk.
    pub fn new(config: ContextConfig) -> Result<Self> {
        let kind: BackendKind = config.backend.parse()?;
        Self::with_backend(config, move |delay, dir| create_backend(kind, delay, dir))
    }

    /// Create a context around a caller-built backend.
    ///
    /// `build` receives the action delay and the context's screenshot
    /// directory; `config.backend` is ignored.
    pub fn with_backend<F>(config: ContextConfig, build: F) -> Result<Self>
    where
        F: FnOnce(Duration, &Path) -> Result<Box<dyn Backend>>,
    {
        let context_id = Uuid::new_v4().to_string();

        let screenshot_dir = ContextDir::resolve(
            config.screenshot_dir.as_deref(),
            "visionpilot_screenshots",
            &context_id,
        )?;
        let temp_dir = match ContextDir::resolve(
            config.temp_dir.as_deref(),
            "visionpilot_temp",
            &context_id,
        ) {
            Ok(dir) => dir,
            Err(e) => {
                screenshot_dir.remove();
                return Err(e);
            }
        };

        let backend = match build(config.action_delay_duration(), &screenshot_dir.path) {
            Ok(backend) => backend,
            Err(e) => {
                screenshot_dir.remove();
                temp_dir.remove();
                return Err(e);
            }
        };
        let backend_name = backend.capabilities().name.to_string();

        tracing::info!(
            "Created context {} with {} backend (screenshots in {})",
            context_id,
            backend_name,
            screenshot_dir.path.display()
        );

        Ok(Self {
            context_id,
            backend: Some(backend),
            backend_name,
            screenshot_dir,
            temp_dir,
            cleanup_on_close: config.cleanup_on_close,
            metadata: config.metadata,
            action_count: 0,
            screenshot_count: 0,
            closed: false,
            created_at: Utc::now(),
            handlers: EventHandlers::default(),
        })
    }

    fn open_backend(&self) -> Result<&dyn Backend> {
        match &self.backend {
            Some(backend) if !self.closed => Ok(backend.as_ref()),
            _ => Err(AutomationError::ClosedContext(self.context_id.clone())),
        }
    }

    fn emit(&mut self, event: &Event<'_>) -> Result<()> {
        self.handlers.emit(event).map_err(AutomationError::Handler)
    }

    fn record_action(&mut self) {
        self.action_count += 1;
    }

    fn record_capture(&mut self) {
        self.action_count += 1;
        self.screenshot_count += 1;
    }

    /// Register a handler by event name
    pub fn on<F>(&mut self, event: &str, handler: F) -> Result<()>
    where
        F: FnMut(&Event<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        let kind: EventKind = event.parse()?;
        self.on_event(kind, handler);
        Ok(())
    }

    pub fn on_event<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.handlers.register(kind, handler);
    }

    // ============ Actions ============

    /// Capture the full display, persisting it under the screenshot
    /// directory when `persist` is set
    pub fn capture(&mut self, persist: bool) -> Result<Screenshot> {
        let shot = self.open_backend()?.capture(persist)?;
        self.record_capture();
        self.emit(&Event::Capture(&shot.image))?;
        Ok(shot)
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) -> Result<String> {
        let message = self.open_backend()?.pointer_move(x, y)?;
        self.record_action();
        self.emit(&Event::PointerMove { x, y })?;
        Ok(message)
    }

    pub fn click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<String> {
        let message = self.open_backend()?.click(x, y, button)?;
        self.record_action();
        self.emit(&Event::Click { x, y, button })?;
        Ok(message)
    }

    pub fn double_click(&mut self, x: i32, y: i32) -> Result<String> {
        let message = self.open_backend()?.double_click(x, y)?;
        self.record_action();
        Ok(message)
    }

    pub fn drag(&mut self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> Result<String> {
        let message = self.open_backend()?.drag(from_x, from_y, to_x, to_y)?;
        self.record_action();
        Ok(message)
    }

    pub fn scroll(&mut self, amount: i32, at: Option<(i32, i32)>) -> Result<String> {
        let message = self.open_backend()?.scroll(amount, at)?;
        self.record_action();
        Ok(message)
    }

    pub fn key_press(&mut self, combo: &str) -> Result<String> {
        let message = self.open_backend()?.key_press(combo)?;
        self.record_action();
        self.emit(&Event::KeyPress(combo))?;
        Ok(message)
    }

    pub fn type_text(&mut self, text: &str) -> Result<String> {
        let message = self.open_backend()?.type_text(text)?;
        self.record_action();
        Ok(message)
    }

    /// Capture the window of `pid` without activating it.
    ///
    /// `Ok(None)` (no counters, no event) when nothing could be captured.
    pub fn background_capture(&mut self, pid: u32) -> Result<Option<RgbaImage>> {
        let image = self.open_backend()?.background_capture(pid)?;
        if let Some(image) = &image {
            self.record_capture();
            self.emit(&Event::Capture(image))?;
        }
        Ok(image)
    }

    /// Send a key combination to `pid` without activating it
    pub fn background_input(&mut self, pid: u32, combo: &str) -> Result<bool> {
        let sent = self.open_backend()?.background_key(pid, combo)?;
        if sent {
            self.record_action();
            self.emit(&Event::KeyPress(combo))?;
        }
        Ok(sent)
    }

    /// Type `text` into `pid` without activating it
    pub fn background_type(&mut self, pid: u32, text: &str) -> Result<bool> {
        let sent = self.open_backend()?.background_type(pid, text)?;
        if sent {
            self.record_action();
        }
        Ok(sent)
    }

    /// Click inside the window of `pid` without activating it
    pub fn background_click(&mut self, pid: u32, x: i32, y: i32, button: MouseButton) -> Result<bool> {
        let sent = self.open_backend()?.background_click(pid, x, y, button)?;
        if sent {
            self.record_action();
            self.emit(&Event::Click { x, y, button })?;
        }
        Ok(sent)
    }

    // ============ Queries ============

    pub fn screen_size(&self) -> Result<(u32, u32)> {
        self.open_backend()?.screen_size()
    }

    pub fn cursor_position(&self) -> Result<(String, (i32, i32))> {
        self.open_backend()?.cursor_position()
    }

    pub fn capabilities(&self) -> Result<CapabilityDescriptor> {
        Ok(self.open_backend()?.capabilities())
    }

    /// Close the context. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.handlers.emit(&Event::ContextClose) {
            tracing::warn!("contextClose handler failed for {}: {:#}", self.context_id, e);
        }

        self.backend = None;

        if self.cleanup_on_close {
            self.screenshot_dir.remove();
            self.temp_dir.remove();
        }

        tracing::info!(
            "Closed context {} ({} actions, {} screenshots)",
            self.context_id,
            self.action_count,
            self.screenshot_count
        );
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            context_id: self.context_id.clone(),
            backend_name: self.backend_name.clone(),
            created_at: self.created_at,
            closed: self.closed,
            action_count: self.action_count,
            screenshot_count: self.screenshot_count,
            screenshot_dir: self.screenshot_dir.path.clone(),
            temp_dir: self.temp_dir.path.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn action_count(&self) -> u64 {
        self.action_count
    }

    pub fn screenshot_count(&self) -> u64 {
        self.screenshot_count
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir.path
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

impl Drop for AutomationContext {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for AutomationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationContext")
            .field("context_id", &self.context_id)
            .field("backend", &self.backend_name)
            .field("closed", &self.closed)
            .field("action_count", &self.action_count)
            .field("screenshot_count", &self.screenshot_count)
            .field("handlers", &self.handlers)
            .finish()
    }
}
