//! Native display-server backend
//!
//! Talks to the compositor and input layers directly instead of going
//! through a portable automation library. Capture walks the fallback chain
//! in [`crate::screenshot::chain`]; input is expanded into synthetic events
//! and posted either to the global input tap or straight to one process,
//! which is what makes background operation possible.
//!
//! The protocol logic lives here and is generic over [`DisplayServer`], the
//! thin bridge to the OS. [`x11::X11Display`] is the production bridge.

pub mod x11;

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use image::RgbaImage;

use super::{Backend, CapabilityDescriptor};
use crate::core::window::{WindowHandle, select_window_for_pid};
use crate::error::{AutomationError, Result};
use crate::input::{self, EventTarget, KeyCombo, MouseButton, SyntheticEvent};
use crate::screenshot::chain::CaptureChain;
use crate::screenshot::cli::CliCapture;
use crate::screenshot::{self, RawImage, Screenshot};

pub use self::x11::X11Display;

pub const NATIVE_CAPABILITIES: CapabilityDescriptor = CapabilityDescriptor {
    name: "Native X11",
    background_capture: true,
    background_input: true,
    requires_accessibility: false,
    requires_screen_recording: false,
    performance_multiplier: 20.0,
    platform: std::env::consts::OS,
};

/// Bridge between the protocol logic and one display server
pub trait DisplayServer: Send {
    /// Identifier of the window covering the whole display
    fn root_window(&self) -> u32;

    fn screen_size(&self) -> anyhow::Result<(u32, u32)>;

    fn cursor_position(&self) -> anyhow::Result<(i32, i32)>;

    /// Enumerate every window, including unmapped and override-redirect ones
    fn list_windows(&self) -> anyhow::Result<Vec<WindowHandle>>;

    /// Compositor imaging call for one window
    fn rasterize(&self, window_id: u32) -> anyhow::Result<RawImage>;

    fn post(&self, target: EventTarget, event: &SyntheticEvent) -> anyhow::Result<()>;

    fn process_exists(&self, pid: u32) -> bool;
}

/// High-throughput backend with background capture and input
pub struct NativeBackend<D: DisplayServer = X11Display> {
    display: D,
    action_delay: Duration,
    capture_dir: PathBuf,
    cli: CliCapture,
}

impl NativeBackend<X11Display> {
    /// Connect to the X server named by `DISPLAY`
    pub fn connect(action_delay: Duration, capture_dir: &Path) -> anyhow::Result<Self> {
        let display = X11Display::connect()?;
        Ok(Self::with_display(display, action_delay, capture_dir))
    }
}

impl<D: DisplayServer> NativeBackend<D> {
    pub fn with_display(display: D, action_delay: Duration, capture_dir: &Path) -> Self {
        Self {
            display,
            action_delay,
            capture_dir: capture_dir.to_path_buf(),
            cli: CliCapture::platform_default(),
        }
    }

    /// Replace the CLI capture utility used as the last fallback stage
    pub fn with_cli(mut self, cli: CliCapture) -> Self {
        self.cli = cli;
        self
    }

    fn pause(&self) {
        if !self.action_delay.is_zero() {
            thread::sleep(self.action_delay);
        }
    }

    fn post_all(&self, target: EventTarget, events: &[SyntheticEvent]) -> anyhow::Result<()> {
        for event in events {
            self.display.post(target, event)?;
        }
        Ok(())
    }

    /// Post to the global tap, mapping bridge failures to `Input`
    fn inject(&self, events: &[SyntheticEvent]) -> Result<()> {
        self.post_all(EventTarget::Global, events)
            .map_err(|e| AutomationError::Input(format!("{e:#}")))
    }

    /// Clamp a point into the screen bounds
    fn clamp(&self, x: i32, y: i32) -> Result<(i32, i32)> {
        let (width, height) = self
            .display
            .screen_size()
            .map_err(|e| AutomationError::Input(format!("{e:#}")))?;
        let max_x = i32::try_from(width).unwrap_or(i32::MAX).saturating_sub(1).max(0);
        let max_y = i32::try_from(height).unwrap_or(i32::MAX).saturating_sub(1).max(0);
        Ok((x.clamp(0, max_x), y.clamp(0, max_y)))
    }

    /// Fresh lookup of the window `pid` should be addressed through
    fn window_for_pid(&self, pid: u32) -> Option<WindowHandle> {
        match self.display.list_windows() {
            Ok(windows) => select_window_for_pid(&windows, pid).cloned(),
            Err(e) => {
                tracing::warn!("Window enumeration failed: {:#}", e);
                None
            }
        }
    }

    fn still_owned_by(&self, window_id: u32, pid: u32) -> bool {
        self.display
            .list_windows()
            .map(|windows| {
                windows
                    .iter()
                    .any(|w| w.window_id == window_id && w.owner_pid == Some(pid))
            })
            .unwrap_or(false)
    }

    /// Resolve the process target, or `None` if the pid is gone or windowless
    fn process_target(&self, pid: u32) -> Option<EventTarget> {
        if !self.display.process_exists(pid) {
            tracing::debug!("Process {} no longer exists", pid);
            return None;
        }
        let window = self.window_for_pid(pid)?;
        Some(EventTarget::Process {
            pid,
            window: window.window_id,
        })
    }

    fn post_to_process(&self, pid: u32, events: &[SyntheticEvent]) -> bool {
        let Some(target) = self.process_target(pid) else {
            return false;
        };
        match self.post_all(target, events) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Background input to PID {} failed: {:#}", pid, e);
                false
            }
        }
    }
}

impl<D: DisplayServer> Backend for NativeBackend<D> {
    fn capabilities(&self) -> CapabilityDescriptor {
        NATIVE_CAPABILITIES
    }

    fn capture(&self, persist: bool) -> Result<Screenshot> {
        let root = self.display.root_window();
        let outcome = CaptureChain::run(root, |id| self.display.rasterize(id), &self.cli);

        let Some(captured) = outcome.captured else {
            return Err(AutomationError::Capture(format!(
                "display capture exhausted all strategies: {:?}",
                outcome.chain.trail()
            )));
        };

        let path = if persist {
            Some(screenshot::persist_png(&self.capture_dir, &captured.png)?)
        } else {
            None
        };

        let (width, height) = captured.image.dimensions();
        self.pause();
        Ok(Screenshot {
            message: format!("Screenshot captured ({width}x{height})"),
            image: captured.image,
            path,
        })
    }

    fn screen_size(&self) -> Result<(u32, u32)> {
        Ok(self.display.screen_size()?)
    }

    fn cursor_position(&self) -> Result<(String, (i32, i32))> {
        let (x, y) = self.display.cursor_position()?;
        Ok((format!("Cursor at ({x}, {y})"), (x, y)))
    }

    fn pointer_move(&self, x: i32, y: i32) -> Result<String> {
        let (x, y) = self.clamp(x, y)?;
        self.inject(&[SyntheticEvent::PointerMove { x, y }])?;
        self.pause();
        Ok(format!("Moved pointer to ({x}, {y})"))
    }

    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<String> {
        let (x, y) = self.clamp(x, y)?;
        self.inject(&input::click_events(x, y, button))?;
        self.pause();
        Ok(format!("Clicked {button} at ({x}, {y})"))
    }

    fn double_click(&self, x: i32, y: i32) -> Result<String> {
        let (x, y) = self.clamp(x, y)?;
        self.inject(&input::double_click_events(x, y))?;
        self.pause();
        Ok(format!("Double-clicked at ({x}, {y})"))
    }

    fn drag(&self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> Result<String> {
        let (from_x, from_y) = self.clamp(from_x, from_y)?;
        let (to_x, to_y) = self.clamp(to_x, to_y)?;
        self.inject(&input::drag_events(from_x, from_y, to_x, to_y))?;
        self.pause();
        Ok(format!("Dragged from ({from_x}, {from_y}) to ({to_x}, {to_y})"))
    }

    fn scroll(&self, amount: i32, at: Option<(i32, i32)>) -> Result<String> {
        let (x, y) = match at {
            Some((x, y)) => {
                let (x, y) = self.clamp(x, y)?;
                self.inject(&[SyntheticEvent::PointerMove { x, y }])?;
                (x, y)
            }
            None => self.display.cursor_position()?,
        };
        self.inject(&[SyntheticEvent::Scroll { x, y, amount }])?;
        self.pause();
        Ok(format!("Scrolled {amount} clicks at ({x}, {y})"))
    }

    fn key_press(&self, combo: &str) -> Result<String> {
        let parsed = KeyCombo::parse(combo)?;
        self.inject(&input::key_events(&parsed))?;
        self.pause();
        Ok(format!("Pressed key(s): {combo}"))
    }

    fn type_text(&self, text: &str) -> Result<String> {
        self.inject(&[SyntheticEvent::Text(text.to_string())])?;
        self.pause();
        Ok(format!("Typed text: {}", super::preview(text)))
    }

    fn background_capture(&self, pid: u32) -> Result<Option<RgbaImage>> {
        let Some(window) = self.window_for_pid(pid) else {
            tracing::debug!("No window found for PID {}", pid);
            return Ok(None);
        };

        tracing::debug!(
            "Capturing window {} ({:?}, {}x{}) for PID {}",
            window.window_id,
            window.title,
            window.bounds.width,
            window.bounds.height,
            pid
        );

        let outcome = CaptureChain::run(window.window_id, |id| self.display.rasterize(id), &self.cli);
        let Some(captured) = outcome.captured else {
            return Ok(None);
        };

        // the id may have been recycled while the chain ran
        if !self.still_owned_by(window.window_id, pid) {
            tracing::warn!(
                "Window {} no longer belongs to PID {}, discarding capture",
                window.window_id,
                pid
            );
            return Ok(None);
        }

        Ok(Some(captured.image))
    }

    fn background_key(&self, pid: u32, combo: &str) -> Result<bool> {
        let parsed = KeyCombo::parse(combo)?;
        let sent = self.post_to_process(pid, &input::key_events(&parsed));
        if sent {
            tracing::debug!("Sent key '{}' to PID {} (background)", combo, pid);
        }
        Ok(sent)
    }

    fn background_click(&self, pid: u32, x: i32, y: i32, button: MouseButton) -> Result<bool> {
        let sent = self.post_to_process(pid, &input::button_events(x, y, button, 1));
        if sent {
            tracing::debug!("Sent {} click to PID {} at ({}, {}) (background)", button, pid, x, y);
        }
        Ok(sent)
    }

    fn background_type(&self, pid: u32, text: &str) -> Result<bool> {
        let sent = self.post_to_process(pid, &[SyntheticEvent::Text(text.to_string())]);
        if sent {
            tracing::debug!(
                "Typed '{}' into PID {} (background)",
                super::preview(text),
                pid
            );
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::Geometry;
    use crate::input::{Key, ModifierFlags};
    use std::sync::{Arc, Mutex};

    type Posted = Arc<Mutex<Vec<(EventTarget, SyntheticEvent)>>>;

    #[derive(Default)]
    struct FakeDisplay {
        posted: Posted,
        windows: Vec<WindowHandle>,
        live_pids: Vec<u32>,
        raster: Option<RawImage>,
    }

    impl DisplayServer for FakeDisplay {
        fn root_window(&self) -> u32 {
            1
        }

        fn screen_size(&self) -> anyhow::Result<(u32, u32)> {
            Ok((1920, 1080))
        }

        fn cursor_position(&self) -> anyhow::Result<(i32, i32)> {
            Ok((3, 4))
        }

        fn list_windows(&self) -> anyhow::Result<Vec<WindowHandle>> {
            Ok(self.windows.clone())
        }

        fn rasterize(&self, window_id: u32) -> anyhow::Result<RawImage> {
            self.raster
                .clone()
                .ok_or_else(|| anyhow::anyhow!("BadWindow {window_id}"))
        }

        fn post(&self, target: EventTarget, event: &SyntheticEvent) -> anyhow::Result<()> {
            self.posted.lock().unwrap().push((target, event.clone()));
            Ok(())
        }

        fn process_exists(&self, pid: u32) -> bool {
            self.live_pids.contains(&pid)
        }
    }

    fn app_window(id: u32, pid: u32) -> WindowHandle {
        WindowHandle {
            window_id: id,
            owner_pid: Some(pid),
            bounds: Geometry {
                x: 0,
                y: 0,
                width: 640,
                height: 480,
            },
            title: "editor".to_string(),
            mapped: true,
        }
    }

    fn small_raster() -> RawImage {
        RawImage {
            width: 2,
            height: 1,
            depth: 24,
            data: vec![1, 2, 3, 0, 4, 5, 6, 0],
        }
    }

    fn backend(display: FakeDisplay) -> (NativeBackend<FakeDisplay>, Posted) {
        let posted = display.posted.clone();
        let backend = NativeBackend::with_display(display, Duration::ZERO, Path::new("/nonexistent"))
            .with_cli(CliCapture::new("sh", vec!["-c".to_string(), "exit 1".to_string()]));
        (backend, posted)
    }

    #[test]
    fn test_key_press_with_modifier_flags() {
        let (backend, posted) = backend(FakeDisplay::default());
        backend.key_press("command+s").unwrap();

        let posted = posted.lock().unwrap();
        assert_eq!(
            *posted,
            vec![
                (
                    EventTarget::Global,
                    SyntheticEvent::KeyDown {
                        key: Key::Char('s'),
                        flags: ModifierFlags::COMMAND
                    }
                ),
                (
                    EventTarget::Global,
                    SyntheticEvent::KeyUp {
                        key: Key::Char('s'),
                        flags: ModifierFlags::COMMAND
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_key_press_without_modifiers() {
        let (backend, posted) = backend(FakeDisplay::default());
        backend.key_press("s").unwrap();

        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 2);
        for (_, event) in posted.iter() {
            match event {
                SyntheticEvent::KeyDown { flags, .. } | SyntheticEvent::KeyUp { flags, .. } => {
                    assert!(flags.is_empty())
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_combo_posts_nothing() {
        let (backend, posted) = backend(FakeDisplay::default());
        assert!(matches!(
            backend.key_press("hyper+s"),
            Err(AutomationError::UnsupportedKey(_))
        ));
        assert!(posted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_click_is_clamped_to_screen() {
        let (backend, posted) = backend(FakeDisplay::default());
        let message = backend.click(5000, -20, MouseButton::Right).unwrap();
        assert_eq!(message, "Clicked right at (1919, 0)");

        let posted = posted.lock().unwrap();
        assert_eq!(posted[0].1, SyntheticEvent::PointerMove { x: 1919, y: 0 });
        assert_eq!(posted.len(), 3);
    }

    #[test]
    fn test_type_text_posts_whole_string() {
        let (backend, posted) = backend(FakeDisplay::default());
        backend.type_text("héllo → 世界").unwrap();
        assert_eq!(
            posted.lock().unwrap()[0].1,
            SyntheticEvent::Text("héllo → 世界".to_string())
        );
    }

    #[test]
    fn test_scroll_defaults_to_cursor() {
        let (backend, posted) = backend(FakeDisplay::default());
        backend.scroll(-3, None).unwrap();
        assert_eq!(
            posted.lock().unwrap()[0].1,
            SyntheticEvent::Scroll {
                x: 3,
                y: 4,
                amount: -3
            }
        );
    }

    #[test]
    fn test_capture_persists_png() {
        let dir = tempfile::tempdir().unwrap();
        let display = FakeDisplay {
            raster: Some(small_raster()),
            ..Default::default()
        };
        let backend = NativeBackend::with_display(display, Duration::ZERO, dir.path());

        let shot = backend.capture(true).unwrap();
        assert_eq!(shot.message, "Screenshot captured (2x1)");
        assert!(shot.path.unwrap().exists());

        let shot = backend.capture(false).unwrap();
        assert!(shot.path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_capture_exhausted_is_capture_error() {
        let (backend, _) = backend(FakeDisplay::default());
        assert!(matches!(backend.capture(false), Err(AutomationError::Capture(_))));
    }

    #[test]
    fn test_background_capture_without_window_is_none() {
        let display = FakeDisplay {
            windows: vec![app_window(10, 100)],
            raster: Some(small_raster()),
            ..Default::default()
        };
        let (backend, _) = backend(display);
        assert!(backend.background_capture(4242).unwrap().is_none());
    }

    #[test]
    fn test_background_capture_of_owned_window() {
        let display = FakeDisplay {
            windows: vec![app_window(10, 100)],
            raster: Some(small_raster()),
            ..Default::default()
        };
        let (backend, _) = backend(display);
        let image = backend.background_capture(100).unwrap().unwrap();
        assert_eq!(image.dimensions(), (2, 1));
    }

    #[test]
    fn test_background_key_targets_process_window() {
        let display = FakeDisplay {
            windows: vec![app_window(10, 100)],
            live_pids: vec![100],
            ..Default::default()
        };
        let (backend, posted) = backend(display);
        assert!(backend.background_key(100, "ctrl+s").unwrap());

        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 2);
        assert!(posted
            .iter()
            .all(|(target, _)| *target == EventTarget::Process { pid: 100, window: 10 }));
    }

    #[test]
    fn test_background_input_to_vanished_pid_is_false() {
        let display = FakeDisplay {
            windows: vec![app_window(10, 100)],
            ..Default::default()
        };
        let (backend, posted) = backend(display);
        assert!(!backend.background_key(100, "return").unwrap());
        assert!(!backend.background_click(100, 5, 5, MouseButton::Left).unwrap());
        assert!(posted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_background_type_posts_text_to_process_window() {
        let display = FakeDisplay {
            windows: vec![app_window(10, 100), app_window(11, 200)],
            live_pids: vec![100, 200],
            ..Default::default()
        };
        let (backend, posted) = backend(display);
        assert!(backend.background_type(100, "license-KEY-123").unwrap());

        assert_eq!(
            *posted.lock().unwrap(),
            vec![(
                EventTarget::Process {
                    pid: 100,
                    window: 10
                },
                SyntheticEvent::Text("license-KEY-123".to_string())
            )]
        );
    }

    #[test]
    fn test_background_type_to_vanished_pid_is_false() {
        let display = FakeDisplay {
            windows: vec![app_window(10, 100)],
            ..Default::default()
        };
        let (backend, posted) = backend(display);
        assert!(!backend.background_type(100, "hello").unwrap());
        assert!(posted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_background_type_without_window_is_false() {
        let display = FakeDisplay {
            windows: vec![app_window(10, 100)],
            live_pids: vec![300],
            ..Default::default()
        };
        let (backend, posted) = backend(display);
        assert!(!backend.background_type(300, "hello").unwrap());
        assert!(posted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_capabilities() {
        let (backend, _) = backend(FakeDisplay::default());
        let caps = backend.capabilities();
        assert!(caps.background_capture);
        assert!(caps.background_input);
        assert_eq!(caps.platform, std::env::consts::OS);
    }
}
