//! Portable backend built on enigo and xcap
//!
//! Works anywhere those crates do, but every action goes through the global
//! input path: the pointer visibly moves, keys land in the focused window,
//! and nothing can be aimed at a background process.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

use super::{Backend, CapabilityDescriptor};
use crate::error::{AutomationError, Result};
use crate::input::{Key, KeyCombo, MouseButton};
use crate::screenshot::{self, Screenshot};

pub const GENERIC_CAPABILITIES: CapabilityDescriptor = CapabilityDescriptor {
    name: "Generic",
    background_capture: false,
    background_input: false,
    requires_accessibility: true,
    requires_screen_recording: true,
    performance_multiplier: 1.0,
    platform: std::env::consts::OS,
};

/// Pause between the halves of a compound pointer gesture
const GESTURE_STEP: Duration = Duration::from_millis(50);

/// Generic capture/input backend
pub struct GenericBackend {
    action_delay: Duration,
    capture_dir: PathBuf,
}

impl GenericBackend {
    pub fn new(action_delay: Duration, capture_dir: &Path) -> Self {
        Self {
            action_delay,
            capture_dir: capture_dir.to_path_buf(),
        }
    }

    /// Open an input session for one action
    fn input(&self) -> Result<Enigo> {
        Enigo::new(&Settings::default()).map_err(|e| {
            AutomationError::Input(format!("Failed to create input controller: {e:?}"))
        })
    }

    fn pause(&self) {
        if !self.action_delay.is_zero() {
            thread::sleep(self.action_delay);
        }
    }
}

fn input_error(action: &str, e: impl std::fmt::Debug) -> AutomationError {
    AutomationError::Input(format!("Failed to {action}: {e:?}"))
}

fn to_enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
    }
}

fn to_enigo_key(key: Key) -> Option<enigo::Key> {
    let key = match key {
        Key::Char(c) => enigo::Key::Unicode(c),
        Key::Return => enigo::Key::Return,
        Key::Tab => enigo::Key::Tab,
        Key::Space => enigo::Key::Space,
        Key::Backspace => enigo::Key::Backspace,
        Key::Escape => enigo::Key::Escape,
        Key::Delete => enigo::Key::Delete,
        #[cfg(not(target_os = "macos"))]
        Key::Insert => enigo::Key::Insert,
        #[cfg(target_os = "macos")]
        Key::Insert => return None,
        Key::Home => enigo::Key::Home,
        Key::End => enigo::Key::End,
        Key::PageUp => enigo::Key::PageUp,
        Key::PageDown => enigo::Key::PageDown,
        Key::Up => enigo::Key::UpArrow,
        Key::Down => enigo::Key::DownArrow,
        Key::Left => enigo::Key::LeftArrow,
        Key::Right => enigo::Key::RightArrow,
        Key::Function(n) => match n {
            1 => enigo::Key::F1,
            2 => enigo::Key::F2,
            3 => enigo::Key::F3,
            4 => enigo::Key::F4,
            5 => enigo::Key::F5,
            6 => enigo::Key::F6,
            7 => enigo::Key::F7,
            8 => enigo::Key::F8,
            9 => enigo::Key::F9,
            10 => enigo::Key::F10,
            11 => enigo::Key::F11,
            12 => enigo::Key::F12,
            _ => return None,
        },
        Key::CapsLock => enigo::Key::CapsLock,
        Key::Shift => enigo::Key::Shift,
        Key::Control => enigo::Key::Control,
        Key::Alt => enigo::Key::Alt,
        Key::Command => enigo::Key::Meta,
    };
    Some(key)
}

impl Backend for GenericBackend {
    fn capabilities(&self) -> CapabilityDescriptor {
        GENERIC_CAPABILITIES
    }

    fn capture(&self, persist: bool) -> Result<Screenshot> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| AutomationError::Capture(format!("failed to enumerate monitors: {e}")))?;

        // Primary monitor, or the first one if none reports itself primary
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or_else(|| AutomationError::Capture("No monitors found".to_string()))?;

        let image = monitor
            .capture_image()
            .map_err(|e| AutomationError::Capture(e.to_string()))?;

        let path = if persist {
            let png = screenshot::encode_png(&image)
                .map_err(|e| AutomationError::Capture(format!("failed to encode PNG: {e}")))?;
            Some(screenshot::persist_png(&self.capture_dir, &png)?)
        } else {
            None
        };

        let (width, height) = image.dimensions();
        self.pause();
        Ok(Screenshot {
            message: format!("Screenshot captured ({width}x{height})"),
            image,
            path,
        })
    }

    fn screen_size(&self) -> Result<(u32, u32)> {
        let (width, height) = self
            .input()?
            .main_display()
            .map_err(|e| input_error("query display size", e))?;
        Ok((width.max(0) as u32, height.max(0) as u32))
    }

    fn cursor_position(&self) -> Result<(String, (i32, i32))> {
        let (x, y) = self
            .input()?
            .location()
            .map_err(|e| input_error("query cursor position", e))?;
        Ok((format!("Cursor at ({x}, {y})"), (x, y)))
    }

    fn pointer_move(&self, x: i32, y: i32) -> Result<String> {
        self.input()?
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| input_error("move mouse", e))?;
        self.pause();
        Ok(format!("Moved pointer to ({x}, {y})"))
    }

    fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<String> {
        let mut enigo = self.input()?;
        enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| input_error("move mouse", e))?;
        enigo
            .button(to_enigo_button(button), Direction::Click)
            .map_err(|e| input_error("click", e))?;
        self.pause();
        Ok(format!("Clicked {button} at ({x}, {y})"))
    }

    fn double_click(&self, x: i32, y: i32) -> Result<String> {
        let mut enigo = self.input()?;
        enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| input_error("move mouse", e))?;
        for _ in 0..2 {
            enigo
                .button(Button::Left, Direction::Click)
                .map_err(|e| input_error("double-click", e))?;
        }
        self.pause();
        Ok(format!("Double-clicked at ({x}, {y})"))
    }

    fn drag(&self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> Result<String> {
        let mut enigo = self.input()?;
        enigo
            .move_mouse(from_x, from_y, Coordinate::Abs)
            .map_err(|e| input_error("move mouse", e))?;
        thread::sleep(GESTURE_STEP);
        enigo
            .button(Button::Left, Direction::Press)
            .map_err(|e| input_error("press mouse button", e))?;
        thread::sleep(GESTURE_STEP);
        enigo
            .move_mouse(to_x, to_y, Coordinate::Abs)
            .map_err(|e| input_error("move mouse", e))?;
        thread::sleep(GESTURE_STEP);
        enigo
            .button(Button::Left, Direction::Release)
            .map_err(|e| input_error("release mouse button", e))?;
        self.pause();
        Ok(format!("Dragged from ({from_x}, {from_y}) to ({to_x}, {to_y})"))
    }

    fn scroll(&self, amount: i32, at: Option<(i32, i32)>) -> Result<String> {
        let mut enigo = self.input()?;
        if let Some((x, y)) = at {
            enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| input_error("move mouse", e))?;
        }
        // enigo scrolls down for positive lengths
        enigo
            .scroll(-amount, Axis::Vertical)
            .map_err(|e| input_error("scroll", e))?;
        self.pause();
        Ok(match at {
            Some((x, y)) => format!("Scrolled {amount} clicks at ({x}, {y})"),
            None => format!("Scrolled {amount} clicks"),
        })
    }

    fn key_press(&self, combo: &str) -> Result<String> {
        let parsed = KeyCombo::parse(combo)?;
        let unsupported = || AutomationError::UnsupportedKey(combo.to_string());
        let key = to_enigo_key(parsed.key).ok_or_else(unsupported)?;
        let modifiers = parsed
            .modifiers
            .modifiers()
            .into_iter()
            .map(|m| to_enigo_key(m.key()).ok_or_else(unsupported))
            .collect::<Result<Vec<_>>>()?;

        let mut enigo = self.input()?;
        for modifier in &modifiers {
            enigo
                .key(*modifier, Direction::Press)
                .map_err(|e| input_error("press key down", e))?;
        }
        let pressed = enigo
            .key(key, Direction::Click)
            .map_err(|e| input_error("press key", e));
        // release modifiers even if the base key failed
        for modifier in modifiers.iter().rev() {
            enigo
                .key(*modifier, Direction::Release)
                .map_err(|e| input_error("release key", e))?;
        }
        pressed?;

        self.pause();
        Ok(format!("Pressed key(s): {combo}"))
    }

    fn type_text(&self, text: &str) -> Result<String> {
        self.input()?
            .text(text)
            .map_err(|e| input_error("type text", e))?;
        self.pause();
        Ok(format!("Typed text: {}", super::preview(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GenericBackend {
        GenericBackend::new(Duration::ZERO, Path::new("/nonexistent"))
    }

    #[test]
    fn test_capabilities() {
        let caps = backend().capabilities();
        assert_eq!(caps.name, "Generic");
        assert!(!caps.background_capture);
        assert!(!caps.background_input);
        assert_eq!(caps.performance_multiplier, 1.0);
        assert_eq!(caps.platform, std::env::consts::OS);
    }

    #[test]
    fn test_background_operations_not_supported() {
        let backend = backend();
        assert!(matches!(
            backend.background_capture(1),
            Err(AutomationError::NotSupported {
                backend: "Generic",
                ..
            })
        ));
        assert!(matches!(
            backend.background_key(1, "return"),
            Err(AutomationError::NotSupported { .. })
        ));
        assert!(matches!(
            backend.background_click(1, 0, 0, MouseButton::Left),
            Err(AutomationError::NotSupported { .. })
        ));
    }

    #[test]
    fn test_unknown_combo_rejected_before_input() {
        // parsing fails before any input session is opened
        assert!(matches!(
            backend().key_press("ctrl+nope"),
            Err(AutomationError::UnsupportedKey(_))
        ));
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(to_enigo_key(Key::Char('a')), Some(enigo::Key::Unicode('a')));
        assert_eq!(to_enigo_key(Key::Function(12)), Some(enigo::Key::F12));
        assert_eq!(to_enigo_key(Key::Command), Some(enigo::Key::Meta));
        assert_eq!(to_enigo_button(MouseButton::Right), Button::Right);
    }
}
