//! Input synthesis model
//!
//! Key combinations are parsed into a base [`Key`] plus [`ModifierFlags`], and
//! pointer/keyboard actions are expanded into ordered [`SyntheticEvent`]s that
//! a display server posts either to the global input tap or to one process.
//! Backends share this model so that double-clicks, drags and modified key
//! presses look the same no matter which OS bridge delivers them.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, Result};

/// Mouse button identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// X11 core protocol button number
    pub fn x11_button(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        }
    }
}

impl FromStr for MouseButton {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            other => Err(AutomationError::Input(format!("unknown mouse button: {other}"))),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// Modifier mask attached to synthetic key events.
///
/// Bit values follow the X11 `KeyButMask` layout so the native bridge can
/// copy them straight into an event's `state` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierFlags(u16);

impl ModifierFlags {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(1);
    pub const CONTROL: Self = Self(1 << 2);
    /// Mod1
    pub const ALT: Self = Self(1 << 3);
    /// Mod4 (Super)
    pub const COMMAND: Self = Self(1 << 6);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Modifiers present in this mask, in press order
    pub fn modifiers(self) -> Vec<Modifier> {
        Modifier::ALL
            .into_iter()
            .filter(|m| self.contains(m.flag()))
            .collect()
    }
}

impl BitOr for ModifierFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModifierFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Control,
    Alt,
    Shift,
    Command,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [
        Modifier::Control,
        Modifier::Alt,
        Modifier::Shift,
        Modifier::Command,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ctrl" | "control" => Some(Modifier::Control),
            "alt" | "option" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            "command" | "cmd" | "super" | "meta" | "win" => Some(Modifier::Command),
            _ => None,
        }
    }

    pub fn flag(self) -> ModifierFlags {
        match self {
            Modifier::Control => ModifierFlags::CONTROL,
            Modifier::Alt => ModifierFlags::ALT,
            Modifier::Shift => ModifierFlags::SHIFT,
            Modifier::Command => ModifierFlags::COMMAND,
        }
    }

    /// The physical key that produces this modifier
    pub fn key(self) -> Key {
        match self {
            Modifier::Control => Key::Control,
            Modifier::Alt => Key::Alt,
            Modifier::Shift => Key::Shift,
            Modifier::Command => Key::Command,
        }
    }
}

/// Base key of a combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Return,
    Tab,
    Space,
    Backspace,
    Escape,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Function(u8),
    CapsLock,
    Shift,
    Control,
    Alt,
    Command,
}

impl Key {
    /// Map a lowercase key name to a key
    pub fn from_token(token: &str) -> Option<Self> {
        let key = match token {
            // Special keys
            "return" | "enter" => Key::Return,
            "tab" => Key::Tab,
            "space" => Key::Space,
            "backspace" => Key::Backspace,
            "escape" | "esc" => Key::Escape,
            "delete" | "del" => Key::Delete,
            "insert" => Key::Insert,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" | "page_up" => Key::PageUp,
            "pagedown" | "page_down" => Key::PageDown,
            "capslock" => Key::CapsLock,

            // Arrow keys
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,

            // Modifiers pressed on their own
            "shift" => Key::Shift,
            "ctrl" | "control" => Key::Control,
            "alt" | "option" => Key::Alt,
            "command" | "cmd" | "super" | "meta" | "win" => Key::Command,

            other => {
                if let Some(n) = other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    if (1..=12).contains(&n) {
                        return Some(Key::Function(n));
                    }
                    return None;
                }

                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_whitespace() => Key::Char(c),
                    _ => return None,
                }
            }
        };
        Some(key)
    }

    /// X11 keysym for this key
    pub fn keysym(self) -> u32 {
        match self {
            Key::Char(c) => char_keysym(c),
            Key::Return => 0xff0d,
            Key::Tab => 0xff09,
            Key::Space => 0x0020,
            Key::Backspace => 0xff08,
            Key::Escape => 0xff1b,
            Key::Delete => 0xffff,
            Key::Insert => 0xff63,
            Key::Home => 0xff50,
            Key::End => 0xff57,
            Key::PageUp => 0xff55,
            Key::PageDown => 0xff56,
            Key::Left => 0xff51,
            Key::Up => 0xff52,
            Key::Right => 0xff53,
            Key::Down => 0xff54,
            Key::Function(n) => 0xffbe + u32::from(n.saturating_sub(1)),
            Key::CapsLock => 0xffe5,
            Key::Shift => 0xffe1,
            Key::Control => 0xffe3,
            Key::Alt => 0xffe9,
            Key::Command => 0xffeb,
        }
    }
}

/// X11 keysym for a Unicode scalar value.
///
/// Latin-1 printable characters share their code point with their keysym;
/// everything else uses the `0x0100_0000 + codepoint` Unicode keysym range.
pub fn char_keysym(c: char) -> u32 {
    match c {
        '\n' | '\r' => Key::Return.keysym(),
        '\t' => Key::Tab.keysym(),
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u32,
        _ => 0x0100_0000 | c as u32,
    }
}

/// A parsed `+`-joined key combination such as `command+shift+s`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: ModifierFlags,
    pub key: Key,
}

impl KeyCombo {
    /// Parse a combination; every token but the last must be a modifier.
    pub fn parse(combo: &str) -> Result<Self> {
        let tokens: Vec<String> = combo.split('+').map(|t| t.trim().to_lowercase()).collect();
        let unsupported = || AutomationError::UnsupportedKey(combo.to_string());

        let (last, leading) = tokens.split_last().ok_or_else(unsupported)?;

        let mut modifiers = ModifierFlags::NONE;
        for token in leading {
            let modifier = Modifier::from_token(token).ok_or_else(unsupported)?;
            modifiers |= modifier.flag();
        }

        let key = Key::from_token(last).ok_or_else(unsupported)?;
        Ok(Self { modifiers, key })
    }
}

impl FromStr for KeyCombo {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Where a synthetic event is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    /// The global input tap; indistinguishable from hardware input
    Global,
    /// Directly to a window owned by `pid`, without activating it.
    /// Pointer coordinates stay in root (screen) space.
    Process { pid: u32, window: u32 },
}

/// One synthetic input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticEvent {
    PointerMove {
        x: i32,
        y: i32,
    },
    PointerDown {
        x: i32,
        y: i32,
        button: MouseButton,
        click_count: u8,
    },
    PointerUp {
        x: i32,
        y: i32,
        button: MouseButton,
        click_count: u8,
    },
    /// Motion while a button is held
    PointerDragged {
        x: i32,
        y: i32,
        button: MouseButton,
    },
    /// Wheel scroll in lines; positive scrolls up
    Scroll {
        x: i32,
        y: i32,
        amount: i32,
    },
    KeyDown {
        key: Key,
        flags: ModifierFlags,
    },
    KeyUp {
        key: Key,
        flags: ModifierFlags,
    },
    /// Whole-string Unicode payload
    Text(String),
}

/// Down/up pair at a position, without a preceding move
pub fn button_events(x: i32, y: i32, button: MouseButton, click_count: u8) -> [SyntheticEvent; 2] {
    [
        SyntheticEvent::PointerDown {
            x,
            y,
            button,
            click_count,
        },
        SyntheticEvent::PointerUp {
            x,
            y,
            button,
            click_count,
        },
    ]
}

/// Move to the position, then a single down/up pair
pub fn click_events(x: i32, y: i32, button: MouseButton) -> Vec<SyntheticEvent> {
    let mut events = vec![SyntheticEvent::PointerMove { x, y }];
    events.extend(button_events(x, y, button, 1));
    events
}

/// Two down/up pairs distinguished by their click-count field
pub fn double_click_events(x: i32, y: i32) -> Vec<SyntheticEvent> {
    let mut events = vec![SyntheticEvent::PointerMove { x, y }];
    events.extend(button_events(x, y, MouseButton::Left, 1));
    events.extend(button_events(x, y, MouseButton::Left, 2));
    events
}

/// move -> down -> dragged -> up
pub fn drag_events(from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> Vec<SyntheticEvent> {
    vec![
        SyntheticEvent::PointerMove { x: from_x, y: from_y },
        SyntheticEvent::PointerDown {
            x: from_x,
            y: from_y,
            button: MouseButton::Left,
            click_count: 1,
        },
        SyntheticEvent::PointerDragged {
            x: to_x,
            y: to_y,
            button: MouseButton::Left,
        },
        SyntheticEvent::PointerUp {
            x: to_x,
            y: to_y,
            button: MouseButton::Left,
            click_count: 1,
        },
    ]
}

/// Down/up pair carrying the combination's modifier flags on both events
pub fn key_events(combo: &KeyCombo) -> [SyntheticEvent; 2] {
    [
        SyntheticEvent::KeyDown {
            key: combo.key,
            flags: combo.modifiers,
        },
        SyntheticEvent::KeyUp {
            key: combo.key,
            flags: combo.modifiers,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_key() {
        let combo = KeyCombo::parse("s").unwrap();
        assert_eq!(combo.key, Key::Char('s'));
        assert!(combo.modifiers.is_empty());
    }

    #[test]
    fn test_parse_modified_key() {
        let combo = KeyCombo::parse("command+shift+s").unwrap();
        assert_eq!(combo.key, Key::Char('s'));
        assert!(combo.modifiers.contains(ModifierFlags::COMMAND));
        assert!(combo.modifiers.contains(ModifierFlags::SHIFT));
        assert!(!combo.modifiers.contains(ModifierFlags::CONTROL));
        assert_eq!(
            combo.modifiers.modifiers(),
            vec![Modifier::Shift, Modifier::Command]
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            KeyCombo::parse("cmd+a").unwrap(),
            KeyCombo::parse("command+a").unwrap()
        );
        assert_eq!(
            KeyCombo::parse("option+tab").unwrap().modifiers,
            ModifierFlags::ALT
        );
        assert_eq!(KeyCombo::parse("Ctrl+Return").unwrap().key, Key::Return);
        assert_eq!(KeyCombo::parse("f12").unwrap().key, Key::Function(12));
        assert_eq!(KeyCombo::parse("shift").unwrap().key, Key::Shift);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for combo in ["", "bogus", "ctrl+bogus", "a+b", "f13", "ctrl+"] {
            assert!(
                matches!(KeyCombo::parse(combo), Err(AutomationError::UnsupportedKey(_))),
                "{combo:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_keysyms() {
        assert_eq!(Key::Char('a').keysym(), 0x61);
        assert_eq!(Key::Function(1).keysym(), 0xffbe);
        assert_eq!(Key::Function(12).keysym(), 0xffc9);
        assert_eq!(char_keysym('é'), 0xe9);
        assert_eq!(char_keysym('€'), 0x0100_20ac);
        assert_eq!(char_keysym('\n'), 0xff0d);
    }

    #[test]
    fn test_key_events_carry_flags_on_both() {
        let [down, up] = key_events(&KeyCombo::parse("command+s").unwrap());
        assert_eq!(
            down,
            SyntheticEvent::KeyDown {
                key: Key::Char('s'),
                flags: ModifierFlags::COMMAND
            }
        );
        assert_eq!(
            up,
            SyntheticEvent::KeyUp {
                key: Key::Char('s'),
                flags: ModifierFlags::COMMAND
            }
        );
    }

    #[test]
    fn test_double_click_uses_click_count() {
        let events = double_click_events(5, 6);
        let counts: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                SyntheticEvent::PointerDown { click_count, .. } => Some(*click_count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_drag_order() {
        let events = drag_events(0, 0, 10, 20);
        assert!(matches!(events[0], SyntheticEvent::PointerMove { x: 0, y: 0 }));
        assert!(matches!(events[1], SyntheticEvent::PointerDown { .. }));
        assert!(matches!(events[2], SyntheticEvent::PointerDragged { x: 10, y: 20, .. }));
        assert!(matches!(events[3], SyntheticEvent::PointerUp { x: 10, y: 20, .. }));
    }

    #[test]
    fn test_mouse_button_parse() {
        assert_eq!("Right".parse::<MouseButton>().unwrap(), MouseButton::Right);
        assert!("fourth".parse::<MouseButton>().is_err());
        assert_eq!(MouseButton::Middle.to_string(), "middle");
    }
}
