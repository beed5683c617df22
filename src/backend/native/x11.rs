//! X11 display bridge using x11rb
//!
//! Capture is a ZPixmap `GetImage` on the target window. Global input goes
//! through the XTEST extension; process-targeted input is delivered with
//! `SendEvent` straight to the process's window, which neither raises nor
//! focuses it.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::{
    self, Atom, AtomEnum, ConnectionExt, EventMask, ImageFormat, ImageOrder, KeyButMask, Window,
};
use x11rb::protocol::xtest::{self, ConnectionExt as XTestExt};
use x11rb::rust_connection::RustConnection;
use x11rb::{CURRENT_TIME, NONE};

use super::DisplayServer;
use crate::core::window::{Geometry, WindowHandle};
use crate::input::{EventTarget, ModifierFlags, SyntheticEvent, char_keysym};
use crate::screenshot::RawImage;

/// Time for clients to pick up a keyboard remap before the key is sent
const REMAP_SETTLE: Duration = Duration::from_millis(20);

/// Empty keycodes borrowed in rotation for keysyms missing from the keymap
const MAX_SPARE_KEYCODES: usize = 4;

const WHEEL_UP: u8 = 4;
const WHEEL_DOWN: u8 = 5;

/// X11 display bridge
pub struct X11Display {
    conn: RustConnection,
    root: Window,
    atoms: X11Atoms,
    /// Unused keycodes borrowed for keysyms missing from the keymap
    spare_keycodes: Vec<u8>,
}

/// Cached X11 atoms
struct X11Atoms {
    net_wm_name: Atom,
    net_wm_pid: Atom,
    wm_name: Atom,
    utf8_string: Atom,
}

impl X11Display {
    /// Connect to the X server named by `DISPLAY` and verify XTEST
    pub fn connect() -> anyhow::Result<Self> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        if conn.extension_information(xtest::X11_EXTENSION_NAME)?.is_none() {
            anyhow::bail!("X server does not support the XTEST extension");
        }
        conn.xtest_get_version(2, 2)?
            .reply()
            .context("XTEST version query failed")?;

        let atoms = Self::intern_atoms(&conn)?;
        let spare_keycodes = Self::load_keymap(&conn)?.spares(MAX_SPARE_KEYCODES);

        tracing::debug!(
            "Connected to X11 display (root {}, spare keycodes {:?})",
            root,
            spare_keycodes
        );

        Ok(Self {
            conn,
            root,
            atoms,
            spare_keycodes,
        })
    }

    fn intern_atoms(conn: &RustConnection) -> anyhow::Result<X11Atoms> {
        let net_wm_name = conn.intern_atom(false, b"_NET_WM_NAME")?.reply()?.atom;
        let net_wm_pid = conn.intern_atom(false, b"_NET_WM_PID")?.reply()?.atom;
        let wm_name = conn.intern_atom(false, b"WM_NAME")?.reply()?.atom;
        let utf8_string = conn.intern_atom(false, b"UTF8_STRING")?.reply()?.atom;

        Ok(X11Atoms {
            net_wm_name,
            net_wm_pid,
            wm_name,
            utf8_string,
        })
    }

    fn load_keymap(conn: &RustConnection) -> anyhow::Result<Keymap> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;
        let reply = conn.get_keyboard_mapping(min_keycode, count)?.reply()?;

        Ok(Keymap {
            min_keycode,
            per_keycode: reply.keysyms_per_keycode,
            keysyms: reply.keysyms,
        })
    }

    fn get_window_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, u32::MAX)?
            .reply()?;

        if reply.value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(reply.value))
        }
    }

    fn get_window_title(&self, window: Window) -> String {
        // Try _NET_WM_NAME first (UTF-8)
        if let Ok(Some(data)) =
            self.get_window_property(window, self.atoms.net_wm_name, self.atoms.utf8_string)
        {
            if let Ok(s) = String::from_utf8(data) {
                return s;
            }
        }

        // Fall back to WM_NAME
        if let Ok(Some(data)) =
            self.get_window_property(window, self.atoms.wm_name, AtomEnum::STRING.into())
        {
            return String::from_utf8_lossy(&data).into_owned();
        }

        String::new()
    }

    fn get_window_pid(&self, window: Window) -> Option<u32> {
        let data = self
            .get_window_property(window, self.atoms.net_wm_pid, AtomEnum::CARDINAL.into())
            .ok()??;
        let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
        Some(u32::from_ne_bytes(bytes))
    }

    fn get_window_geometry(&self, window: Window) -> anyhow::Result<Geometry> {
        let geom = self.conn.get_geometry(window)?.reply()?;

        // Translate to root window coordinates
        let translated = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)?
            .reply()?;

        Ok(Geometry {
            x: i32::from(translated.dst_x),
            y: i32::from(translated.dst_y),
            width: u32::from(geom.width),
            height: u32::from(geom.height),
        })
    }

    fn is_window_mapped(&self, window: Window) -> bool {
        self.conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .is_some_and(|attrs| attrs.map_state == xproto::MapState::VIEWABLE)
    }

    /// Keycode and state for `keysym` under `flags`, remapping a spare
    /// keycode when the keysym is not on the keyboard
    fn chord(
        &self,
        keymap: &mut Keymap,
        spares: &mut SpareKeys<'_>,
        keysym: u32,
        flags: ModifierFlags,
    ) -> anyhow::Result<Chord> {
        let (keycode, needs_shift) = match keymap.lookup(keysym) {
            Some(found) => found,
            None => (self.remap_spare(keymap, spares, keysym)?, false),
        };

        let mut flags = flags;
        if needs_shift {
            flags |= ModifierFlags::SHIFT;
        }

        let mut modifiers = Vec::new();
        for modifier in flags.modifiers() {
            let (code, _) = keymap
                .lookup(modifier.key().keysym())
                .with_context(|| format!("no keycode for modifier {modifier:?}"))?;
            modifiers.push(code);
        }

        Ok(Chord {
            modifiers,
            keycode,
            state: flags.bits(),
        })
    }

    fn remap_spare(
        &self,
        keymap: &mut Keymap,
        spares: &mut SpareKeys<'_>,
        keysym: u32,
    ) -> anyhow::Result<u8> {
        let (spare, reused) = spares
            .take()
            .with_context(|| format!("keysym {keysym:#x} is not mapped and no spare keycode is free"))?;
        if reused {
            // the keycode's previous keysym may still be in flight to clients
            thread::sleep(REMAP_SETTLE);
        }

        let per_keycode = keymap.per_keycode.max(1);
        let keysyms = vec![keysym; usize::from(per_keycode)];
        self.conn
            .change_keyboard_mapping(1, spare, per_keycode, &keysyms)?
            .check()?;
        keymap.assign(spare, keysym);
        thread::sleep(REMAP_SETTLE);

        tracing::debug!("Remapped spare keycode {} to keysym {:#x}", spare, keysym);
        Ok(spare)
    }

    /// Return borrowed keycodes to NoSymbol once their keys have been sent
    fn restore_spares(&self, per_keycode: u8, codes: &[u8]) {
        if codes.is_empty() {
            return;
        }
        thread::sleep(REMAP_SETTLE);
        for &code in codes {
            if let Err(e) = self.clear_keycode(code, per_keycode.max(1)) {
                tracing::warn!("Failed to restore spare keycode {}: {:#}", code, e);
            }
        }
    }

    fn clear_keycode(&self, code: u8, per_keycode: u8) -> anyhow::Result<()> {
        let empty = vec![0; usize::from(per_keycode)];
        self.conn
            .change_keyboard_mapping(1, code, per_keycode, &empty)?
            .check()?;
        self.conn.flush()?;
        Ok(())
    }

    /// Resolve and strike each character of `text` in order
    fn type_chars<F>(&self, text: &str, mut strike: F) -> anyhow::Result<()>
    where
        F: FnMut(&Chord) -> anyhow::Result<()>,
    {
        let mut keymap = Self::load_keymap(&self.conn)?;
        let mut spares = SpareKeys::new(&self.spare_keycodes);

        let typed = text.chars().try_for_each(|c| -> anyhow::Result<()> {
            let chord = self.chord(&mut keymap, &mut spares, char_keysym(c), ModifierFlags::NONE)?;
            strike(&chord)?;
            // keep each character ordered behind any remap of the next
            self.conn.flush()?;
            Ok(())
        });

        self.restore_spares(keymap.per_keycode, spares.used());
        typed
    }

    /// Resolve one key of a combo; a borrowed keycode is released with the key
    fn send_combo_key<F>(
        &self,
        key: u32,
        flags: ModifierFlags,
        press: bool,
        send: F,
    ) -> anyhow::Result<()>
    where
        F: FnOnce(&Chord, bool) -> anyhow::Result<()>,
    {
        let mut keymap = Self::load_keymap(&self.conn)?;
        let mut spares = SpareKeys::new(&self.spare_keycodes);
        let chord = self.chord(&mut keymap, &mut spares, key, flags)?;
        send(&chord, press)?;

        if !press && self.spare_keycodes.contains(&chord.keycode) {
            self.conn.flush()?;
            self.restore_spares(keymap.per_keycode, &[chord.keycode]);
        }
        Ok(())
    }

    fn fake(&self, type_: u8, detail: u8, x: i32, y: i32) -> anyhow::Result<()> {
        self.conn
            .xtest_fake_input(type_, detail, CURRENT_TIME, self.root, to_i16(x), to_i16(y), 0)?;
        Ok(())
    }

    fn fake_chord(&self, chord: &Chord, press: bool) -> anyhow::Result<()> {
        if press {
            for code in &chord.modifiers {
                self.fake(xproto::KEY_PRESS_EVENT, *code, 0, 0)?;
            }
            self.fake(xproto::KEY_PRESS_EVENT, chord.keycode, 0, 0)
        } else {
            self.fake(xproto::KEY_RELEASE_EVENT, chord.keycode, 0, 0)?;
            for code in chord.modifiers.iter().rev() {
                self.fake(xproto::KEY_RELEASE_EVENT, *code, 0, 0)?;
            }
            Ok(())
        }
    }

    fn post_global(&self, event: &SyntheticEvent) -> anyhow::Result<()> {
        match event {
            SyntheticEvent::PointerMove { x, y } | SyntheticEvent::PointerDragged { x, y, .. } => {
                self.fake(xproto::MOTION_NOTIFY_EVENT, 0, *x, *y)?;
            }
            // the server derives multi-click from timing; click_count is not sent
            SyntheticEvent::PointerDown { button, .. } => {
                self.fake(xproto::BUTTON_PRESS_EVENT, button.x11_button(), 0, 0)?;
            }
            SyntheticEvent::PointerUp { button, .. } => {
                self.fake(xproto::BUTTON_RELEASE_EVENT, button.x11_button(), 0, 0)?;
            }
            SyntheticEvent::Scroll { amount, .. } => {
                let button = wheel_button(*amount);
                for _ in 0..amount.unsigned_abs() {
                    self.fake(xproto::BUTTON_PRESS_EVENT, button, 0, 0)?;
                    self.fake(xproto::BUTTON_RELEASE_EVENT, button, 0, 0)?;
                }
            }
            SyntheticEvent::KeyDown { key, flags } | SyntheticEvent::KeyUp { key, flags } => {
                let press = matches!(event, SyntheticEvent::KeyDown { .. });
                self.send_combo_key(key.keysym(), *flags, press, |chord, press| {
                    self.fake_chord(chord, press)
                })?;
            }
            SyntheticEvent::Text(text) => {
                self.type_chars(text, |chord| {
                    self.fake_chord(chord, true)?;
                    self.fake_chord(chord, false)
                })?;
            }
        }

        self.conn.flush()?;
        Ok(())
    }

    fn send_key(&self, window: Window, chord: &Chord, press: bool) -> anyhow::Result<()> {
        let event = xproto::KeyPressEvent {
            response_type: if press {
                xproto::KEY_PRESS_EVENT
            } else {
                xproto::KEY_RELEASE_EVENT
            },
            detail: chord.keycode,
            sequence: 0,
            time: CURRENT_TIME,
            root: self.root,
            event: window,
            child: NONE,
            root_x: 1,
            root_y: 1,
            event_x: 1,
            event_y: 1,
            state: KeyButMask::from(chord.state),
            same_screen: true,
        };
        let mask = if press {
            EventMask::KEY_PRESS
        } else {
            EventMask::KEY_RELEASE
        };

        self.conn.send_event(true, window, mask, event)?.check()?;
        Ok(())
    }

    fn send_button(
        &self,
        window: Window,
        button: u8,
        (x, y): (i32, i32),
        press: bool,
    ) -> anyhow::Result<()> {
        let (event_x, event_y) = self.window_point(window, x, y)?;
        let event = xproto::ButtonPressEvent {
            response_type: if press {
                xproto::BUTTON_PRESS_EVENT
            } else {
                xproto::BUTTON_RELEASE_EVENT
            },
            detail: button,
            sequence: 0,
            time: CURRENT_TIME,
            root: self.root,
            event: window,
            child: NONE,
            root_x: to_i16(x),
            root_y: to_i16(y),
            event_x,
            event_y,
            // a release reports the button that was held
            state: KeyButMask::from(if press { 0 } else { button_mask(button) }),
            same_screen: true,
        };
        let mask = if press {
            EventMask::BUTTON_PRESS
        } else {
            EventMask::BUTTON_RELEASE
        };

        self.conn.send_event(true, window, mask, event)?.check()?;
        Ok(())
    }

    /// Root coordinates translated into `window`'s space
    fn window_point(&self, window: Window, x: i32, y: i32) -> anyhow::Result<(i16, i16)> {
        let translated = self
            .conn
            .translate_coordinates(self.root, window, to_i16(x), to_i16(y))?
            .reply()?;
        Ok((translated.dst_x, translated.dst_y))
    }

    /// Deliver button, key and text events to one window
    fn post_to_window(&self, window: Window, event: &SyntheticEvent) -> anyhow::Result<()> {
        match event {
            SyntheticEvent::PointerDown { x, y, button, .. } => {
                self.send_button(window, button.x11_button(), (*x, *y), true)?
            }
            SyntheticEvent::PointerUp { x, y, button, .. } => {
                self.send_button(window, button.x11_button(), (*x, *y), false)?
            }
            SyntheticEvent::KeyDown { key, flags } | SyntheticEvent::KeyUp { key, flags } => {
                let press = matches!(event, SyntheticEvent::KeyDown { .. });
                self.send_combo_key(key.keysym(), *flags, press, |chord, press| {
                    self.send_key(window, chord, press)
                })?;
            }
            SyntheticEvent::Text(text) => {
                self.type_chars(text, |chord| {
                    self.send_key(window, chord, true)?;
                    self.send_key(window, chord, false)
                })?;
            }
            SyntheticEvent::PointerMove { .. }
            | SyntheticEvent::PointerDragged { .. }
            | SyntheticEvent::Scroll { .. } => {
                anyhow::bail!("{event:?} cannot be delivered to a single window")
            }
        }

        self.conn.flush()?;
        Ok(())
    }
}

impl DisplayServer for X11Display {
    fn root_window(&self) -> u32 {
        self.root
    }

    fn screen_size(&self) -> anyhow::Result<(u32, u32)> {
        // queried fresh so RandR resizes are picked up
        let geom = self.conn.get_geometry(self.root)?.reply()?;
        Ok((u32::from(geom.width), u32::from(geom.height)))
    }

    fn cursor_position(&self) -> anyhow::Result<(i32, i32)> {
        let pointer = self.conn.query_pointer(self.root)?.reply()?;
        Ok((i32::from(pointer.root_x), i32::from(pointer.root_y)))
    }

    fn list_windows(&self) -> anyhow::Result<Vec<WindowHandle>> {
        let mut windows = Vec::new();
        let mut pending = self.conn.query_tree(self.root)?.reply()?.children;

        while let Some(window) = pending.pop() {
            // windows may be destroyed while we walk the tree
            let Ok(tree) = self.conn.query_tree(window)?.reply() else {
                continue;
            };
            pending.extend(tree.children);

            windows.push(WindowHandle {
                window_id: window,
                owner_pid: self.get_window_pid(window),
                bounds: self.get_window_geometry(window).unwrap_or_default(),
                title: self.get_window_title(window),
                mapped: self.is_window_mapped(window),
            });
        }

        Ok(windows)
    }

    fn rasterize(&self, window_id: u32) -> anyhow::Result<RawImage> {
        let setup = self.conn.setup();
        if setup.image_byte_order != ImageOrder::LSB_FIRST {
            anyhow::bail!("unsupported image byte order {:?}", setup.image_byte_order);
        }

        let geom = self.conn.get_geometry(window_id)?.reply()?;
        let reply = self
            .conn
            .get_image(
                ImageFormat::Z_PIXMAP,
                window_id,
                0,
                0,
                geom.width,
                geom.height,
                !0,
            )?
            .reply()
            .with_context(|| format!("GetImage on window {window_id} failed"))?;

        let bits_per_pixel = setup
            .pixmap_formats
            .iter()
            .find(|format| format.depth == reply.depth)
            .map(|format| format.bits_per_pixel);
        if bits_per_pixel != Some(32) {
            anyhow::bail!(
                "unsupported pixmap format at depth {}: {:?} bits per pixel",
                reply.depth,
                bits_per_pixel
            );
        }

        Ok(RawImage {
            width: u32::from(geom.width),
            height: u32::from(geom.height),
            depth: reply.depth,
            data: reply.data,
        })
    }

    fn post(&self, target: EventTarget, event: &SyntheticEvent) -> anyhow::Result<()> {
        match target {
            EventTarget::Global => self.post_global(event),
            EventTarget::Process { pid, window } => self
                .post_to_window(window, event)
                .with_context(|| format!("delivering to window {window} of PID {pid}")),
        }
    }

    fn process_exists(&self, pid: u32) -> bool {
        if cfg!(target_os = "linux") {
            Path::new("/proc").join(pid.to_string()).exists()
        } else {
            self.list_windows()
                .map(|windows| windows.iter().any(|w| w.owner_pid == Some(pid)))
                .unwrap_or(false)
        }
    }
}

/// Keycodes to press for one key
struct Chord {
    modifiers: Vec<u8>,
    keycode: u8,
    state: u16,
}

/// Snapshot of the server's keycode to keysym table
#[derive(Debug, Clone)]
struct Keymap {
    min_keycode: u8,
    per_keycode: u8,
    keysyms: Vec<u32>,
}

impl Keymap {
    fn rows(&self) -> impl Iterator<Item = (u8, &[u32])> {
        let per = usize::from(self.per_keycode.max(1));
        self.keysyms
            .chunks(per)
            .zip(self.min_keycode..=u8::MAX)
            .map(|(row, code)| (code, row))
    }

    /// Keycode for `keysym` and whether it needs Shift. Unshifted
    /// positions are preferred over shifted ones.
    fn lookup(&self, keysym: u32) -> Option<(u8, bool)> {
        for column in 0..2 {
            let found = self
                .rows()
                .find(|(_, row)| row.get(column) == Some(&keysym))
                .map(|(code, _)| code);
            if let Some(code) = found {
                return Some((code, column == 1));
            }
        }
        None
    }

    /// Up to `limit` keycodes with no keysyms at all, highest first
    fn spares(&self, limit: usize) -> Vec<u8> {
        let mut free: Vec<u8> = self
            .rows()
            .filter(|(_, row)| row.iter().all(|&sym| sym == 0))
            .map(|(code, _)| code)
            .collect();
        free.reverse();
        free.truncate(limit);
        free
    }

    fn assign(&mut self, keycode: u8, keysym: u32) {
        let per = usize::from(self.per_keycode.max(1));
        let start = usize::from(keycode.saturating_sub(self.min_keycode)) * per;
        if let Some(row) = self.keysyms.get_mut(start..start + per) {
            row.fill(keysym);
        }
    }
}

/// Spare keycodes handed out in rotation while one event is sent
struct SpareKeys<'a> {
    pool: &'a [u8],
    next: usize,
    used: Vec<u8>,
}

impl<'a> SpareKeys<'a> {
    fn new(pool: &'a [u8]) -> Self {
        Self {
            pool,
            next: 0,
            used: Vec::new(),
        }
    }

    /// Next keycode to remap, and whether it was already remapped earlier
    /// in this event
    fn take(&mut self) -> Option<(u8, bool)> {
        let code = *self.pool.get(self.next % self.pool.len().max(1))?;
        self.next += 1;
        let reused = self.used.contains(&code);
        if !reused {
            self.used.push(code);
        }
        Some((code, reused))
    }

    fn used(&self) -> &[u8] {
        &self.used
    }
}

fn wheel_button(amount: i32) -> u8 {
    if amount >= 0 { WHEEL_UP } else { WHEEL_DOWN }
}

fn button_mask(button: u8) -> u16 {
    match button {
        1..=5 => 1 << (7 + u16::from(button)),
        _ => 0,
    }
}

fn to_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Key, MouseButton};

    fn keymap() -> Keymap {
        // keycodes 8..=11, two keysyms each
        Keymap {
            min_keycode: 8,
            per_keycode: 2,
            keysyms: vec![
                0x61, 0x41, // a A
                0x31, 0x21, // 1 !
                0xffe1, 0, // Shift_L
                0, 0, // unused
            ],
        }
    }

    #[test]
    fn test_keymap_lookup_prefers_unshifted() {
        let map = keymap();
        assert_eq!(map.lookup(u32::from(b'a')), Some((8, false)));
        assert_eq!(map.lookup(u32::from(b'A')), Some((8, true)));
        assert_eq!(map.lookup(u32::from(b'!')), Some((9, true)));
        assert_eq!(map.lookup(Key::Shift.keysym()), Some((10, false)));
        assert_eq!(map.lookup(char_keysym('€')), None);
    }

    #[test]
    fn test_keymap_spare_and_assign() {
        let mut map = keymap();
        assert_eq!(map.spares(4), vec![11]);

        map.assign(11, char_keysym('€'));
        assert_eq!(map.lookup(char_keysym('€')), Some((11, false)));
        assert!(map.spares(4).is_empty());
    }

    #[test]
    fn test_spares_highest_first_and_limited() {
        let map = Keymap {
            min_keycode: 8,
            per_keycode: 1,
            keysyms: vec![0x61, 0, 0x62, 0, 0, 0],
        };
        assert_eq!(map.spares(2), vec![13, 12]);
        assert_eq!(map.spares(10), vec![13, 12, 11, 9]);
    }

    #[test]
    fn test_spare_keys_rotate_before_reuse() {
        let pool = [200, 199];
        let mut spares = SpareKeys::new(&pool);

        // consecutive unmapped characters land on different keycodes
        assert_eq!(spares.take(), Some((200, false)));
        assert_eq!(spares.take(), Some((199, false)));
        assert_eq!(spares.take(), Some((200, true)));
        assert_eq!(spares.used(), &[200, 199]);
    }

    #[test]
    fn test_single_spare_is_reused() {
        let pool = [250];
        let mut spares = SpareKeys::new(&pool);
        assert_eq!(spares.take(), Some((250, false)));
        assert_eq!(spares.take(), Some((250, true)));
        assert_eq!(spares.used(), &[250]);
    }

    #[test]
    fn test_no_spares() {
        let mut spares = SpareKeys::new(&[]);
        assert_eq!(spares.take(), None);
        assert!(spares.used().is_empty());
    }

    #[test]
    fn test_wheel_direction() {
        assert_eq!(wheel_button(3), WHEEL_UP);
        assert_eq!(wheel_button(-1), WHEEL_DOWN);
    }

    #[test]
    fn test_button_mask() {
        assert_eq!(button_mask(MouseButton::Left.x11_button()), 1 << 8);
        assert_eq!(button_mask(MouseButton::Right.x11_button()), 1 << 10);
        assert_eq!(button_mask(9), 0);
    }

    #[test]
    fn test_coordinates_saturate() {
        assert_eq!(to_i16(70_000), i16::MAX);
        assert_eq!(to_i16(-70_000), i16::MIN);
        assert_eq!(to_i16(12), 12);
    }
}
