//! Window handles and target resolution
//!
//! Window identifiers can go stale between enumeration and capture, so
//! handles are never cached: every lookup works on a fresh enumeration
//! supplied by the caller.

use serde::Serialize;

/// Geometry of a window in root coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A window from one enumeration pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowHandle {
    /// Platform window identifier
    pub window_id: u32,
    /// Process owning the window, when the window advertises one
    pub owner_pid: Option<u32>,
    pub bounds: Geometry,
    pub title: String,
    /// Whether the window is currently mapped (viewable)
    pub mapped: bool,
}

/// Pick the window to capture or target for `pid`.
///
/// Only windows owned by `pid` are considered; a window belonging to another
/// process is never returned as a substitute. Among the owned windows, mapped
/// windows with a non-empty area win, largest first; an owned window that is
/// unmapped or empty is used only when nothing better exists.
pub fn select_window_for_pid(windows: &[WindowHandle], pid: u32) -> Option<&WindowHandle> {
    let owned = windows.iter().filter(|w| w.owner_pid == Some(pid));

    owned.max_by_key(|w| {
        let usable = w.mapped && !w.bounds.is_empty();
        (usable, w.bounds.area())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(id: u32, pid: Option<u32>, width: u32, height: u32, mapped: bool) -> WindowHandle {
        WindowHandle {
            window_id: id,
            owner_pid: pid,
            bounds: Geometry {
                x: 0,
                y: 0,
                width,
                height,
            },
            title: format!("window {id}"),
            mapped,
        }
    }

    #[test]
    fn test_select_prefers_largest_mapped() {
        let windows = vec![
            window(1, Some(42), 100, 100, true),
            window(2, Some(42), 800, 600, true),
            window(3, Some(42), 4000, 4000, false),
            window(4, Some(7), 1920, 1080, true),
        ];
        assert_eq!(select_window_for_pid(&windows, 42).unwrap().window_id, 2);
    }

    #[test]
    fn test_select_falls_back_to_unmapped_owned_window() {
        let windows = vec![window(9, Some(42), 0, 0, false), window(4, Some(7), 50, 50, true)];
        assert_eq!(select_window_for_pid(&windows, 42).unwrap().window_id, 9);
    }

    #[test]
    fn test_select_never_substitutes_other_process() {
        let windows = vec![window(4, Some(7), 1920, 1080, true), window(5, None, 10, 10, true)];
        assert!(select_window_for_pid(&windows, 42).is_none());
    }

    #[test]
    fn test_geometry_area() {
        let g = Geometry {
            x: -10,
            y: 10,
            width: 100,
            height: 50,
        };
        assert_eq!(g.area(), 5000);
        assert!(!g.is_empty());
        assert!(Geometry { height: 0, ..g }.is_empty());
    }
}
