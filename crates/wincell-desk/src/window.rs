// SPDX-License-Identifier: MIT
//
// Window descriptors: the geometry and flags the compositor reads each
// frame. Windows are created, moved and destroyed by whoever owns the
// layout; the compositor only looks.

use wincell_term::grid::Rect;

/// Stable window identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// One window's snapshot for a frame.
///
/// Width and height are signed: a layout caught mid-resize may hand over a
/// zero or negative extent, and such windows are simply not painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub id: WindowId,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub z_index: i32,
    pub always_on_top: bool,
    pub state: WindowState,
    pub dirty: bool,
}

impl WindowDescriptor {
    /// A normal, dirty window at z-index 0.
    #[must_use]
    pub const fn new(id: u32, left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            id: WindowId(id),
            left,
            top,
            width,
            height,
            z_index: 0,
            always_on_top: false,
            state: WindowState::Normal,
            dirty: true,
        }
    }

    #[must_use]
    pub const fn z(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    #[must_use]
    pub const fn on_top(mut self, always_on_top: bool) -> Self {
        self.always_on_top = always_on_top;
        self
    }

    #[must_use]
    pub const fn with_state(mut self, state: WindowState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub const fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    /// Not minimized and with a positive extent.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !matches!(self.state, WindowState::Minimized) && self.width > 0 && self.height > 0
    }

    /// The window's rectangle, or `None` if it has no positive extent.
    /// Extents beyond `u16::MAX` are clamped.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        if self.width <= 0 || self.height <= 0 {
            return None;
        }
        let width = u16::try_from(self.width).unwrap_or(u16::MAX);
        let height = u16::try_from(self.height).unwrap_or(u16::MAX);
        Some(Rect::new(self.left, self.top, width, height))
    }

    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.bounds().is_some_and(|r| r.contains(x, y))
    }
}

/// The topmost visible window under `(x, y)`.
///
/// Always-on-top windows are above every normal window; within a class,
/// higher z wins, and for equal z the later window in `windows` wins.
#[must_use]
pub fn window_at(windows: &[WindowDescriptor], x: i32, y: i32) -> Option<WindowId> {
    windows
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_visible() && w.contains(x, y))
        .max_by_key(|(i, w)| (w.always_on_top, w.z_index, *i))
        .map(|(_, w)| w.id)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
