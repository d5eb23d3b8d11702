// SPDX-License-Identifier: MIT
//
// Canvas: a window's view of the shared grid.
//
// Coordinates are relative to the window's top-left corner and every
// write is clipped to the window's rectangle (and to the grid), so a
// painter can never scribble over a neighbour.

use wincell_term::cell::{Cell, Style};
use wincell_term::grid::{Grid, Rect};

use crate::window::WindowDescriptor;

pub struct Canvas<'a> {
    grid: &'a mut Grid,
    bounds: Rect,
    clip: Rect,
}

impl<'a> Canvas<'a> {
    /// A canvas over `bounds` (grid coordinates).
    #[must_use]
    pub fn new(grid: &'a mut Grid, bounds: Rect) -> Self {
        let clip = bounds
            .intersect(grid.bounds())
            .unwrap_or(Rect::new(bounds.x, bounds.y, 0, 0));
        Self { grid, bounds, clip }
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.bounds.width
    }

    #[must_use]
    pub const fn height(&self) -> u16 {
        self.bounds.height
    }

    /// The window's rectangle in grid coordinates.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The part of the window that lies on the grid.
    #[must_use]
    pub const fn visible(&self) -> Rect {
        self.clip
    }

    /// Write styled text at a window-relative position. Returns the
    /// columns spanned.
    pub fn write(&mut self, x: i32, y: i32, styled_text: &str) -> u16 {
        self.grid.write_content(
            self.bounds.x.saturating_add(x),
            self.bounds.y.saturating_add(y),
            styled_text,
            Some(&self.clip),
        )
    }

    /// Fill the whole window.
    pub fn fill(&mut self, ch: char, style: Style) {
        self.grid.fill_rect(self.bounds, ch, style, Some(&self.clip));
    }

    /// Fill a window-relative rectangle.
    pub fn fill_rect(&mut self, rect: Rect, ch: char, style: Style) {
        let abs = Rect::new(
            self.bounds.x.saturating_add(rect.x),
            self.bounds.y.saturating_add(rect.y),
            rect.width,
            rect.height,
        );
        self.grid.fill_rect(abs, ch, style, Some(&self.clip));
    }

    /// Set one cell at a window-relative position. Returns `false` if the
    /// position is clipped.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        let (gx, gy) = (self.bounds.x.saturating_add(x), self.bounds.y.saturating_add(y));
        if !self.clip.contains(gx, gy) {
            return false;
        }
        match (u16::try_from(gx), u16::try_from(gy)) {
            (Ok(gx), Ok(gy)) => self.grid.set(gx, gy, cell),
            _ => false,
        }
    }
}

/// Paints a window's content when the compositor asks for it.
pub trait WindowPainter {
    fn paint(&mut self, window: &WindowDescriptor, canvas: &mut Canvas<'_>);
}

impl<F> WindowPainter for F
where
    F: FnMut(&WindowDescriptor, &mut Canvas<'_>),
{
    fn paint(&mut self, window: &WindowDescriptor, canvas: &mut Canvas<'_>) {
        self(window, canvas);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
