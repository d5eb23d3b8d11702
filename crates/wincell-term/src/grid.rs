// SPDX-License-Identifier: MIT
//
// Grid: the 2D cell array that windows paint into.
//
// Flat `Vec<Cell>` with row-major indexing. A row's cells are contiguous,
// so the diff renderer's left-to-right row scan and its whole-row equality
// pre-check are both linear passes over one slice.
//
// Writes never fail. Coordinates are signed so a window dragged partly
// off-screen can still paint: whatever lands outside the grid (or outside
// the optional clip rectangle) is dropped.
//
// Wide characters occupy two columns: the owner cell holds the codepoint,
// the next cell is a continuation (ch = 0). Overwriting either half of a
// wide character breaks it, replacing the surviving half with a space, so
// the grid never holds an orphaned half.

use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, Style};
use crate::styled;

// ─── Rect ────────────────────────────────────────────────────────────────────

/// A rectangle in grid coordinates.
///
/// The origin is signed (windows may hang off the top or left edge); the
/// extent is unsigned.
///
/// ```
/// use wincell_term::grid::Rect;
///
/// let r = Rect::new(10, 5, 80, 24);
/// assert!(r.contains(10, 5));
/// assert!(r.contains(89, 28));
/// assert!(!r.contains(90, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive). Saturates at `i32::MAX`.
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// Bottom edge (exclusive). Saturates at `i32::MAX`.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the point `(px, py)` lies inside.
    #[inline]
    #[must_use]
    pub const fn contains(self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Whether `other` lies entirely inside `self`.
    ///
    /// An empty `other` is contained by anything.
    #[inline]
    #[must_use]
    pub const fn contains_rect(self, other: Self) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Whether the two rectangles share at least one cell.
    #[inline]
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.intersect(other).is_some()
    }

    /// The overlapping region, or `None` if the rectangles don't overlap.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            // Both differences are positive and bounded by a u16 extent.
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            Some(Self {
                x: x1,
                y: y1,
                width: (x2 - x1) as u16,
                height: (y2 - y1) as u16,
            })
        } else {
            None
        }
    }
}

// ─── Grid ────────────────────────────────────────────────────────────────────

/// A 2D array of cells.
///
/// `index = y * width + x`.
///
/// ```
/// use wincell_term::grid::Grid;
///
/// let mut grid = Grid::new(80, 24);
/// grid.write_content(5, 3, "hi", None);
/// assert_eq!(grid.get(5, 3).unwrap().character(), Some('h'));
/// assert!(grid.get(6, 3).unwrap().dirty);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Grid {
    /// A grid of clean empty cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; usize::from(width) * usize::from(height)],
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The whole grid as a [`Rect`] at the origin.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row as a slice, or `None` if `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.width)])
        } else {
            None
        }
    }

    /// Iterate cells with their `(x, y)` coordinates.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        let w = usize::from(self.width).max(1);
        self.cells.iter().enumerate().map(move |(i, cell)| {
            // x < width and y < height, both u16.
            ((i % w) as u16, (i / w) as u16, cell)
        })
    }

    /// Whether any cell was written since the last [`Grid::clear_dirty`].
    #[must_use]
    pub fn has_dirty(&self) -> bool {
        self.cells.iter().any(|c| c.dirty)
    }

    // ─── Whole-grid operations ──────────────────────────────────────────

    /// Reset every cell to a clean empty cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    pub fn clear_dirty(&mut self) {
        for cell in &mut self.cells {
            cell.dirty = false;
        }
    }

    /// Resize, discarding all content.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(usize::from(width) * usize::from(height), Cell::EMPTY);
    }

    /// Copy another grid's cells into this one. Dimensions must match;
    /// on a mismatch the grid is resized to `other` first.
    pub fn copy_from(&mut self, other: &Self) {
        if self.width != other.width || self.height != other.height {
            self.resize(other.width, other.height);
        }
        self.cells.copy_from_slice(&other.cells);
    }

    // ─── Cell writes ─────────────────────────────────────────────────────

    /// Write one cell, marking it dirty. Out-of-bounds writes are ignored.
    ///
    /// Returns `true` if the position was in bounds.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.break_wide_char_at(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell.touched();
        true
    }

    /// Fill `rect` (clipped to the grid and to `clip`) with `ch` in `style`.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn fill_rect(&mut self, rect: Rect, ch: char, style: Style, clip: Option<&Rect>) {
        let Some(mut area) = rect.intersect(self.bounds()) else {
            return;
        };
        if let Some(clip) = clip {
            let Some(clipped) = area.intersect(*clip) else {
                return;
            };
            area = clipped;
        }

        // Intersection with the origin-anchored bounds makes these
        // non-negative and within the grid.
        let x1 = area.x as u16;
        let x2 = area.right() as u16;
        let fill = Cell::styled(ch, style).touched();
        for y in area.y as u16..area.bottom() as u16 {
            self.break_wide_char_at(x1, y);
            if x2 < self.width {
                self.break_wide_char_at(x2, y);
            }
            let start = self.index(x1, y);
            let end = self.index(x2, y);
            self.cells[start..end].fill(fill);
        }
    }

    /// Break any wide character touching `(x, y)`.
    ///
    /// - `(x, y)` is a continuation: the owner at `x - 1` becomes a space.
    /// - The cell after `(x, y)` is a continuation: it becomes a space.
    ///
    /// Replaced halves keep their style and are marked dirty.
    fn break_wide_char_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);

        if self.cells[idx].is_continuation() && x > 0 {
            let prev = idx - 1;
            self.cells[prev].ch = u32::from(b' ');
            self.cells[prev].dirty = true;
        }

        if x + 1 < self.width {
            let next = idx + 1;
            if self.cells[next].is_continuation() {
                self.cells[next].ch = u32::from(b' ');
                self.cells[next].dirty = true;
            }
        }
    }

    // ─── Content push ───────────────────────────────────────────────────

    /// Write styled text starting at `(x, y)`.
    ///
    /// `text` is literal characters interleaved with style markers (see
    /// [`crate::styled`]). Each character lands in the next column with the
    /// style active at that point, and is marked dirty. Wide characters
    /// take two columns; zero-width and control characters are skipped.
    ///
    /// Columns outside the grid or outside `clip` are skipped silently. A
    /// wide character whose two halves don't both fit is written as a
    /// space in the half that does.
    ///
    /// Returns the number of columns the text spanned from `x`, whether or
    /// not they were visible.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn write_content(&mut self, x: i32, y: i32, text: &str, clip: Option<&Rect>) -> u16 {
        if y < 0 || y >= i32::from(self.height) || text.is_empty() {
            return 0;
        }
        let row = y as u16;
        let width = i32::from(self.width);
        let mut col = x;

        for (ch, style) in styled::chars(text) {
            if col >= width {
                break;
            }
            let w = ch.width().unwrap_or(0);
            if w == 0 {
                continue;
            }

            if w == 1 {
                if self.visible(col, y, clip) {
                    self.set(col as u16, row, Cell::styled(ch, style));
                }
                col += 1;
                continue;
            }

            let head = self.visible(col, y, clip);
            let tail = col + 1 < width && self.visible(col + 1, y, clip);
            match (head, tail) {
                (true, true) => {
                    self.set(col as u16, row, Cell::styled(ch, style));
                    let cont = col as u16 + 1;
                    self.break_wide_char_at(cont, row);
                    let idx = self.index(cont, row);
                    self.cells[idx] = Cell::continuation(style).touched();
                }
                (true, false) => {
                    self.set(col as u16, row, Cell::styled(' ', style));
                }
                (false, true) => {
                    self.set(col as u16 + 1, row, Cell::styled(' ', style));
                }
                (false, false) => {}
            }
            col += 2;
        }

        (col - x).clamp(0, i32::from(u16::MAX)) as u16
    }

    #[inline]
    fn visible(&self, x: i32, y: i32, clip: Option<&Rect>) -> bool {
        x >= 0 && x < i32::from(self.width) && clip.is_none_or(|c| c.contains(x, y))
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Grid({}x{})", self.width, self.height)
    }
}

// ─── Text width ──────────────────────────────────────────────────────────────

/// Display width of the visible part of styled text, in columns.
///
/// ```
/// use wincell_term::grid::text_width;
///
/// assert_eq!(text_width("hello"), 5);
/// assert_eq!(text_width("\x1b[0;1mab\x1b[0m中"), 4);
/// ```
#[must_use]
pub fn text_width(text: &str) -> usize {
    styled::chars(text).map(|(ch, _)| ch.width().unwrap_or(0)).sum()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
