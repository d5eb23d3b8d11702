// SPDX-License-Identifier: MIT
//
// Occlusion compositor.
//
// Each frame the compositor gets a fresh snapshot of window descriptors
// and paints the ones that need it into the pending grid:
//
//   1. Invalidate the coverage cache and repaint the desktop background
//      under every rectangle scheduled for clearing (where windows used
//      to be).
//   2. Pass 1: normal windows in ascending z-order (stable for ties).
//      The active window is held back to the end of the pass if a dirty
//      window above it overlaps it.
//   3. Pass 2: always-on-top windows, whatever their z compared to pass 1.
//
// A window is painted when it is dirty, or when something painted earlier
// in the same frame (a cleared rectangle, a lower window) overlaps it:
// the grid is persistent, so anything drawn underneath must be redrawn
// on top. A window fully contained by a window above it is never
// painted; its cells would be overwritten anyway.
//
// Coverage classes: a normal window is covered by a higher-z visible
// normal window or by any visible always-on-top window that contains it.
// An always-on-top window is covered only by a higher-z always-on-top
// window.

use std::collections::HashMap;

use wincell_term::cell::Style;
use wincell_term::diff::Screen;
use wincell_term::grid::{Grid, Rect};

use crate::canvas::{Canvas, WindowPainter};
use crate::window::{WindowDescriptor, WindowId};

// ─── Config ──────────────────────────────────────────────────────────────────

/// What the desktop looks like where no window is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopConfig {
    pub background: Style,
    pub fill: char,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            background: Style::DEFAULT,
            fill: ' ',
        }
    }
}

// ─── FrameReport ─────────────────────────────────────────────────────────────

/// What one `compose` call did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Windows painted, in paint order.
    pub painted: Vec<WindowId>,
    /// Windows that needed painting but were fully covered.
    pub covered: Vec<WindowId>,
    /// The active window, if it was held back to the end of pass 1.
    pub deferred: Option<WindowId>,
    /// Desktop rectangles repainted from the clear queue.
    pub cleared: usize,
}

impl FrameReport {
    #[must_use]
    pub fn was_painted(&self, id: WindowId) -> bool {
        self.painted.contains(&id)
    }
}

// ─── Compositor ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Compositor {
    config: DesktopConfig,
    /// Window id → fully covered. Valid for one frame only.
    coverage: HashMap<WindowId, bool>,
    clear_queue: Vec<Rect>,
}

impl Compositor {
    #[must_use]
    pub fn new(config: DesktopConfig) -> Self {
        Self {
            config,
            coverage: HashMap::new(),
            clear_queue: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &DesktopConfig {
        &self.config
    }

    /// Repaint `rect` with the desktop background before the next frame.
    /// Use it for the old rectangle of a window that moved or closed.
    pub fn schedule_clear(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.clear_queue.push(rect);
        }
    }

    #[must_use]
    pub fn pending_clears(&self) -> &[Rect] {
        &self.clear_queue
    }

    /// Paint one frame into `grid`.
    ///
    /// Window dirty flags are left alone; the caller owns the descriptors
    /// and clears them after the frame, using the report if needed.
    pub fn compose(
        &mut self,
        windows: &[WindowDescriptor],
        active: Option<WindowId>,
        grid: &mut Grid,
        painter: &mut impl WindowPainter,
    ) -> FrameReport {
        self.coverage.clear();
        let mut report = FrameReport::default();

        // Rectangles painted so far this frame.
        let mut painted: Vec<Rect> = Vec::new();
        for rect in std::mem::take(&mut self.clear_queue) {
            grid.fill_rect(rect, self.config.fill, self.config.background, None);
            painted.push(rect);
            report.cleared += 1;
        }

        let mut order: Vec<&WindowDescriptor> = windows.iter().filter(|w| w.is_visible()).collect();
        order.sort_by_key(|w| w.z_index);

        // Pass 1: normal windows.
        let mut deferred = None;
        for (i, window) in order.iter().enumerate() {
            if window.always_on_top || !needs_paint(window, &painted) {
                continue;
            }
            if self.is_covered(i, &order) {
                report.covered.push(window.id);
                continue;
            }
            if active == Some(window.id) && dirty_overlap_above(i, &order) {
                deferred = Some(*window);
                continue;
            }
            paint(window, grid, painter, &mut painted, &mut report);
        }
        if let Some(window) = deferred {
            tracing::trace!(id = window.id.0, "active window painted last");
            report.deferred = Some(window.id);
            paint(window, grid, painter, &mut painted, &mut report);
        }

        // Pass 2: always-on-top windows.
        for (i, window) in order.iter().enumerate() {
            if !window.always_on_top || !needs_paint(window, &painted) {
                continue;
            }
            if self.is_covered(i, &order) {
                report.covered.push(window.id);
                continue;
            }
            paint(window, grid, painter, &mut painted, &mut report);
        }

        tracing::trace!(
            painted = report.painted.len(),
            covered = report.covered.len(),
            cleared = report.cleared,
            "frame composed"
        );
        report
    }

    /// `compose` into the screen's pending grid.
    pub fn compose_into(
        &mut self,
        screen: &Screen,
        windows: &[WindowDescriptor],
        active: Option<WindowId>,
        painter: &mut impl WindowPainter,
    ) -> FrameReport {
        screen.with_pending(|grid| self.compose(windows, active, grid, painter))
    }

    /// Whether `order[index]` is fully contained by a window that paints
    /// above it. Memoized per frame.
    fn is_covered(&mut self, index: usize, order: &[&WindowDescriptor]) -> bool {
        let window = order[index];
        if let Some(&covered) = self.coverage.get(&window.id) {
            return covered;
        }
        let covered = window.bounds().is_some_and(|bounds| {
            order
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != index && paints_above(other, j, window, index))
                .any(|(_, other)| other.bounds().is_some_and(|b| b.contains_rect(bounds)))
        });
        self.coverage.insert(window.id, covered);
        covered
    }
}

/// Whether `upper` (at `upper_idx` in the sorted order) ends up above
/// `lower`. Equal z-indexes stack in snapshot order.
fn paints_above(
    upper: &WindowDescriptor,
    upper_idx: usize,
    lower: &WindowDescriptor,
    lower_idx: usize,
) -> bool {
    match (upper.always_on_top, lower.always_on_top) {
        (true, false) => true,
        (false, true) => false,
        // Same class: `order` is sorted by z, so a later index with equal z
        // counts as above. A stable sort keeps snapshot order for ties.
        _ => upper_idx > lower_idx,
    }
}

fn needs_paint(window: &WindowDescriptor, painted: &[Rect]) -> bool {
    window.dirty
        || window
            .bounds()
            .is_some_and(|b| painted.iter().any(|r| r.intersects(b)))
}

/// Whether a dirty normal window above `order[index]` overlaps it.
fn dirty_overlap_above(index: usize, order: &[&WindowDescriptor]) -> bool {
    let Some(bounds) = order[index].bounds() else {
        return false;
    };
    order[index + 1..].iter().any(|other| {
        !other.always_on_top && other.dirty && other.bounds().is_some_and(|b| b.intersects(bounds))
    })
}

fn paint(
    window: &WindowDescriptor,
    grid: &mut Grid,
    painter: &mut impl WindowPainter,
    painted: &mut Vec<Rect>,
    report: &mut FrameReport,
) {
    let Some(bounds) = window.bounds() else {
        return;
    };
    let mut canvas = Canvas::new(grid, bounds);
    painter.paint(window, &mut canvas);
    painted.push(bounds);
    report.painted.push(window.id);
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Fills each window with the last digit of its id and records calls.
    #[derive(Default)]
    struct Digits {
        calls: Vec<WindowId>,
    }

    impl WindowPainter for Digits {
        fn paint(&mut self, window: &WindowDescriptor, canvas: &mut Canvas<'_>) {
            self.calls.push(window.id);
            let digit = char::from_digit(window.id.0 % 10, 10).unwrap_or('?');
            canvas.fill(digit, Style::DEFAULT);
        }
    }

    fn at(grid: &Grid, x: u16, y: u16) -> char {
        grid.get(x, y).and_then(|c| c.character()).unwrap_or(' ')
    }

    fn compose(windows: &[WindowDescriptor], active: Option<u32>) -> (FrameReport, Grid, Digits) {
        let mut compositor = Compositor::default();
        let mut grid = Grid::new(20, 10);
        let mut painter = Digits::default();
        let report = compositor.compose(windows, active.map(WindowId), &mut grid, &mut painter);
        (report, grid, painter)
    }

    #[test]
    fn fully_covered_window_is_never_painted() {
        let a = WindowDescriptor::new(1, 0, 0, 10, 5).z(1);
        let b = WindowDescriptor::new(2, 2, 1, 4, 2).z(0);
        let (report, grid, painter) = compose(&[a, b], None);
        assert_eq!(painter.calls, vec![WindowId(1)]);
        assert_eq!(report.covered, vec![WindowId(2)]);
        assert_eq!(at(&grid, 3, 1), '1');
    }

    #[test]
    fn partial_overlap_paints_both_in_z_order() {
        let low = WindowDescriptor::new(1, 0, 0, 6, 3).z(0);
        let high = WindowDescriptor::new(2, 4, 1, 6, 3).z(1);
        let (report, grid, _) = compose(&[high, low], None);
        assert_eq!(report.painted, vec![WindowId(1), WindowId(2)]);
        assert_eq!(at(&grid, 0, 0), '1');
        assert_eq!(at(&grid, 5, 1), '2');
    }

    #[test]
    fn always_on_top_beats_higher_z() {
        let a = WindowDescriptor::new(5, 0, 0, 8, 4).z(5);
        let b = WindowDescriptor::new(1, 4, 2, 8, 4).z(1).on_top(true);
        let (report, grid, _) = compose(&[a, b], None);
        assert_eq!(report.painted, vec![WindowId(5), WindowId(1)]);
        assert_eq!(at(&grid, 5, 3), '1');
        assert_eq!(at(&grid, 0, 0), '5');
    }

    #[test]
    fn window_near_coordinate_limit_does_not_overflow() {
        let far = WindowDescriptor::new(1, i32::MAX - 5, 0, 30, 3).z(1);
        let near = WindowDescriptor::new(2, 0, 0, 4, 2).z(0);
        let (report, grid, _) = compose(&[far, near], None);
        assert_eq!(report.painted, vec![WindowId(2), WindowId(1)]);
        assert!(report.covered.is_empty());
        assert_eq!(at(&grid, 0, 0), '2');
        assert_eq!(at(&grid, 19, 0), ' ');
    }

    #[test]
    fn always_on_top_covers_normal_window() {
        let normal = WindowDescriptor::new(1, 2, 2, 3, 3).z(9);
        let top = WindowDescriptor::new(2, 0, 0, 10, 10).z(0).on_top(true);
        let (report, _, painter) = compose(&[normal, top], None);
        assert_eq!(report.covered, vec![WindowId(1)]);
        assert_eq!(painter.calls, vec![WindowId(2)]);
    }

    #[test]
    fn normal_window_never_covers_always_on_top() {
        let top = WindowDescriptor::new(1, 2, 2, 3, 3).z(0).on_top(true);
        let big = WindowDescriptor::new(2, 0, 0, 10, 10).z(9);
        let (report, grid, _) = compose(&[top, big], None);
        assert!(report.covered.is_empty());
        assert_eq!(report.painted, vec![WindowId(2), WindowId(1)]);
        assert_eq!(at(&grid, 3, 3), '1');
    }

    #[test]
    fn minimized_and_degenerate_windows_are_skipped() {
        let windows = [
            WindowDescriptor::new(1, 0, 0, 4, 4).with_state(crate::window::WindowState::Minimized),
            WindowDescriptor::new(2, 0, 0, 0, 4),
            WindowDescriptor::new(3, 0, 0, 4, -2),
            WindowDescriptor::new(4, 0, 0, 2, 2),
        ];
        let (report, _, _) = compose(&windows, None);
        assert_eq!(report.painted, vec![WindowId(4)]);
    }

    #[test]
    fn clean_windows_are_not_repainted() {
        let a = WindowDescriptor::new(1, 0, 0, 4, 4).with_dirty(false);
        let b = WindowDescriptor::new(2, 10, 0, 4, 4);
        let (report, _, _) = compose(&[a, b], None);
        assert_eq!(report.painted, vec![WindowId(2)]);
    }

    #[test]
    fn clean_window_above_a_repainted_one_is_repainted() {
        let low = WindowDescriptor::new(1, 0, 0, 6, 3).z(0);
        let high = WindowDescriptor::new(2, 4, 1, 6, 3).z(1).with_dirty(false);
        let (report, grid, _) = compose(&[low, high], None);
        assert_eq!(report.painted, vec![WindowId(1), WindowId(2)]);
        assert_eq!(at(&grid, 5, 1), '2');
    }

    #[test]
    fn active_window_is_deferred_under_dirty_overlap() {
        let active = WindowDescriptor::new(1, 0, 0, 6, 3).z(0);
        let above = WindowDescriptor::new(2, 4, 1, 6, 3).z(1);
        let (report, grid, _) = compose(&[active, above], Some(1));
        assert_eq!(report.deferred, Some(WindowId(1)));
        assert_eq!(report.painted, vec![WindowId(2), WindowId(1)]);
        assert_eq!(at(&grid, 5, 1), '1');
    }

    #[test]
    fn active_window_without_overlap_is_not_deferred() {
        let active = WindowDescriptor::new(1, 0, 0, 3, 3).z(0);
        let above = WindowDescriptor::new(2, 10, 0, 3, 3).z(1);
        let (report, _, _) = compose(&[active, above], Some(1));
        assert_eq!(report.deferred, None);
        assert_eq!(report.painted, vec![WindowId(1), WindowId(2)]);
    }

    #[test]
    fn equal_z_stacks_in_snapshot_order() {
        let first = WindowDescriptor::new(1, 0, 0, 4, 4);
        let second = WindowDescriptor::new(2, 0, 0, 4, 4);
        let (report, grid, _) = compose(&[first, second], None);
        assert_eq!(report.covered, vec![WindowId(1)]);
        assert_eq!(at(&grid, 0, 0), '2');
    }

    #[test]
    fn cleared_rects_are_repainted_and_drained() {
        let mut compositor = Compositor::new(DesktopConfig {
            background: Style::DEFAULT,
            fill: '.',
        });
        let mut grid = Grid::new(10, 3);
        let mut painter = Digits::default();
        let window = WindowDescriptor::new(1, 4, 0, 3, 3).with_dirty(false);

        compositor.schedule_clear(Rect::new(0, 0, 6, 2));
        compositor.schedule_clear(Rect::new(0, 0, 0, 0));
        assert_eq!(compositor.pending_clears().len(), 1);

        let report = compositor.compose(&[window], None, &mut grid, &mut painter);
        assert_eq!(report.cleared, 1);
        assert!(compositor.pending_clears().is_empty());
        assert_eq!(at(&grid, 0, 0), '.');
        // The clean window under the cleared area was repainted on top.
        assert_eq!(report.painted, vec![WindowId(1)]);
        assert_eq!(at(&grid, 4, 0), '1');
        assert_eq!(at(&grid, 0, 2), ' ');
    }

    #[test]
    fn coverage_is_recomputed_every_frame() {
        let mut compositor = Compositor::default();
        let mut grid = Grid::new(20, 10);
        let mut painter = Digits::default();

        let low = WindowDescriptor::new(1, 1, 1, 2, 2);
        let high = WindowDescriptor::new(2, 0, 0, 5, 5).z(1);
        let report = compositor.compose(&[low, high], None, &mut grid, &mut painter);
        assert_eq!(report.covered, vec![WindowId(1)]);

        let moved = WindowDescriptor::new(2, 10, 0, 5, 5).z(1);
        let report = compositor.compose(&[low, moved], None, &mut grid, &mut painter);
        assert!(report.was_painted(WindowId(1)));
    }
}
