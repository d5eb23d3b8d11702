// SPDX-License-Identifier: MIT
//
// Differential renderer over a shown/pending grid pair.
//
// Callers paint into the pending grid. `Screen::render` compares it against
// the shown grid (what the terminal currently displays) and emits output
// only for cells that differ:
//
//   - Row skip: an unchanged row is detected with one slice comparison and
//     produces no output at all, not even a cursor move.
//   - Within a changed row, unchanged runs become a single cursor-forward
//     and changed runs go through CellWriter (SGR only on style change).
//   - A frame is accumulated in one OutputBuffer and handed to the device
//     in one write. An empty frame performs no write.
//
// Both grids live behind one mutex. Resize replaces them together under
// that mutex, so a render never sees a shown/pending size mismatch.
//
// Lock order is screen, then device. Nothing that holds the device lock
// ever takes the screen lock.

use std::sync::{Mutex, MutexGuard};

use crate::ansi;
use crate::backend::{Device, Size};
use crate::error::Result;
use crate::grid::Grid;
use crate::output::{CellWriter, OutputBuffer};

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// Statistics from one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Rows skipped by the whole-row equality check.
    pub rows_skipped: usize,
    /// Cells that differed from the shown grid and were emitted.
    pub cells_rendered: usize,
    /// Bytes handed to the device (0 for an empty frame).
    pub bytes_written: usize,
}

impl RenderStats {
    /// Whether this frame changed anything on the terminal.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes_written == 0
    }
}

// ─── Frame diff ──────────────────────────────────────────────────────────────

/// Diff `pending` against `shown`, appending the frame's bytes to `out`.
///
/// With `full_redraw` every cell counts as changed and the frame starts
/// with a screen clear. Sync markers and the trailing reset are only
/// emitted when at least one cell changed, so a no-op frame leaves `out`
/// untouched. The grids must have equal dimensions; on a mismatch the
/// frame is treated as a full redraw.
pub fn diff_frame(
    shown: &Grid,
    pending: &Grid,
    full_redraw: bool,
    writer: &mut CellWriter,
    out: &mut OutputBuffer,
) -> RenderStats {
    let width = pending.width();
    let height = pending.height();
    let full = full_redraw || shown.width() != width || shown.height() != height;
    let mut stats = RenderStats::default();

    if width == 0 || height == 0 {
        return stats;
    }

    writer.reset_state();
    let start = out.len();
    ansi::begin_sync(out).ok();
    if full {
        ansi::reset(out).ok();
        ansi::clear_screen(out).ok();
    }

    for y in 0..height {
        let Some(row) = pending.row(y) else { break };
        let prev = if full { None } else { shown.row(y) };

        if prev.is_some_and(|prev| prev == row) {
            stats.rows_skipped += 1;
            continue;
        }

        // Column the terminal cursor sits at on this row, once positioned.
        let mut cursor: Option<u16> = None;
        let mut x = 0usize;
        while x < row.len() {
            let cell = &row[x];
            let span: u16 = if row.get(x + 1).is_some_and(|next| next.is_continuation()) {
                2
            } else {
                1
            };
            let end = x + usize::from(span);
            let changed = prev.is_none_or(|prev| prev[x..end] != row[x..end]);
            if !changed {
                x = end;
                continue;
            }

            // x < width, which is a u16.
            #[allow(clippy::cast_possible_truncation)]
            let col = x as u16;
            match cursor {
                Some(at) if at == col => {}
                Some(at) => {
                    ansi::cursor_forward(out, col - at).ok();
                }
                None => {
                    ansi::cursor_to(out, col, y).ok();
                }
            }
            writer.put(out, cell);
            stats.cells_rendered += 1;
            x = end;
            cursor = Some(col + span);
        }
    }

    if stats.cells_rendered == 0 {
        out.truncate(start);
        return stats;
    }

    ansi::reset(out).ok();
    ansi::end_sync(out).ok();
    stats.bytes_written = out.len() - start;
    stats
}

// ─── Screen ──────────────────────────────────────────────────────────────────

struct ScreenState {
    shown: Grid,
    pending: Grid,
    full_redraw: bool,
    writer: CellWriter,
    output: OutputBuffer,
}

/// The double-buffered cell grid shared by painters, the renderer and the
/// resize poller.
///
/// ```
/// use wincell_term::backend::{Device, ScriptedBackend, Size};
/// use wincell_term::diff::Screen;
///
/// let backend = ScriptedBackend::new(Size::new(20, 5));
/// let device = Device::new(backend.clone());
/// let screen = Screen::new(Size::new(20, 5));
///
/// screen.write_content(2, 1, "hello");
/// let first = screen.render(&device).unwrap();
/// assert!(first.bytes_written > 0);
///
/// // Nothing changed: nothing written.
/// let second = screen.render(&device).unwrap();
/// assert_eq!(second.bytes_written, 0);
/// ```
pub struct Screen {
    state: Mutex<ScreenState>,
}

impl Screen {
    /// A blank screen. The first render repaints everything.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            state: Mutex::new(ScreenState {
                shown: Grid::new(size.cols, size.rows),
                pending: Grid::new(size.cols, size.rows),
                full_redraw: true,
                writer: CellWriter::new(),
                output: OutputBuffer::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScreenState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current grid dimensions.
    #[must_use]
    pub fn size(&self) -> Size {
        let state = self.state();
        Size::new(state.pending.width(), state.pending.height())
    }

    /// Decode `styled_text` and write it into the pending grid at (x, y).
    ///
    /// Returns the number of columns written. Out-of-bounds positions and
    /// empty text write nothing.
    pub fn write_content(&self, x: i32, y: i32, styled_text: &str) -> u16 {
        self.state().pending.write_content(x, y, styled_text, None)
    }

    /// Run `f` with exclusive access to the pending grid.
    pub fn with_pending<R>(&self, f: impl FnOnce(&mut Grid) -> R) -> R {
        f(&mut self.state().pending)
    }

    /// A copy of the shown grid (what the terminal displays).
    #[must_use]
    pub fn shown(&self) -> Grid {
        self.state().shown.clone()
    }

    /// A copy of the pending grid.
    #[must_use]
    pub fn pending(&self) -> Grid {
        self.state().pending.clone()
    }

    /// Force the next render to repaint every cell.
    pub fn invalidate(&self) {
        self.state().full_redraw = true;
    }

    /// Replace both grids with blank grids of `size`.
    ///
    /// The swap happens under the screen lock, so it cannot interleave
    /// with a render. The next render repaints everything.
    pub fn resize(&self, size: Size) {
        let mut state = self.state();
        state.shown = Grid::new(size.cols, size.rows);
        state.pending = Grid::new(size.cols, size.rows);
        state.full_redraw = true;
        tracing::debug!(cols = size.cols, rows = size.rows, "screen resized");
    }

    /// Diff pending against shown and write the result to `device`.
    ///
    /// At most one device write per call; none when nothing changed. On
    /// success pending becomes shown and dirty flags are cleared. On a
    /// write failure the shown grid is left alone and the next render
    /// repaints everything.
    ///
    /// # Errors
    ///
    /// Returns the device's write error.
    pub fn render(&self, device: &Device) -> Result<RenderStats> {
        let mut guard = self.state();
        let state = &mut *guard;

        state.output.clear();
        let stats = diff_frame(
            &state.shown,
            &state.pending,
            state.full_redraw,
            &mut state.writer,
            &mut state.output,
        );

        if !state.output.is_empty() {
            if let Err(err) = device.lock().write_all(state.output.as_bytes()) {
                state.full_redraw = true;
                return Err(err.into());
            }
        }

        state.pending.clear_dirty();
        state.shown.copy_from(&state.pending);
        state.full_redraw = false;

        tracing::trace!(
            rows_skipped = stats.rows_skipped,
            cells_rendered = stats.cells_rendered,
            bytes_written = stats.bytes_written,
            "frame rendered"
        );
        Ok(stats)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::cell::{Attr, Cell, Style};
    use crate::color::CellColor;
    use crate::styled;
    use pretty_assertions::assert_eq;

    fn setup(cols: u16, rows: u16) -> (Screen, Device, ScriptedBackend) {
        let backend = ScriptedBackend::new(Size::new(cols, rows));
        let device = Device::new(backend.clone());
        (Screen::new(Size::new(cols, rows)), device, backend)
    }

    fn frame_text(backend: &ScriptedBackend) -> String {
        String::from_utf8_lossy(&backend.take_output()).into_owned()
    }

    #[test]
    fn first_render_clears_and_paints_everything() {
        let (screen, device, backend) = setup(4, 2);
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 8);
        assert_eq!(stats.rows_skipped, 0);
        let out = frame_text(&backend);
        assert!(out.starts_with("\x1b[?2026h"));
        assert!(out.contains("\x1b[2J"));
        assert!(out.ends_with("\x1b[0m\x1b[?2026l"));
        assert_eq!(backend.write_count(), 1);
    }

    #[test]
    fn second_render_without_changes_writes_nothing() {
        let (screen, device, backend) = setup(10, 3);
        screen.write_content(0, 0, "abc");
        screen.render(&device).unwrap();
        let _ = backend.take_output();
        let writes = backend.write_count();

        let stats = screen.render(&device).unwrap();
        assert_eq!(stats, RenderStats { rows_skipped: 3, cells_rendered: 0, bytes_written: 0 });
        assert_eq!(backend.write_count(), writes);
        assert!(backend.output().is_empty());
    }

    #[test]
    fn shown_matches_pending_after_render() {
        let (screen, device, _backend) = setup(10, 3);
        screen.write_content(1, 1, "xyz");
        screen.render(&device).unwrap();
        assert!(screen.shown() == screen.pending());
        assert!(!screen.pending().has_dirty());
    }

    #[test]
    fn single_change_positions_cursor_and_skips_rows() {
        let (screen, device, backend) = setup(10, 4);
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        screen.write_content(3, 2, "Q");
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 1);
        assert_eq!(stats.rows_skipped, 3);
        let out = frame_text(&backend);
        assert!(out.contains("\x1b[3;4H"), "{out:?}");
        assert!(out.contains('Q'));
        assert!(!out.contains("\x1b[2J"));
    }

    #[test]
    fn unchanged_gap_uses_cursor_forward() {
        let (screen, device, backend) = setup(10, 1);
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        screen.write_content(0, 0, "a");
        screen.write_content(2, 0, "b");
        screen.write_content(6, 0, "c");
        screen.render(&device).unwrap();
        let out = frame_text(&backend);
        assert!(out.contains("a\x1b[Cb"), "{out:?}");
        assert!(out.contains("b\x1b[3Cc"), "{out:?}");
    }

    #[test]
    fn identical_rewrite_emits_nothing() {
        let (screen, device, backend) = setup(10, 2);
        screen.write_content(0, 0, "same");
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        screen.write_content(0, 0, "same");
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 0);
        assert!(backend.output().is_empty());
    }

    #[test]
    fn styled_change_emits_sgr_once_per_run() {
        let (screen, device, backend) = setup(10, 1);
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        let red = Style::new().fg(CellColor::RED).attrs(Attr::BOLD);
        screen.write_content(0, 0, &styled::paint(red, "abc"));
        screen.render(&device).unwrap();
        let out = frame_text(&backend);
        assert_eq!(out.matches("\x1b[0;1;31m").count(), 1, "{out:?}");
        assert!(out.contains("abc"));
    }

    #[test]
    fn style_only_change_is_rendered() {
        let (screen, device, backend) = setup(5, 1);
        screen.write_content(0, 0, "x");
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        let blue = Style::new().bg(CellColor::BLUE);
        screen.write_content(0, 0, &styled::paint(blue, "x"));
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 1);
        assert!(frame_text(&backend).contains("44m"));
    }

    #[test]
    fn wide_char_is_emitted_once() {
        let (screen, device, backend) = setup(6, 1);
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        screen.write_content(1, 0, "日");
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 1);
        let out = frame_text(&backend);
        assert_eq!(out.matches('日').count(), 1);
        assert!(!out.contains("日 "));
    }

    #[test]
    fn overwriting_continuation_redraws_owner_row_correctly() {
        let (screen, device, backend) = setup(6, 1);
        screen.write_content(0, 0, "日");
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        screen.write_content(1, 0, "z");
        screen.render(&device).unwrap();
        let out = frame_text(&backend);
        assert!(out.contains(" z"), "{out:?}");
    }

    #[test]
    fn invalidate_forces_full_repaint() {
        let (screen, device, backend) = setup(3, 2);
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        screen.invalidate();
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 6);
        assert!(frame_text(&backend).contains("\x1b[2J"));
    }

    #[test]
    fn resize_replaces_both_grids() {
        let (screen, device, _backend) = setup(3, 2);
        screen.write_content(0, 0, "abc");
        screen.resize(Size::new(5, 4));
        assert_eq!(screen.size(), Size::new(5, 4));
        assert_eq!(screen.shown().width(), 5);
        assert_eq!(screen.pending().height(), 4);
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 20);
    }

    #[test]
    fn zero_size_screen_writes_nothing() {
        let (screen, device, backend) = setup(0, 0);
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats, RenderStats::default());
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn with_pending_gives_grid_access() {
        let (screen, device, backend) = setup(4, 1);
        screen.render(&device).unwrap();
        let _ = backend.take_output();

        screen.with_pending(|grid| grid.set(2, 0, Cell::new('#')));
        let stats = screen.render(&device).unwrap();
        assert_eq!(stats.cells_rendered, 1);
        assert!(frame_text(&backend).contains('#'));
    }

    #[test]
    fn diff_frame_is_pure() {
        let shown = Grid::new(4, 2);
        let mut pending = Grid::new(4, 2);
        pending.write_content(0, 1, "hi", None);
        let mut writer = CellWriter::new();
        let mut out = OutputBuffer::new();
        let stats = diff_frame(&shown, &pending, false, &mut writer, &mut out);
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(stats.cells_rendered, 2);
        assert_eq!(stats.bytes_written, out.len());
    }
}
