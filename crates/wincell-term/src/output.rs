// SPDX-License-Identifier: MIT
//
// Output buffering and style tracking.
//
//   OutputBuffer collects a whole frame in memory so it reaches the
//   terminal in a single write. Interleaving many small writes with the
//   input reader is what corrupts in-flight escape sequences.
//
//   CellWriter remembers the last style it emitted. Styles are complete
//   (every SGR starts with 0), so the only decision is "same as before or
//   not": a run of equally-styled cells costs one SGR sequence total.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::{Cell, Style};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates one frame of terminal output.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// An empty buffer with 16 KB of capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Write a codepoint as UTF-8. Invalid codepoints produce `?`.
    pub fn write_codepoint(&mut self, cp: u32) {
        match char::from_u32(cp) {
            Some(ch) if cp != 0 => {
                let mut enc = [0u8; 4];
                self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
            }
            _ => self.buf.push(b'?'),
        }
    }

    /// Clear for reuse, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drop everything past `len` bytes.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Take the accumulated bytes, leaving the buffer empty.
    #[must_use]
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.buf, Vec::with_capacity(DEFAULT_CAPACITY))
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Emits cells, skipping the SGR sequence when the style hasn't changed.
///
/// Cursor placement is the caller's job; the writer only tracks style.
pub struct CellWriter {
    last_style: Option<Style>,
}

impl CellWriter {
    /// A writer that assumes nothing about the terminal's current style.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_style: None }
    }

    /// Forget the tracked style. Call at frame start and after any reset.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset_state(&mut self) {
        self.last_style = None;
    }

    /// Emit one cell's style (if changed) and character.
    ///
    /// A continuation cell reaching here has lost its owner; it is drawn as
    /// a space so its background still shows.
    pub fn put(&mut self, out: &mut OutputBuffer, cell: &Cell) {
        if self.last_style != Some(cell.style) {
            ansi::style(out, cell.style).ok();
            self.last_style = Some(cell.style);
        }
        if cell.is_continuation() {
            out.buf.push(b' ');
        } else {
            out.write_codepoint(cell.ch);
        }
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attr;
    use crate::color::CellColor;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_trait_appends() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn codepoints_encode_as_utf8() {
        let mut buf = OutputBuffer::new();
        buf.write_codepoint(u32::from('A'));
        buf.write_codepoint(u32::from('中'));
        buf.write_codepoint(u32::from('🔥'));
        assert_eq!(buf.as_bytes(), "A中🔥".as_bytes());
    }

    #[test]
    fn invalid_codepoints_become_question_marks() {
        let mut buf = OutputBuffer::new();
        buf.write_codepoint(0);
        buf.write_codepoint(0xD800);
        assert_eq!(buf.as_bytes(), b"??");
    }

    #[test]
    fn clear_keeps_capacity_and_take_empties() {
        let mut buf = OutputBuffer::new();
        write!(buf, "frame").unwrap();
        let cap = buf.buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.buf.capacity(), cap);

        write!(buf, "again").unwrap();
        assert_eq!(buf.take(), b"again");
        assert!(buf.is_empty());
    }

    #[test]
    fn same_style_emits_sgr_once() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let style = Style::new().fg(CellColor::RED);
        w.put(&mut out, &Cell::styled('a', style));
        w.put(&mut out, &Cell::styled('b', style));
        assert_eq!(out.as_bytes(), b"\x1b[0;31mab");
    }

    #[test]
    fn style_change_emits_complete_sgr() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.put(&mut out, &Cell::styled('a', Style::new().attrs(Attr::BOLD)));
        w.put(&mut out, &Cell::new('b'));
        assert_eq!(out.as_bytes(), b"\x1b[0;1ma\x1b[0mb");
    }

    #[test]
    fn reset_state_forces_reemit() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.put(&mut out, &Cell::new('a'));
        w.reset_state();
        w.put(&mut out, &Cell::new('b'));
        assert_eq!(out.as_bytes(), b"\x1b[0ma\x1b[0mb");
    }

    #[test]
    fn orphan_continuation_is_a_space() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.put(&mut out, &Cell::continuation(Style::DEFAULT));
        assert_eq!(out.as_bytes(), b"\x1b[0m ");
    }
}
