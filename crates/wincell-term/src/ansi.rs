// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit. The diff renderer and the session
// lifecycle decide *when*; this module only knows the byte-level encoding.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal (ANSI standard uses 1-based coordinates).

use std::io::{self, Write};

use crate::cell::{Attr, Style, UnderlineStyle};
use crate::color::CellColor;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using CUP (Cursor Position).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Move the cursor `n` columns right (CUF).
///
/// A single column uses the parameterless `ESC [ C` form. `n == 0` writes
/// nothing, since CUF treats a zero parameter as one.
#[inline]
pub fn cursor_forward(w: &mut impl Write, n: u16) -> io::Result<()> {
    match n {
        0 => Ok(()),
        1 => w.write_all(b"\x1b[C"),
        _ => write!(w, "\x1b[{n}C"),
    }
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Soft terminal reset (DECSTR).
///
/// Resets modes and attributes without clearing the screen or the
/// scrollback, unlike RIS (`ESC c`).
#[inline]
pub fn soft_reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[!p")
}

/// Disable line autowrap (DECAWM reset).
///
/// Writing the bottom-right cell would otherwise scroll the screen.
#[inline]
pub fn autowrap_off(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?7l")
}

/// Re-enable line autowrap (DECAWM set).
#[inline]
pub fn autowrap_on(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?7h")
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Emit a complete style as one SGR sequence.
///
/// The sequence always starts with `0`, so it overrides whatever the
/// terminal had active: `ESC [ 0 ; attrs ; underline ; fg ; bg m`. Default
/// colors are left out (the leading `0` already selected them).
///
/// ```
/// use wincell_term::ansi;
/// use wincell_term::cell::{Attr, Style};
/// use wincell_term::color::CellColor;
///
/// let mut out = Vec::new();
/// ansi::style(&mut out, Style::new().fg(CellColor::RED).attrs(Attr::BOLD)).unwrap();
/// assert_eq!(out, b"\x1b[0;1;31m");
/// ```
pub fn style(w: &mut impl Write, style: Style) -> io::Result<()> {
    w.write_all(b"\x1b[0")?;
    attr_params(w, style.attrs)?;
    underline_param(w, style.underline)?;
    fg_param(w, style.fg)?;
    bg_param(w, style.bg)?;
    w.write_all(b"m")
}

fn attr_params(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    const CODES: [(Attr, &[u8]); 8] = [
        (Attr::BOLD, b";1"),
        (Attr::DIM, b";2"),
        (Attr::ITALIC, b";3"),
        (Attr::SLOW_BLINK, b";5"),
        (Attr::RAPID_BLINK, b";6"),
        (Attr::INVERSE, b";7"),
        (Attr::HIDDEN, b";8"),
        (Attr::STRIKETHROUGH, b";9"),
    ];
    for (flag, code) in CODES {
        if attr.contains(flag) {
            w.write_all(code)?;
        }
    }
    Ok(())
}

/// Plain underline uses the universally supported `4`; the variants use
/// the colon sub-parameter form (`4:2` … `4:5`).
fn underline_param(w: &mut impl Write, style: UnderlineStyle) -> io::Result<()> {
    match style {
        UnderlineStyle::None => Ok(()),
        UnderlineStyle::Straight => w.write_all(b";4"),
        UnderlineStyle::Double => w.write_all(b";4:2"),
        UnderlineStyle::Curly => w.write_all(b";4:3"),
        UnderlineStyle::Dotted => w.write_all(b";4:4"),
        UnderlineStyle::Dashed => w.write_all(b";4:5"),
    }
}

/// Compact codes for the 16 base colors (30–37, 90–97), `38;5;N` for the
/// rest of the palette, `38;2;R;G;B` for `TrueColor`.
fn fg_param(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => Ok(()),
        CellColor::Ansi256(idx @ 0..=7) => write!(w, ";{}", 30 + u16::from(idx)),
        CellColor::Ansi256(idx @ 8..=15) => write!(w, ";{}", 82 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, ";38;5;{idx}"),
        CellColor::Rgb(r, g, b) => write!(w, ";38;2;{r};{g};{b}"),
    }
}

fn bg_param(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => Ok(()),
        CellColor::Ansi256(idx @ 0..=7) => write!(w, ";{}", 40 + u16::from(idx)),
        CellColor::Ansi256(idx @ 8..=15) => write!(w, ";{}", 92 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, ";48;5;{idx}"),
        CellColor::Rgb(r, g, b) => write!(w, ";48;2;{r};{g};{b}"),
    }
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC Private Mode 2026).
///
/// The terminal buffers everything until [`end_sync`], so a frame is never
/// shown half-drawn. Terminals without support ignore the mode.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse Protocol ─────────────────────────────────────────────────────────

/// Mouse tracking granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    /// Report button press and release events (DEC 1000).
    Click,
    /// Also report motion while a button is held (DEC 1002).
    Drag,
    /// Report all motion, even without buttons held (DEC 1003).
    #[default]
    Motion,
}

/// Enable mouse reporting at the given granularity, always in SGR format.
///
/// Modes are issued in a fixed order: basic (1000), drag (1002), motion
/// (1003), then the SGR encoding (1006).
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h")?;
    if matches!(mode, MouseMode::Drag | MouseMode::Motion) {
        w.write_all(b"\x1b[?1002h")?;
    }
    if mode == MouseMode::Motion {
        w.write_all(b"\x1b[?1003h")?;
    }
    w.write_all(b"\x1b[?1006h")
}

/// The full mouse-disable sequence, independent of the enabled mode.
pub const DISABLE_MOUSE: &[u8] = b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l";

/// Disable all mouse tracking.
#[inline]
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(DISABLE_MOUSE)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn cursor_to_is_one_based() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
        assert_eq!(emit(|w| cursor_to(w, 10, 20)), "\x1b[21;11H");
    }

    #[test]
    fn cursor_to_does_not_overflow() {
        assert_eq!(emit(|w| cursor_to(w, u16::MAX, u16::MAX)), "\x1b[65536;65536H");
    }

    #[test]
    fn cursor_forward_shorthand() {
        assert_eq!(emit(|w| cursor_forward(w, 0)), "");
        assert_eq!(emit(|w| cursor_forward(w, 1)), "\x1b[C");
        assert_eq!(emit(|w| cursor_forward(w, 2)), "\x1b[2C");
        assert_eq!(emit(|w| cursor_forward(w, 140)), "\x1b[140C");
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
    }

    // ── Screen ──────────────────────────────────────────────────────────

    #[test]
    fn screen_sequences() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
        assert_eq!(emit(|w| reset(w)), "\x1b[0m");
        assert_eq!(emit(|w| soft_reset(w)), "\x1b[!p");
        assert_eq!(emit(|w| autowrap_off(w)), "\x1b[?7l");
        assert_eq!(emit(|w| autowrap_on(w)), "\x1b[?7h");
    }

    // ── Style ───────────────────────────────────────────────────────────

    #[test]
    fn default_style_is_plain_reset() {
        assert_eq!(emit(|w| style(w, Style::DEFAULT)), "\x1b[0m");
    }

    #[test]
    fn style_base16_colors() {
        let s = Style::new().fg(CellColor::RED).bg(CellColor::BLUE);
        assert_eq!(emit(|w| style(w, s)), "\x1b[0;31;44m");

        let s = Style::new().fg(CellColor::BRIGHT_BLACK).bg(CellColor::BRIGHT_WHITE);
        assert_eq!(emit(|w| style(w, s)), "\x1b[0;90;107m");
    }

    #[test]
    fn style_extended_colors() {
        let s = Style::new().fg(CellColor::Ansi256(208)).bg(CellColor::Rgb(1, 2, 3));
        assert_eq!(emit(|w| style(w, s)), "\x1b[0;38;5;208;48;2;1;2;3m");
    }

    #[test]
    fn style_attributes_in_code_order() {
        let s = Style::new().attrs(Attr::STRIKETHROUGH | Attr::BOLD | Attr::ITALIC);
        assert_eq!(emit(|w| style(w, s)), "\x1b[0;1;3;9m");
    }

    #[test]
    fn style_underline_variants() {
        let s = Style::new().underline(UnderlineStyle::Straight);
        assert_eq!(emit(|w| style(w, s)), "\x1b[0;4m");
        let s = Style::new().underline(UnderlineStyle::Curly);
        assert_eq!(emit(|w| style(w, s)), "\x1b[0;4:3m");
    }

    #[test]
    fn style_everything() {
        let s = Style::new()
            .fg(CellColor::Rgb(255, 128, 0))
            .bg(CellColor::BLACK)
            .attrs(Attr::BOLD | Attr::INVERSE)
            .underline(UnderlineStyle::Double);
        assert_eq!(emit(|w| style(w, s)), "\x1b[0;1;7;4:2;38;2;255;128;0;40m");
    }

    // ── Modes ───────────────────────────────────────────────────────────

    #[test]
    fn sync_markers() {
        assert_eq!(emit(|w| begin_sync(w)), "\x1b[?2026h");
        assert_eq!(emit(|w| end_sync(w)), "\x1b[?2026l");
    }

    #[test]
    fn alt_screen() {
        assert_eq!(emit(|w| enter_alt_screen(w)), "\x1b[?1049h");
        assert_eq!(emit(|w| exit_alt_screen(w)), "\x1b[?1049l");
    }

    #[test]
    fn enable_mouse_click_mode() {
        assert_eq!(emit(|w| enable_mouse(w, MouseMode::Click)), "\x1b[?1000h\x1b[?1006h");
    }

    #[test]
    fn enable_mouse_drag_mode() {
        assert_eq!(
            emit(|w| enable_mouse(w, MouseMode::Drag)),
            "\x1b[?1000h\x1b[?1002h\x1b[?1006h"
        );
    }

    #[test]
    fn enable_mouse_motion_mode_is_ordered() {
        assert_eq!(
            emit(|w| enable_mouse(w, MouseMode::Motion)),
            "\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1006h"
        );
    }

    #[test]
    fn disable_mouse_all_modes() {
        assert_eq!(
            emit(|w| disable_mouse(w)),
            "\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l"
        );
    }
}
