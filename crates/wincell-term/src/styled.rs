// SPDX-License-Identifier: MIT
//
// Styled text: literal characters interleaved with SGR style markers.
//
// This is the content-push format: callers hand `write_content` a string
// like "\x1b[0;1;37;44m Title \x1b[0m body" and the grid stores each
// visible character with the style that was active when it was reached.
// Markers are opaque to callers: build them with `marker` / `paint` and
// concatenate.
//
// Markers follow ordinary SGR semantics and apply on top of the active
// style. `marker` always emits a leading `0`, so every marker it produces
// is a complete override, and a string built from them never depends on
// what came before it.
//
// Anything else that looks like an escape sequence (cursor movement, OSC
// titles) is swallowed. Control characters are dropped. Neither may reach
// a cell: a stray ESC in the grid would corrupt the output stream.

use std::iter::Peekable;
use std::str::Chars;

use crate::ansi;
use crate::cell::{Attr, Style, UnderlineStyle};
use crate::color::CellColor;

// ─── Building ────────────────────────────────────────────────────────────────

/// The marker that switches to `style`.
#[must_use]
pub fn marker(style: Style) -> String {
    let mut out = Vec::with_capacity(24);
    // Writing to a Vec cannot fail.
    let _ = ansi::style(&mut out, style);
    String::from_utf8(out).unwrap_or_default()
}

/// `text` wrapped in `style`, followed by a reset marker.
///
/// ```
/// use wincell_term::cell::Style;
/// use wincell_term::color::CellColor;
/// use wincell_term::styled;
///
/// let s = styled::paint(Style::new().fg(CellColor::RED), "hi");
/// assert_eq!(s, "\x1b[0;31mhi\x1b[0m");
/// ```
#[must_use]
pub fn paint(style: Style, text: &str) -> String {
    let mut s = marker(style);
    s.push_str(text);
    s.push_str("\x1b[0m");
    s
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Iterate the visible characters of styled text with their styles.
#[must_use]
pub fn chars(text: &str) -> StyledChars<'_> {
    StyledChars {
        chars: text.chars().peekable(),
        style: Style::DEFAULT,
    }
}

/// Iterator returned by [`chars`].
pub struct StyledChars<'a> {
    chars: Peekable<Chars<'a>>,
    style: Style,
}

impl StyledChars<'_> {
    /// The style active at the current position.
    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    /// Consume an escape sequence whose ESC has already been read.
    fn escape(&mut self) {
        match self.chars.next() {
            Some('[') => self.csi(),
            Some(']') => self.osc(),
            _ => {}
        }
    }

    /// CSI: parameter bytes, intermediates, one final byte.
    fn csi(&mut self) {
        let mut params = String::new();
        while let Some(&c) = self.chars.peek() {
            self.chars.next();
            match c {
                '\x30'..='\x3f' => params.push(c),
                '\x20'..='\x2f' => {}
                '\x40'..='\x7e' => {
                    if c == 'm' {
                        apply_sgr(&mut self.style, &params);
                    }
                    return;
                }
                // Malformed: abandon the sequence.
                _ => return,
            }
        }
    }

    /// OSC: everything up to BEL or ST.
    fn osc(&mut self) {
        while let Some(c) = self.chars.next() {
            match c {
                '\x07' => return,
                '\x1b' => {
                    if self.chars.peek() == Some(&'\\') {
                        self.chars.next();
                    }
                    return;
                }
                _ => {}
            }
        }
    }
}

impl Iterator for StyledChars<'_> {
    type Item = (char, Style);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let c = self.chars.next()?;
            if c == '\x1b' {
                self.escape();
            } else if !c.is_control() {
                return Some((c, self.style));
            }
        }
    }
}

// ─── SGR ─────────────────────────────────────────────────────────────────────

/// Apply an SGR parameter string (the part between `ESC [` and `m`).
fn apply_sgr(style: &mut Style, params: &str) {
    // `ESC [ m` is SGR 0.
    if params.is_empty() {
        *style = Style::DEFAULT;
        return;
    }

    let mut it = params.split(';').peekable();
    while let Some(param) = it.next() {
        if let Some((head, sub)) = param.split_once(':') {
            if head == "4" {
                let n = sub.split(':').next().and_then(|s| s.parse().ok()).unwrap_or(1);
                style.underline = UnderlineStyle::from_sub_param(n);
            }
            continue;
        }

        let code: u16 = if param.is_empty() { 0 } else { param.parse().unwrap_or(u16::MAX) };
        match code {
            0 => *style = Style::DEFAULT,
            1 => style.attrs |= Attr::BOLD,
            2 => style.attrs |= Attr::DIM,
            3 => style.attrs |= Attr::ITALIC,
            4 => style.underline = UnderlineStyle::Straight,
            5 => style.attrs |= Attr::SLOW_BLINK,
            6 => style.attrs |= Attr::RAPID_BLINK,
            7 => style.attrs |= Attr::INVERSE,
            8 => style.attrs |= Attr::HIDDEN,
            9 => style.attrs |= Attr::STRIKETHROUGH,
            21 => style.underline = UnderlineStyle::Double,
            22 => style.attrs -= Attr::BOLD | Attr::DIM,
            23 => style.attrs -= Attr::ITALIC,
            24 => style.underline = UnderlineStyle::None,
            25 => style.attrs -= Attr::SLOW_BLINK | Attr::RAPID_BLINK,
            27 => style.attrs -= Attr::INVERSE,
            28 => style.attrs -= Attr::HIDDEN,
            29 => style.attrs -= Attr::STRIKETHROUGH,
            30..=37 => style.fg = base16(code - 30),
            38 => {
                if let Some(color) = extended_color(&mut it) {
                    style.fg = color;
                }
            }
            39 => style.fg = CellColor::Default,
            40..=47 => style.bg = base16(code - 40),
            48 => {
                if let Some(color) = extended_color(&mut it) {
                    style.bg = color;
                }
            }
            49 => style.bg = CellColor::Default,
            90..=97 => style.fg = base16(code - 82),
            100..=107 => style.bg = base16(code - 92),
            _ => {}
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn base16(idx: u16) -> CellColor {
    // Callers pass 0..=15.
    CellColor::Ansi256(idx as u8)
}

/// Parse the tail of `38;…` / `48;…`: `5;N` or `2;R;G;B`.
fn extended_color<'a>(it: &mut impl Iterator<Item = &'a str>) -> Option<CellColor> {
    let mut component = || it.next().and_then(|s| s.parse::<u8>().ok());
    match component() {
        Some(5) => component().map(CellColor::Ansi256),
        Some(2) => {
            let r = component()?;
            let g = component()?;
            let b = component()?;
            Some(CellColor::Rgb(r, g, b))
        }
        _ => None,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect(text: &str) -> Vec<(char, Style)> {
        chars(text).collect()
    }

    fn plain(text: &str) -> String {
        chars(text).map(|(c, _)| c).collect()
    }

    #[test]
    fn plain_text_has_default_style() {
        assert_eq!(
            collect("ab"),
            vec![('a', Style::DEFAULT), ('b', Style::DEFAULT)]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(collect("").is_empty());
        assert!(collect("\x1b[31m").is_empty());
    }

    #[test]
    fn marker_applies_to_following_chars() {
        let red = Style::new().fg(CellColor::RED);
        let text = format!("a{}b", marker(red));
        assert_eq!(collect(&text), vec![('a', Style::DEFAULT), ('b', red)]);
    }

    #[test]
    fn every_marker_is_a_complete_override() {
        let bold = Style::new().attrs(Attr::BOLD);
        let blue = Style::new().fg(CellColor::BLUE);
        let text = format!("{}x{}y", marker(bold), marker(blue));
        assert_eq!(collect(&text), vec![('x', bold), ('y', blue)]);
    }

    #[test]
    fn raw_sgr_is_cumulative() {
        let styles: Vec<Style> = chars("\x1b[1mA\x1b[31mB\x1b[22mC").map(|(_, s)| s).collect();
        assert_eq!(styles[0], Style::new().attrs(Attr::BOLD));
        assert_eq!(styles[1], Style::new().attrs(Attr::BOLD).fg(CellColor::RED));
        assert_eq!(styles[2], Style::new().fg(CellColor::RED));
    }

    #[test]
    fn marker_round_trips_every_style_dimension() {
        let styles = [
            Style::DEFAULT,
            Style::new().fg(CellColor::Ansi256(9)).bg(CellColor::Ansi256(3)),
            Style::new().fg(CellColor::Ansi256(200)).bg(CellColor::Rgb(10, 20, 30)),
            Style::new().attrs(Attr::all()),
            Style::new().underline(UnderlineStyle::Dashed).fg(CellColor::Rgb(0, 0, 0)),
            Style::new().underline(UnderlineStyle::Straight),
        ];
        for style in styles {
            let text = paint(style, "x");
            assert_eq!(collect(&text), vec![('x', style)], "style {style:?}");
        }
    }

    #[test]
    fn bare_reset_and_empty_params() {
        let text = "\x1b[1;31ma\x1b[mb\x1b[1;;31mc";
        let styles: Vec<Style> = chars(text).map(|(_, s)| s).collect();
        assert_eq!(styles[1], Style::DEFAULT);
        // The empty parameter is a 0, resetting the bold before red applies.
        assert_eq!(styles[2], Style::new().fg(CellColor::RED));
    }

    #[test]
    fn non_sgr_sequences_are_swallowed() {
        assert_eq!(plain("a\x1b[2Jb\x1b[10;5Hc"), "abc");
        assert_eq!(plain("\x1b]0;title\x07x"), "x");
        assert_eq!(plain("\x1b]0;title\x1b\\y"), "y");
        assert_eq!(plain("\x1b7z"), "z");
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(plain("a\tb\nc\rd\x07e\x7f"), "abcde");
    }

    #[test]
    fn truncated_escape_yields_no_garbage() {
        assert_eq!(plain("ab\x1b[31"), "ab");
        assert_eq!(plain("ab\x1b"), "ab");
    }

    #[test]
    fn malformed_extended_color_is_ignored() {
        let styles: Vec<Style> = chars("\x1b[38;5mA\x1b[48;2;1;2mB").map(|(_, s)| s).collect();
        assert_eq!(styles, vec![Style::DEFAULT, Style::DEFAULT]);
    }

    #[test]
    fn unicode_passes_through() {
        assert_eq!(plain("日本\x1b[1m語"), "日本語");
    }

    #[test]
    fn paint_appends_reset() {
        let text = format!("{}after", paint(Style::new().fg(CellColor::GREEN), "in"));
        let last = chars(&text).last().unwrap();
        assert_eq!(last, ('r', Style::DEFAULT));
    }
}
