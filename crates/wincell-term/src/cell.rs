// SPDX-License-Identifier: MIT
//
// Cell: the atomic unit of terminal rendering.
//
// Every character position on screen is a Cell: a Unicode codepoint, a
// Style, and a dirty flag. The style is always a *complete* description of
// how the cell looks (colors, attributes, underline), never a delta against
// the cell to its left. That is what lets the diff renderer compare a
// pending cell against the shown cell with a plain equality test.
//
// Size: 16 bytes per cell. A 200×50 terminal is 10,000 cells, 160 KB per
// grid, and the shown/pending pair doubles that. No concern.
//
// Wide characters (CJK, some emoji) occupy two columns. The first cell
// holds the codepoint; the second is a continuation cell (ch = 0). The
// renderer skips continuation cells after emitting their owner.

use crate::color::CellColor;

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR (Select Graphic Rendition) parameters:
    ///
    /// ```
    /// use wincell_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::ITALIC;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::DIM));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1: increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2: decreased intensity (faint).
        const DIM           = 1 << 1;
        /// SGR 3: italic.
        const ITALIC        = 1 << 2;
        /// SGR 5: slow blink.
        const SLOW_BLINK    = 1 << 3;
        /// SGR 6: rapid blink. Rarely supported.
        const RAPID_BLINK   = 1 << 4;
        /// SGR 7: swap foreground and background.
        const INVERSE       = 1 << 5;
        /// SGR 8: invisible text.
        const HIDDEN        = 1 << 6;
        /// SGR 9: crossed-out text.
        const STRIKETHROUGH = 1 << 7;
    }
}

// ─── Underline Style ─────────────────────────────────────────────────────────

/// Underline style for a cell.
///
/// Kept apart from [`Attr`] so there is no "underlined" bit that could
/// disagree with the style. Anything other than `None` is underlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum UnderlineStyle {
    #[default]
    None = 0,
    /// SGR 4 / 4:1.
    Straight = 1,
    /// SGR 4:2 (also SGR 21 on most terminals).
    Double = 2,
    /// SGR 4:3.
    Curly = 3,
    /// SGR 4:4.
    Dotted = 4,
    /// SGR 4:5.
    Dashed = 5,
}

impl UnderlineStyle {
    /// Whether any underline is active.
    #[inline]
    #[must_use]
    pub const fn is_underlined(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Decode the colon sub-parameter of `SGR 4:n`.
    #[must_use]
    pub const fn from_sub_param(n: u16) -> Self {
        match n {
            0 => Self::None,
            2 => Self::Double,
            3 => Self::Curly,
            4 => Self::Dotted,
            5 => Self::Dashed,
            _ => Self::Straight,
        }
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// The complete visual description of a cell, minus its character.
///
/// A style is a value: two cells look the same exactly when their
/// characters and styles are equal. Styles are produced from the SGR
/// markers embedded in styled text (see [`crate::styled`]) and encoded back
/// to one complete SGR sequence by [`crate::ansi::style`].
///
/// ```
/// use wincell_term::cell::{Attr, Style};
/// use wincell_term::color::CellColor;
///
/// let title = Style::new().fg(CellColor::BRIGHT_WHITE).bg(CellColor::BLUE).attrs(Attr::BOLD);
/// assert_ne!(title, Style::DEFAULT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Foreground (text) color.
    pub fg: CellColor,
    /// Background color.
    pub bg: CellColor,
    /// Text attributes.
    pub attrs: Attr,
    /// Underline style.
    pub underline: UnderlineStyle,
}

impl Style {
    /// Terminal defaults: default colors, no attributes, no underline.
    pub const DEFAULT: Self = Self {
        fg: CellColor::Default,
        bg: CellColor::Default,
        attrs: Attr::empty(),
        underline: UnderlineStyle::None,
    };

    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    #[inline]
    #[must_use]
    pub const fn fg(self, fg: CellColor) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn bg(self, bg: CellColor) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn underline(self, underline: UnderlineStyle) -> Self {
        Self { underline, ..self }
    }

    /// Whether this is the terminal default style.
    #[inline]
    #[must_use]
    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
///
/// # Layout (16 bytes)
///
/// ```text
/// ┌──────────┬──────────────────────────────┬───────┬─────────┐
/// │ ch: u32  │ style: fg, bg, attrs, ul     │ dirty │ padding │
/// │ 4 bytes  │ 10 bytes                     │ 1     │ 1       │
/// └──────────┴──────────────────────────────┴───────┴─────────┘
/// ```
///
/// # Equality
///
/// `PartialEq` compares the character and the style only. The dirty flag
/// is bookkeeping ("written since the last flush"), not appearance, so a
/// rewritten cell that looks the same compares equal to the shown cell and
/// produces no output.
#[derive(Clone, Copy, Eq)]
pub struct Cell {
    /// Unicode codepoint to display.
    ///
    /// - `0` = continuation cell (second column of a wide character)
    /// - `b' '` (32) = empty / space (the default)
    pub ch: u32,

    /// Complete visual style.
    pub style: Style,

    /// Written since the last render pass.
    pub dirty: bool,
}

/// Continuation marker: a cell whose `ch` is 0 belongs to the preceding
/// wide character and produces no character output.
const CONTINUATION: u32 = 0;

const SPACE: u32 = b' ' as u32;

impl Cell {
    /// An empty, clean cell: space, default style.
    pub const EMPTY: Self = Self {
        ch: SPACE,
        style: Style::DEFAULT,
        dirty: false,
    };

    /// Create a clean cell with a character and default styling.
    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            style: Style::DEFAULT,
            dirty: false,
        }
    }

    /// Create a clean cell with a character and style.
    #[inline]
    #[must_use]
    pub const fn styled(ch: char, style: Style) -> Self {
        Self {
            ch: ch as u32,
            style,
            dirty: false,
        }
    }

    /// Create a continuation cell for the second column of a wide char.
    ///
    /// Continuation cells carry their owner's style so that a lone
    /// continuation (owner overwritten) still fills with the right
    /// background.
    #[inline]
    #[must_use]
    pub const fn continuation(style: Style) -> Self {
        Self {
            ch: CONTINUATION,
            style,
            dirty: false,
        }
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }

    /// Whether this cell is visually empty (space, default style).
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.ch == SPACE && self.style.is_default()
    }

    /// The codepoint as a `char`, or `None` for continuation cells and
    /// invalid scalar values.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == CONTINUATION {
            return None;
        }
        char::from_u32(self.ch)
    }

    // ─── Mutations ────────────────────────────────────────────────────────

    /// Mark this cell dirty.
    #[inline]
    #[must_use]
    pub const fn touched(self) -> Self {
        Self { dirty: true, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }
}

impl PartialEq for Cell {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ch == other.ch && self.style == other.style
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Cell({ch:?}")?;
        if self.style.fg != CellColor::Default {
            write!(f, ", fg={:?}", self.style.fg)?;
        }
        if self.style.bg != CellColor::Default {
            write!(f, ", bg={:?}", self.style.bg)?;
        }
        if !self.style.attrs.is_empty() {
            write!(f, ", {:?}", self.style.attrs)?;
        }
        if self.style.underline.is_underlined() {
            write!(f, ", {:?}", self.style.underline)?;
        }
        if self.dirty {
            write!(f, ", dirty")?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
