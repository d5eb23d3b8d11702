// SPDX-License-Identifier: MIT
//
// Cell colors.
//
// A cell stores one of three color forms: the terminal's own default, an
// index into the 256-color palette, or 24-bit RGB. That is exactly the set
// SGR can express, so every color a style marker can name round-trips
// through a cell without loss, and comparing two colors is a plain integer
// compare in the diff loop.

use std::fmt;

/// Compact color for terminal cell storage.
///
/// This is what gets written into the [`Grid`](crate::grid::Grid) and
/// converted back to SGR parameters on output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellColor {
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),

    /// ANSI 256-color palette index. Indices 0–15 are the classic
    /// 16-color set and are emitted with the compact SGR 30–37 / 90–97
    /// codes.
    Ansi256(u8),

    /// Terminal default color (inherits from terminal settings).
    #[default]
    Default,
}

impl CellColor {
    pub const BLACK: Self = Self::Ansi256(0);
    pub const RED: Self = Self::Ansi256(1);
    pub const GREEN: Self = Self::Ansi256(2);
    pub const YELLOW: Self = Self::Ansi256(3);
    pub const BLUE: Self = Self::Ansi256(4);
    pub const MAGENTA: Self = Self::Ansi256(5);
    pub const CYAN: Self = Self::Ansi256(6);
    pub const WHITE: Self = Self::Ansi256(7);
    pub const BRIGHT_BLACK: Self = Self::Ansi256(8);
    pub const BRIGHT_WHITE: Self = Self::Ansi256(15);

    /// Whether this is the terminal default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// Approximate sRGB components, for palette colors via the xterm
    /// palette. Returns `None` for [`CellColor::Default`].
    #[must_use]
    pub const fn to_rgb8(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Rgb(r, g, b) => Some((r, g, b)),
            Self::Ansi256(idx) => Some(ansi256_to_rgb(idx)),
            Self::Default => None,
        }
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Ansi256(idx) => write!(f, "ansi({idx})"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl fmt::Display for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The 16 base colors as xterm renders them by default.
const BASE16: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

/// Map a 256-palette index to its xterm RGB value.
///
/// 0–15 are the base colors, 16–231 the 6×6×6 cube, 232–255 the
/// grayscale ramp.
#[must_use]
pub const fn ansi256_to_rgb(idx: u8) -> (u8, u8, u8) {
    if idx < 16 {
        return BASE16[idx as usize];
    }
    if idx >= 232 {
        let v = 8 + (idx - 232) * 10;
        return (v, v, v);
    }
    let i = idx - 16;
    (cube_level(i / 36), cube_level((i / 6) % 6), cube_level(i % 6))
}

/// Channel intensity for one axis of the 6×6×6 cube.
const fn cube_level(n: u8) -> u8 {
    if n == 0 { 0 } else { 55 + n * 40 }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
