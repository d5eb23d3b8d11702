// SPDX-License-Identifier: MIT
//
// Mouse reports → mouse events.
//
// The terminal reports raw button transitions: "button 0 went down at
// (12, 4)", "a button went up at (12, 4)". Applications want clicks,
// double-clicks, drags and wheel turns. `ClickTracker` turns one into the
// other and is the only stateful part of mouse decoding. It lives inside
// the `Decoder`, one per session, so two decoders never share click state.
//
// Button code layout (same for X10 and SGR reports):
//
//   bits 0-1   button: 0 = left, 1 = middle, 2 = right, 3 = release (X10)
//   bit  2     Shift   (value 4)
//   bit  3     Alt     (value 8)
//   bit  4     Ctrl    (value 16)
//   bit  5     motion  (value 32)
//   bit  6     wheel   (value 64): bits 0-1 then mean up/down/left/right
//   bit  7     extra buttons 8-11 (value 128), not reported
//
// Click classification works on releases. A release at the same cell as
// the previous release, inside the double-click window, bumps the click
// count (1 → 2 → 3 → 1). A second release at the same cell within the
// duplicate window is an echo some terminal drivers emit and is dropped
// without touching the count. A release after a drag, or away from the
// cell where the button went down, is a plain release with no click.

use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::input::Modifiers;

// ─── Event types ─────────────────────────────────────────────────────────────

bitflags! {
    /// What a mouse event reports. A single event may carry several flags,
    /// e.g. `BUTTON1_RELEASED | BUTTON1_DOUBLE_CLICKED` or
    /// `REPORT_POSITION | BUTTON1_PRESSED` while dragging.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct MouseFlags: u32 {
        const BUTTON1_PRESSED        = 1 << 0;
        const BUTTON1_RELEASED       = 1 << 1;
        const BUTTON1_CLICKED        = 1 << 2;
        const BUTTON1_DOUBLE_CLICKED = 1 << 3;
        const BUTTON1_TRIPLE_CLICKED = 1 << 4;
        const BUTTON2_PRESSED        = 1 << 5;
        const BUTTON2_RELEASED       = 1 << 6;
        const BUTTON2_CLICKED        = 1 << 7;
        const BUTTON2_DOUBLE_CLICKED = 1 << 8;
        const BUTTON2_TRIPLE_CLICKED = 1 << 9;
        const BUTTON3_PRESSED        = 1 << 10;
        const BUTTON3_RELEASED       = 1 << 11;
        const BUTTON3_CLICKED        = 1 << 12;
        const BUTTON3_DOUBLE_CLICKED = 1 << 13;
        const BUTTON3_TRIPLE_CLICKED = 1 << 14;
        /// Pointer moved. Combined with `BUTTONn_PRESSED` while dragging.
        const REPORT_POSITION        = 1 << 15;
        const WHEELED_UP             = 1 << 16;
        const WHEELED_DOWN           = 1 << 17;
        const WHEELED_LEFT           = 1 << 18;
        const WHEELED_RIGHT          = 1 << 19;
    }
}

/// A decoded mouse event. Coordinates are 0-based cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub flags: MouseFlags,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

/// Physical mouse button. Button1 is the left button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Middle,
    Right,
}

impl Button {
    const fn from_code(code: u16) -> Option<Self> {
        match code & 3 {
            0 => Some(Self::Left),
            1 => Some(Self::Middle),
            2 => Some(Self::Right),
            _ => None,
        }
    }

    /// The wire code for this button with no modifiers.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Left => 0,
            Self::Middle => 1,
            Self::Right => 2,
        }
    }

    /// Flags for `[pressed, released, clicked, double, triple]`.
    const fn flags(self) -> [MouseFlags; 5] {
        match self {
            Self::Left => [
                MouseFlags::BUTTON1_PRESSED,
                MouseFlags::BUTTON1_RELEASED,
                MouseFlags::BUTTON1_CLICKED,
                MouseFlags::BUTTON1_DOUBLE_CLICKED,
                MouseFlags::BUTTON1_TRIPLE_CLICKED,
            ],
            Self::Middle => [
                MouseFlags::BUTTON2_PRESSED,
                MouseFlags::BUTTON2_RELEASED,
                MouseFlags::BUTTON2_CLICKED,
                MouseFlags::BUTTON2_DOUBLE_CLICKED,
                MouseFlags::BUTTON2_TRIPLE_CLICKED,
            ],
            Self::Right => [
                MouseFlags::BUTTON3_PRESSED,
                MouseFlags::BUTTON3_RELEASED,
                MouseFlags::BUTTON3_CLICKED,
                MouseFlags::BUTTON3_DOUBLE_CLICKED,
                MouseFlags::BUTTON3_TRIPLE_CLICKED,
            ],
        }
    }

    #[must_use]
    pub const fn pressed(self) -> MouseFlags {
        self.flags()[0]
    }

    #[must_use]
    pub const fn released(self) -> MouseFlags {
        self.flags()[1]
    }

    /// The click flag for a 1-based click count (clamped to 1..=3).
    #[must_use]
    pub const fn clicked(self, count: u8) -> MouseFlags {
        let idx = match count {
            0 | 1 => 2,
            2 => 3,
            _ => 4,
        };
        self.flags()[idx]
    }
}

// ─── Raw reports ─────────────────────────────────────────────────────────────

/// A mouse report as it came off the wire, coordinates already 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseReport {
    pub code: u16,
    pub x: u16,
    pub y: u16,
    /// SGR release (`m` terminator). X10 signals release in the code.
    pub release: bool,
}

const SHIFT_BIT: u16 = 4;
const ALT_BIT: u16 = 8;
const CTRL_BIT: u16 = 16;
const MOTION_BIT: u16 = 32;
const WHEEL_BIT: u16 = 64;
const EXTRA_BIT: u16 = 128;

const fn report_modifiers(code: u16) -> Modifiers {
    let mut m = Modifiers::empty();
    if code & SHIFT_BIT != 0 {
        m = m.union(Modifiers::SHIFT);
    }
    if code & ALT_BIT != 0 {
        m = m.union(Modifiers::ALT);
    }
    if code & CTRL_BIT != 0 {
        m = m.union(Modifiers::CTRL);
    }
    m
}

// ─── Click classification ───────────────────────────────────────────────────

/// Click timing thresholds.
///
/// Both are empirical; terminals and their drivers vary, so they are
/// configuration rather than constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickConfig {
    /// Releases at the same cell closer than this count as one more click.
    pub double_click: Duration,
    /// A release this close to the previous one at the same cell is an
    /// echo and is dropped.
    pub duplicate_window: Duration,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            double_click: Duration::from_millis(500),
            duplicate_window: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LastRelease {
    button: Button,
    x: u16,
    y: u16,
    at: Instant,
}

/// Turns raw press/release/motion reports into mouse events.
#[derive(Debug)]
pub struct ClickTracker {
    config: ClickConfig,
    last_release: Option<LastRelease>,
    click_count: u8,
    /// Button held down and where it went down.
    pressed: Option<(Button, u16, u16)>,
    dragging: bool,
}

impl ClickTracker {
    #[must_use]
    pub const fn new(config: ClickConfig) -> Self {
        Self {
            config,
            last_release: None,
            click_count: 0,
            pressed: None,
            dragging: false,
        }
    }

    #[must_use]
    pub const fn config(&self) -> ClickConfig {
        self.config
    }

    /// Classify one report. `None` means the report produces no event
    /// (duplicate release, unsupported button).
    pub fn classify(&mut self, report: MouseReport, now: Instant) -> Option<MouseEvent> {
        let MouseReport { code, x, y, release } = report;
        if code & EXTRA_BIT != 0 {
            tracing::trace!(code, "ignoring extended mouse button");
            return None;
        }
        let modifiers = report_modifiers(code);
        let event = |flags| Some(MouseEvent { flags, x, y, modifiers });

        if code & WHEEL_BIT != 0 {
            if release {
                return None;
            }
            let ctrl = code & CTRL_BIT != 0;
            let flags = match (code & 3, ctrl) {
                (0, false) => MouseFlags::WHEELED_UP,
                (1, false) => MouseFlags::WHEELED_DOWN,
                (0, true) | (2, _) => MouseFlags::WHEELED_LEFT,
                _ => MouseFlags::WHEELED_RIGHT,
            };
            return event(flags);
        }

        if code & MOTION_BIT != 0 {
            return match Button::from_code(code) {
                Some(button) => {
                    if self.pressed.is_some() {
                        self.dragging = true;
                    }
                    event(MouseFlags::REPORT_POSITION | button.pressed())
                }
                None => event(MouseFlags::REPORT_POSITION),
            };
        }

        if release {
            let button = Button::from_code(code).unwrap_or(Button::Left);
            return self.release(button, x, y, now).and_then(event);
        }

        match Button::from_code(code) {
            Some(button) => {
                self.pressed = Some((button, x, y));
                self.dragging = false;
                event(button.pressed())
            }
            // X10 release: the code doesn't say which button.
            None => {
                let button = self.pressed.map_or(Button::Left, |(b, _, _)| b);
                self.release(button, x, y, now).and_then(event)
            }
        }
    }

    fn release(&mut self, button: Button, x: u16, y: u16, now: Instant) -> Option<MouseFlags> {
        let repeat = self.last_release.filter(|last| {
            last.button == button && last.x == x && last.y == y
        });

        if let Some(last) = repeat {
            if now.saturating_duration_since(last.at) < self.config.duplicate_window {
                tracing::trace!(x, y, "dropping duplicate mouse release");
                return None;
            }
        }

        let pressed = self.pressed.take();
        let dragged = std::mem::take(&mut self.dragging);
        let moved = pressed.is_some_and(|(b, px, py)| b != button || px != x || py != y);

        self.last_release = Some(LastRelease { button, x, y, at: now });

        if dragged || moved {
            self.click_count = 0;
            return Some(button.released());
        }

        let in_window = repeat.is_some_and(|last| {
            now.saturating_duration_since(last.at) <= self.config.double_click
        });
        self.click_count = if in_window && (1..3).contains(&self.click_count) {
            self.click_count + 1
        } else {
            1
        };

        Some(button.released() | button.clicked(self.click_count))
    }
}

impl Default for ClickTracker {
    fn default() -> Self {
        Self::new(ClickConfig::default())
    }
}

// ─── Encoding ────────────────────────────────────────────────────────────────

/// The button code for `button` with `modifiers`, optionally as motion.
#[must_use]
pub const fn button_code(button: Button, modifiers: Modifiers, motion: bool) -> u16 {
    let mut code = button.code();
    if modifiers.contains(Modifiers::SHIFT) {
        code |= SHIFT_BIT;
    }
    if modifiers.contains(Modifiers::ALT) {
        code |= ALT_BIT;
    }
    if modifiers.contains(Modifiers::CTRL) {
        code |= CTRL_BIT;
    }
    if motion {
        code |= MOTION_BIT;
    }
    code
}

/// Encode an SGR report: `ESC [ < code ; x ; y M|m`, 1-based on the wire.
///
/// ```
/// use wincell_term::mouse::encode_sgr_mouse;
///
/// assert_eq!(encode_sgr_mouse(0, 39, 11, false), b"\x1b[<0;40;12M");
/// ```
#[must_use]
pub fn encode_sgr_mouse(code: u16, x: u16, y: u16, release: bool) -> Vec<u8> {
    let end = if release { 'm' } else { 'M' };
    format!("\x1b[<{code};{};{}{end}", u32::from(x) + 1, u32::from(y) + 1).into_bytes()
}

/// Encode an X10 report: `ESC [ M` plus three bytes, each offset by 32.
///
/// Coordinates saturate at the largest value a byte can carry (222,
/// 0-based). Release is signalled with button code 3.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_x10_mouse(code: u16, x: u16, y: u16) -> Vec<u8> {
    let byte = |v: u16| (v.min(255 - 32) + 32) as u8;
    let coord = |v: u16| (v.saturating_add(1).min(255 - 32) + 32) as u8;
    vec![0x1b, b'[', b'M', byte(code), coord(x), coord(y)]
}

// ─── Tests ───────────────────────────────────────────────────────────────────
