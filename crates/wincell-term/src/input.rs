// SPDX-License-Identifier: MIT
//
// Input protocol decoder.
//
// Turns the raw byte stream from the terminal into key and mouse events:
//
// - Printable ASCII and UTF-8 characters
// - Control bytes (Ctrl+letter, Tab, Enter, Backspace)
// - CSI / SS3 sequences (arrows, navigation, F1-F12, with modifiers)
// - Alt+key (ESC followed by a key; the terminal never sends Alt itself)
// - Mouse reports, both SGR (`ESC [ < b ; x ; y M/m`) and legacy X10
//   (`ESC [ M` plus three bytes)
//
// Sequences can be split across reads, so the decoder keeps a small byte
// buffer. Bytes that might still become a sequence stay buffered until
// more input arrives or the caller decides no more is coming and calls
// `flush`, which resolves a pending lone ESC as the Escape key.
//
// Malformed or unknown sequences are dropped: they never surface as
// errors and never leak their bytes as characters.

use std::time::Instant;

use bitflags::bitflags;

use crate::backend::Size;
use crate::mouse::{ClickConfig, ClickTracker, MouseEvent, MouseReport};

// ─── Event types ─────────────────────────────────────────────────────────────

/// A decoded terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Terminal dimensions changed.
    Resize(Size),
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A key with no modifiers.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character. Ctrl+letter arrives as the lowercase letter with
    /// [`Modifiers::CTRL`].
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F12.
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Same bit layout as the xterm CSI modifier parameter, which encodes
    /// `1 + bitmask`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b001;
        const ALT   = 0b010;
        const CTRL  = 0b100;
    }
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Sequences longer than this without a terminator are garbage.
const MAX_SEQUENCE: usize = 64;

/// Streaming input decoder.
///
/// Feed raw bytes with [`feed`](Decoder::feed); when the input source has
/// been idle for a read window, call [`flush`](Decoder::flush) to resolve
/// a pending ESC.
///
/// ```
/// use std::time::Instant;
/// use wincell_term::input::{Decoder, Event, KeyCode, KeyEvent};
///
/// let mut decoder = Decoder::default();
/// assert!(decoder.feed(b"\x1b", Instant::now()).is_empty());
/// assert_eq!(decoder.flush(), vec![Event::Key(KeyEvent::plain(KeyCode::Escape))]);
/// ```
#[derive(Debug)]
pub struct Decoder {
    buf: Vec<u8>,
    clicks: ClickTracker,
}

impl Decoder {
    #[must_use]
    pub fn new(click: ClickConfig) -> Self {
        Self {
            buf: Vec::with_capacity(64),
            clicks: ClickTracker::new(click),
        }
    }

    /// Feed raw bytes and return every event they complete.
    ///
    /// `now` timestamps mouse releases for click classification.
    pub fn feed(&mut self, data: &[u8], now: Instant) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match try_parse(&self.buf[pos..]) {
                Parsed::Key(key, n) => {
                    events.push(Event::Key(key));
                    pos += n;
                }
                Parsed::Mouse(report, n) => {
                    if let Some(ev) = self.clicks.classify(report, now) {
                        events.push(Event::Mouse(ev));
                    }
                    pos += n;
                }
                Parsed::Skip(n) => {
                    tracing::trace!(bytes = ?&self.buf[pos..pos + n], "dropping unrecognized input");
                    pos += n;
                }
                Parsed::Incomplete => break,
            }
        }

        if pos > 0 {
            self.buf.drain(..pos);
        }
        events
    }

    /// Bytes are buffered waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Resolve whatever is buffered, assuming no more input is coming.
    ///
    /// - A lone ESC is the Escape key.
    /// - `ESC [` and `ESC O` with nothing after them are Alt+`[` / Alt+`O`.
    /// - Anything longer is a truncated sequence and is dropped.
    pub fn flush(&mut self) -> Vec<Event> {
        let events = match self.buf.as_slice() {
            [] => Vec::new(),
            [0x1b] => vec![Event::Key(KeyEvent::plain(KeyCode::Escape))],
            [0x1b, b @ (b'[' | b'O')] => vec![Event::Key(KeyEvent::new(
                KeyCode::Char(char::from(*b)),
                Modifiers::ALT,
            ))],
            rest => {
                tracing::trace!(bytes = ?rest, "dropping truncated sequence");
                Vec::new()
            }
        };
        self.buf.clear();
        events
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(ClickConfig::default())
    }
}

// ─── Stateless parsing ──────────────────────────────────────────────────────
//
// Every parse function reads from the start of its slice and reports what
// it found plus how many bytes that took.

enum Parsed {
    Key(KeyEvent, usize),
    Mouse(MouseReport, usize),
    /// Unusable bytes; drop this many.
    Skip(usize),
    /// Could still become a sequence; wait for more bytes.
    Incomplete,
}

fn try_parse(buf: &[u8]) -> Parsed {
    match buf[0] {
        0x1b => parse_escape(buf),
        b => match control_key(b) {
            Some(key) => Parsed::Key(key, 1),
            None => parse_char(buf, Modifiers::empty(), 0),
        },
    }
}

/// Keys for single control bytes (everything below 0x20 except ESC, and
/// DEL). `None` for printable bytes.
const fn control_key(b: u8) -> Option<KeyEvent> {
    let key = match b {
        0x09 => KeyEvent::plain(KeyCode::Tab),
        0x0d => KeyEvent::plain(KeyCode::Enter),
        0x7f => KeyEvent::plain(KeyCode::Backspace),
        0x00 => KeyEvent::new(KeyCode::Char('@'), Modifiers::CTRL),
        0x01..=0x1a => KeyEvent::new(KeyCode::Char((b - 1 + b'a') as char), Modifiers::CTRL),
        0x1c..=0x1f => KeyEvent::new(KeyCode::Char((b + 0x40) as char), Modifiers::CTRL),
        _ => return None,
    };
    Some(key)
}

/// A printable ASCII or UTF-8 character at the start of `buf`.
/// `offset` is added to the consumed count (for the Alt prefix).
fn parse_char(buf: &[u8], modifiers: Modifiers, offset: usize) -> Parsed {
    let len = utf8_char_len(buf[0]);
    if len == 0 {
        return Parsed::Skip(offset + 1);
    }
    if buf.len() < len {
        // Wait only while every byte so far could still continue the
        // character; otherwise the lead byte alone is bad.
        if buf[1..].iter().all(|&b| (0x80..=0xbf).contains(&b)) {
            return Parsed::Incomplete;
        }
        return Parsed::Skip(offset + 1);
    }
    match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
        Some(ch) => Parsed::Key(KeyEvent::new(KeyCode::Char(ch), modifiers), offset + len),
        None => Parsed::Skip(offset + 1),
    }
}

// ── Escape sequences ────────────────────────────────────────────────────────

fn parse_escape(buf: &[u8]) -> Parsed {
    if buf.len() < 2 {
        return Parsed::Incomplete;
    }

    match buf[1] {
        b'[' if buf.get(2) == Some(&b'M') => parse_x10_mouse(buf),
        b'[' | b'O' => parse_sequence(buf),
        0x1b => Parsed::Key(KeyEvent::new(KeyCode::Escape, Modifiers::ALT), 2),
        b => match control_key(b) {
            Some(key) => Parsed::Key(
                KeyEvent::new(key.code, key.modifiers | Modifiers::ALT),
                2,
            ),
            None => parse_char(&buf[1..], Modifiers::ALT, 1),
        },
    }
}

/// `ESC [` or `ESC O`, then bytes up to a terminator.
///
/// Terminators are a letter or `~`. A CR or tab inside a sequence means
/// the sequence was abandoned; the prefix is dropped and the CR or tab is
/// decoded on its own.
fn parse_sequence(buf: &[u8]) -> Parsed {
    let ss3 = buf[1] == b'O';
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'~' => break,
            b'\r' | b'\t' => return Parsed::Skip(end),
            0x20..=0x3f if end < MAX_SEQUENCE => end += 1,
            0x20..=0x3f => return Parsed::Skip(skip_runaway(buf, end)),
            _ => return Parsed::Skip(end),
        }
    }

    let body = &buf[2..end];
    let terminator = buf[end];
    let consumed = end + 1;

    if let Some(params) = body.strip_prefix(b"<") {
        return if matches!(terminator, b'M' | b'm') {
            parse_sgr_mouse(params, terminator == b'm', consumed)
        } else {
            Parsed::Skip(consumed)
        };
    }

    match lookup_key(body, terminator, ss3) {
        Some(key) => Parsed::Key(key, consumed),
        None => Parsed::Skip(consumed),
    }
}

/// Length of an overlong sequence: every parameter byte from `from` on,
/// plus its terminator if one is already here.
fn skip_runaway(buf: &[u8], from: usize) -> usize {
    let mut n = from;
    while buf.get(n).is_some_and(|b| (0x20..=0x3f).contains(b)) {
        n += 1;
    }
    if buf.get(n).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'~') {
        n += 1;
    }
    n
}

/// The fixed key table.
fn lookup_key(body: &[u8], terminator: u8, ss3: bool) -> Option<KeyEvent> {
    let params = parse_params(body);

    if terminator == b'~' {
        let modifiers = params.get(1).map_or(Modifiers::empty(), |&m| decode_modifiers(m));
        let code = match params.first().copied().unwrap_or(0) {
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            11 => KeyCode::F(1),
            12 => KeyCode::F(2),
            13 => KeyCode::F(3),
            14 => KeyCode::F(4),
            15 => KeyCode::F(5),
            17 => KeyCode::F(6),
            18 => KeyCode::F(7),
            19 => KeyCode::F(8),
            20 => KeyCode::F(9),
            21 => KeyCode::F(10),
            23 => KeyCode::F(11),
            24 => KeyCode::F(12),
            _ => return None,
        };
        return Some(KeyEvent::new(code, modifiers));
    }

    // `CSI 1 ; m X` carries the modifier second. Some terminals send SS3
    // with the modifier alone: `ESC O m X`.
    let modifier_param = if ss3 && params.len() == 1 { params.first() } else { params.get(1) };
    let modifiers = modifier_param.map_or(Modifiers::empty(), |&m| decode_modifiers(m));

    let code = match terminator {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        b'Z' => return Some(KeyEvent::new(KeyCode::Tab, modifiers | Modifiers::SHIFT)),
        _ => return None,
    };
    Some(KeyEvent::new(code, modifiers))
}

// ── Mouse ───────────────────────────────────────────────────────────────────

/// `ESC [ < b ; x ; y M|m`, with `params` the part after `<`.
fn parse_sgr_mouse(params: &[u8], release: bool, consumed: usize) -> Parsed {
    let values = parse_params(params);
    let [code, x, y] = values.as_slice() else {
        return Parsed::Skip(consumed);
    };
    Parsed::Mouse(
        MouseReport {
            code: *code,
            x: x.saturating_sub(1),
            y: y.saturating_sub(1),
            release,
        },
        consumed,
    )
}

/// `ESC [ M` then three raw bytes, each offset by 32; coordinates 1-based.
fn parse_x10_mouse(buf: &[u8]) -> Parsed {
    if buf.len() < 6 {
        return Parsed::Incomplete;
    }
    let field = |b: u8| u16::from(b.saturating_sub(32));
    Parsed::Mouse(
        MouseReport {
            code: field(buf[3]),
            x: field(buf[4]).saturating_sub(1),
            y: field(buf[5]).saturating_sub(1),
            release: false,
        },
        6,
    )
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Semicolon-separated decimal parameters. Empty parameters are 0; colon
/// sub-parameters are ignored.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|p| {
            p.iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |v, &b| v.saturating_mul(10).saturating_add(u16::from(b - b'0')))
        })
        .collect()
}

/// xterm modifier parameter: `1 + bitmask`, 3 bits wide.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    Modifiers::from_bits_truncate((param.saturating_sub(1) & 7) as u8)
}

/// Expected byte length of a UTF-8 character from its lead byte; 0 for
/// bytes that can't start one.
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => 0,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
