// SPDX-License-Identifier: MIT
//
// End-to-end properties of the terminal engine, driven through the
// public API with a scripted backend.

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use wincell_term::backend::{Device, ScriptedBackend, Size};
use wincell_term::cell::{Attr, Style};
use wincell_term::color::CellColor;
use wincell_term::diff::Screen;
use wincell_term::input::{Decoder, Event, KeyCode, KeyEvent, Modifiers};
use wincell_term::mouse::{Button, ClickConfig, MouseFlags, button_code, encode_sgr_mouse};
use wincell_term::session::{Session, SessionConfig};
use wincell_term::{ansi, styled};

fn screen(cols: u16, rows: u16) -> (Screen, Device, ScriptedBackend) {
    let backend = ScriptedBackend::new(Size::new(cols, rows));
    let device = Device::new(backend.clone());
    (Screen::new(Size::new(cols, rows)), device, backend)
}

// ─── Rendering ───────────────────────────────────────────────────────────────

#[test]
fn render_is_idempotent() {
    let (screen, device, backend) = screen(30, 8);
    let bold = Style::new().attrs(Attr::BOLD).fg(CellColor::Rgb(200, 100, 50));
    screen.write_content(3, 2, &format!("plain {} tail", styled::paint(bold, "loud")));
    screen.render(&device).unwrap();
    assert!(screen.shown() == screen.pending());

    let _ = backend.take_output();
    let writes = backend.write_count();
    let stats = screen.render(&device).unwrap();
    assert_eq!(stats.bytes_written, 0);
    assert_eq!(backend.write_count(), writes);
}

#[test]
fn each_render_is_one_write() {
    let (screen, device, backend) = screen(30, 8);
    for y in 0..8 {
        screen.write_content(0, y, "row");
    }
    screen.render(&device).unwrap();
    assert_eq!(backend.write_count(), 1);

    screen.write_content(0, 0, "ROW");
    screen.write_content(0, 7, "ROW");
    screen.render(&device).unwrap();
    assert_eq!(backend.write_count(), 2);
}

#[test]
fn equal_rows_emit_nothing() {
    let (screen, device, backend) = screen(10, 5);
    screen.render(&device).unwrap();
    let _ = backend.take_output();

    screen.write_content(0, 4, "bottom");
    let stats = screen.render(&device).unwrap();
    assert_eq!(stats.rows_skipped, 4);
    let out = String::from_utf8(backend.take_output()).unwrap();
    // Only row 5 (1-based) is ever addressed.
    assert!(out.contains("\x1b[5;1H"));
    for row in 1..5 {
        assert!(!out.contains(&format!("\x1b[{row};")), "row {row} in {out:?}");
    }
}

#[test]
fn out_of_bounds_writes_are_ignored() {
    let (screen, device, backend) = screen(5, 2);
    screen.render(&device).unwrap();
    let _ = backend.take_output();

    assert_eq!(screen.write_content(0, 9, "far"), 0);
    assert_eq!(screen.write_content(0, 0, ""), 0);
    screen.write_content(99, 0, "right");
    assert_eq!(screen.render(&device).unwrap().bytes_written, 0);
}

// ─── Input ───────────────────────────────────────────────────────────────────

#[test]
fn sgr_press_round_trips() {
    let mut decoder = Decoder::default();
    let code = button_code(Button::Left, Modifiers::empty(), false);
    let events = decoder.feed(&encode_sgr_mouse(code, 40, 12, false), Instant::now());
    let [Event::Mouse(ev)] = events.as_slice() else {
        panic!("expected one mouse event, got {events:?}");
    };
    assert_eq!((ev.x, ev.y), (40, 12));
    assert_eq!(ev.flags, MouseFlags::BUTTON1_PRESSED);
}

fn click_at(decoder: &mut Decoder, at: Instant) -> Vec<Event> {
    let code = button_code(Button::Left, Modifiers::empty(), false);
    let mut events = decoder.feed(&encode_sgr_mouse(code, 5, 5, false), at);
    events.extend(decoder.feed(&encode_sgr_mouse(code, 5, 5, true), at));
    events
}

fn release_flags(events: &[Event]) -> Option<MouseFlags> {
    events.iter().find_map(|ev| match ev {
        Event::Mouse(m) if m.flags.contains(MouseFlags::BUTTON1_RELEASED) => Some(m.flags),
        _ => None,
    })
}

#[test]
fn clicks_are_disambiguated() {
    let mut decoder = Decoder::new(ClickConfig::default());
    let t0 = Instant::now();

    let expected = [
        (0, MouseFlags::BUTTON1_CLICKED),
        (100, MouseFlags::BUTTON1_DOUBLE_CLICKED),
        (200, MouseFlags::BUTTON1_TRIPLE_CLICKED),
        (800, MouseFlags::BUTTON1_CLICKED),
    ];
    for (ms, class) in expected {
        let flags = release_flags(&click_at(&mut decoder, t0 + Duration::from_millis(ms)));
        assert_eq!(flags, Some(MouseFlags::BUTTON1_RELEASED | class), "at +{ms}ms");
    }
}

#[test]
fn duplicate_release_is_discarded() {
    let mut decoder = Decoder::default();
    let t0 = Instant::now();
    let code = button_code(Button::Left, Modifiers::empty(), false);
    let release = encode_sgr_mouse(code, 5, 5, true);

    decoder.feed(&encode_sgr_mouse(code, 5, 5, false), t0);
    assert_eq!(decoder.feed(&release, t0).len(), 1);
    assert!(decoder.feed(&release, t0 + Duration::from_millis(10)).is_empty());
}

#[test]
fn lone_escape_falls_back_to_escape_key() {
    let mut decoder = Decoder::default();
    assert!(decoder.feed(b"\x1b", Instant::now()).is_empty());
    assert!(decoder.has_pending());
    assert_eq!(
        decoder.flush(),
        vec![Event::Key(KeyEvent::plain(KeyCode::Escape))]
    );
    assert!(!decoder.has_pending());
}

#[test]
fn truncated_sequence_yields_no_event() {
    let mut decoder = Decoder::default();
    assert!(decoder.feed(b"\x1b[1;", Instant::now()).is_empty());
    assert!(decoder.flush().is_empty());
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[test]
fn stop_sends_mouse_disable_three_times_on_both_paths() {
    let backend = ScriptedBackend::new(Size::new(80, 24));
    let mut session = Session::new(Device::new(backend.clone()), SessionConfig::default());
    session.start().unwrap();
    let _ = backend.take_output();
    session.stop().unwrap();

    let primary = backend.output();
    let direct = backend.direct_output();
    let count = |bytes: &[u8]| {
        bytes
            .windows(ansi::DISABLE_MOUSE.len())
            .filter(|w| *w == ansi::DISABLE_MOUSE)
            .count()
    };
    assert_eq!(count(&primary), 3);
    assert_eq!(count(&direct), 3);
    assert!(!backend.is_raw());
}
