// SPDX-License-Identifier: MIT
//
// wincell: a small desktop of draggable windows on the terminal.
//
// This binary wires the two crates together:
//
//   wincell-term → session, screen (diff renderer), input decoding
//   wincell-desk → window descriptors and the occlusion compositor
//
// Each frame:
//
//   events (input thread, resize poller) → Desktop::handle
//   Desktop::frame → compositor paints dirty windows → screen.render()
//
// Mouse: press a window to focus and raise it, drag its title bar to move
// it, click/double-click/triple-click to see the classification. Quit with
// q, Ctrl+Q or Ctrl+C.
//
// Logs go to a file (the terminal is in raw mode): WINCELL_LOG sets the
// filter, WINCELL_LOG_FILE the path (default wincell.log).

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wincell_desk::{
    Canvas, Compositor, DesktopConfig, WindowDescriptor, WindowId, WindowPainter, window_at,
};
use wincell_term::backend::Size;
use wincell_term::cell::{Attr, Style};
use wincell_term::color::CellColor;
use wincell_term::console::Console;
use wincell_term::grid::Rect;
use wincell_term::input::{Event, KeyCode, KeyEvent, Modifiers};
use wincell_term::mouse::{MouseEvent, MouseFlags};
use wincell_term::session::SessionConfig;
use wincell_term::styled;

/// Frame interval (~60 fps).
const FRAME: Duration = Duration::from_millis(16);

// ─── Logging ─────────────────────────────────────────────────────────────────

fn init_logging() {
    let path = env::var_os("WINCELL_LOG_FILE").map_or_else(|| PathBuf::from("wincell.log"), PathBuf::from);
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("WINCELL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

// ─── Windows ─────────────────────────────────────────────────────────────────

struct DemoWindow {
    desc: WindowDescriptor,
    title: &'static str,
    accent: CellColor,
    last_click: &'static str,
}

/// A title-bar drag in progress: the grab offset inside the window.
#[derive(Clone, Copy)]
struct Drag {
    id: WindowId,
    dx: i32,
    dy: i32,
}

/// Paints window frames and bodies.
struct Painter<'a> {
    windows: &'a [DemoWindow],
    active: Option<WindowId>,
}

impl WindowPainter for Painter<'_> {
    fn paint(&mut self, window: &WindowDescriptor, canvas: &mut Canvas<'_>) {
        let Some(demo) = self.windows.iter().find(|w| w.desc.id == window.id) else {
            return;
        };
        let focused = self.active == Some(window.id);
        let body = Style::new().bg(CellColor::Ansi256(236)).fg(CellColor::BRIGHT_WHITE);
        let border = if focused {
            body.fg(demo.accent).attrs(Attr::BOLD)
        } else {
            body.fg(CellColor::BRIGHT_BLACK)
        };

        canvas.fill(' ', body);
        let (w, h) = (i32::from(canvas.width()), i32::from(canvas.height()));
        let inner = usize::from(canvas.width().saturating_sub(2));

        let top = format!("┌{}┐", "─".repeat(inner));
        let bottom = format!("└{}┘", "─".repeat(inner));
        canvas.write(0, 0, &styled::paint(border, &top));
        canvas.write(0, h - 1, &styled::paint(border, &bottom));
        for y in 1..h - 1 {
            canvas.write(0, y, &styled::paint(border, "│"));
            canvas.write(w - 1, y, &styled::paint(border, "│"));
        }

        let title = format!(" {} ", demo.title);
        canvas.write(2, 0, &styled::paint(border.attrs(Attr::BOLD | Attr::INVERSE), &title));

        let lines = [
            format!("z-index {}", window.z_index),
            format!("at {},{}", window.left, window.top),
            format!("last: {}", demo.last_click),
        ];
        for (y, line) in (1..h - 1).zip(lines.iter()) {
            canvas.write(2, y, &styled::paint(body, line));
        }
    }
}

// ─── Desktop ─────────────────────────────────────────────────────────────────

struct Desktop {
    windows: Vec<DemoWindow>,
    compositor: Compositor,
    active: Option<WindowId>,
    drag: Option<Drag>,
    next_z: i32,
}

enum Flow {
    Continue,
    Quit,
}

impl Desktop {
    fn new(size: Size) -> Self {
        let window = |id, left, top, title, accent| DemoWindow {
            desc: WindowDescriptor::new(id, left, top, 30, 8).z(i32::try_from(id).unwrap_or(0)),
            title,
            accent,
            last_click: "-",
        };
        let mut pinned = window(4, 50, 1, "pinned", CellColor::YELLOW);
        pinned.desc = pinned.desc.on_top(true);
        pinned.desc.width = 20;
        pinned.desc.height = 5;

        let mut compositor = Compositor::new(DesktopConfig {
            background: Style::new().bg(CellColor::Ansi256(24)).fg(CellColor::Ansi256(31)),
            fill: '░',
        });
        compositor.schedule_clear(screen_rect(size));

        Self {
            windows: vec![
                window(1, 2, 2, "one", CellColor::CYAN),
                window(2, 14, 6, "two", CellColor::GREEN),
                window(3, 28, 10, "three", CellColor::MAGENTA),
                pinned,
            ],
            compositor,
            active: Some(WindowId(3)),
            drag: None,
            next_z: 4,
        }
    }

    fn descriptors(&self) -> Vec<WindowDescriptor> {
        self.windows.iter().map(|w| w.desc).collect()
    }

    fn get_mut(&mut self, id: WindowId) -> Option<&mut DemoWindow> {
        self.windows.iter_mut().find(|w| w.desc.id == id)
    }

    fn mark_all_dirty(&mut self) {
        for w in &mut self.windows {
            w.desc.dirty = true;
        }
    }

    fn focus(&mut self, id: WindowId) {
        if let Some(prev) = self.active.and_then(|a| self.get_mut(a)) {
            prev.desc.dirty = true;
        }
        self.next_z += 1;
        let z = self.next_z;
        if let Some(w) = self.get_mut(id) {
            if !w.desc.always_on_top {
                w.desc.z_index = z;
            }
            w.desc.dirty = true;
        }
        self.active = Some(id);
    }

    fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Key(key) if is_quit(key) => return Flow::Quit,
            Event::Key(_) => {}
            Event::Mouse(mouse) => self.on_mouse(mouse),
            Event::Resize(size) => {
                tracing::info!(cols = size.cols, rows = size.rows, "desktop resized");
                self.compositor.schedule_clear(screen_rect(size));
                self.mark_all_dirty();
            }
        }
        Flow::Continue
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let (x, y) = (i32::from(mouse.x), i32::from(mouse.y));
        let flags = mouse.flags;

        if flags.contains(MouseFlags::REPORT_POSITION | MouseFlags::BUTTON1_PRESSED) {
            if let Some(drag) = self.drag {
                self.move_window(drag, x, y);
            }
            return;
        }

        if flags.contains(MouseFlags::BUTTON1_PRESSED) {
            let descriptors = self.descriptors();
            if let Some(id) = window_at(&descriptors, x, y) {
                self.focus(id);
                let origin = self
                    .windows
                    .iter()
                    .find(|w| w.desc.id == id)
                    .map(|w| (w.desc.left, w.desc.top));
                if let Some((left, top)) = origin.filter(|&(_, top)| top == y) {
                    self.drag = Some(Drag {
                        id,
                        dx: x - left,
                        dy: y - top,
                    });
                }
            }
            return;
        }

        if flags.contains(MouseFlags::BUTTON1_RELEASED) {
            self.drag = None;
            let label = if flags.contains(MouseFlags::BUTTON1_TRIPLE_CLICKED) {
                "triple click"
            } else if flags.contains(MouseFlags::BUTTON1_DOUBLE_CLICKED) {
                "double click"
            } else if flags.contains(MouseFlags::BUTTON1_CLICKED) {
                "click"
            } else {
                "release"
            };
            let descriptors = self.descriptors();
            if let Some(w) = window_at(&descriptors, x, y).and_then(|id| self.get_mut(id)) {
                w.last_click = label;
                w.desc.dirty = true;
            }
        }
    }

    fn move_window(&mut self, drag: Drag, x: i32, y: i32) {
        let Some(w) = self.get_mut(drag.id) else {
            return;
        };
        let (left, top) = (x - drag.dx, y - drag.dy);
        if (left, top) == (w.desc.left, w.desc.top) {
            return;
        }
        let old = w.desc.bounds();
        w.desc.left = left;
        w.desc.top = top;
        w.desc.dirty = true;
        if let Some(old) = old {
            self.compositor.schedule_clear(old);
        }
    }

    fn needs_frame(&self) -> bool {
        !self.compositor.pending_clears().is_empty() || self.windows.iter().any(|w| w.desc.dirty)
    }

    /// Compose dirty windows into the screen and flush one frame.
    fn frame(&mut self, console: &Console) -> wincell_term::Result<()> {
        if !self.needs_frame() {
            return Ok(());
        }
        let descriptors = self.descriptors();
        let mut painter = Painter {
            windows: &self.windows,
            active: self.active,
        };
        let report = self
            .compositor
            .compose_into(console.screen(), &descriptors, self.active, &mut painter);
        for w in &mut self.windows {
            w.desc.dirty = false;
        }
        let stats = console.render()?;
        tracing::debug!(
            painted = report.painted.len(),
            covered = report.covered.len(),
            cells = stats.cells_rendered,
            bytes = stats.bytes_written,
            "frame"
        );
        Ok(())
    }
}

fn screen_rect(size: Size) -> Rect {
    Rect::new(0, 0, size.cols, size.rows)
}

fn is_quit(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') if key.modifiers.is_empty() => true,
        KeyCode::Char('q' | 'c') => key.modifiers == Modifiers::CTRL,
        _ => false,
    }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn run(console: &mut Console) -> wincell_term::Result<()> {
    let events = console.events();
    console.start()?;
    let mut desktop = Desktop::new(console.size());

    loop {
        desktop.frame(console)?;
        match events.recv_timeout(FRAME) {
            Ok(event) => {
                if matches!(desktop.handle(event), Flow::Quit) {
                    break;
                }
                // Drain whatever else arrived before painting.
                for event in events.try_iter() {
                    if matches!(desktop.handle(event), Flow::Quit) {
                        return console.stop();
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    console.stop()
}

fn main() {
    init_logging();

    let mut console = Console::open(SessionConfig::default()).unwrap_or_else(|e| {
        eprintln!("wincell: failed to initialize terminal: {e}");
        process::exit(1);
    });

    if let Err(e) = run(&mut console) {
        let _ = console.stop();
        eprintln!("wincell: {e}");
        process::exit(1);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
