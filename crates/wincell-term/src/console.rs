// SPDX-License-Identifier: MIT
//
// Console: wires the session, screen, input thread and resize poller
// together around one shared device.
//
// The caller owns frame pacing: paint into `screen()`, call `render()`
// when a frame is due, and drain `events()` in between. Nothing here
// runs on the caller's thread except `render()` itself.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::backend::{Backend, Device, Size};
use crate::diff::{RenderStats, Screen};
use crate::error::Result;
use crate::hub::EventHub;
use crate::input::Event;
use crate::reader::InputReader;
use crate::resize::ResizePoller;
use crate::session::{Session, SessionConfig, SessionState};

/// A running terminal: session + screen + background threads.
///
/// ```
/// use wincell_term::backend::{ScriptedBackend, Size};
/// use wincell_term::console::Console;
/// use wincell_term::session::SessionConfig;
///
/// let backend = ScriptedBackend::new(Size::new(40, 10));
/// let mut console = Console::new(backend.clone(), SessionConfig::default()).unwrap();
/// console.start().unwrap();
/// console.screen().write_content(0, 0, "ready");
/// console.render().unwrap();
/// console.stop().unwrap();
/// assert!(!backend.is_raw());
/// ```
pub struct Console {
    device: Device,
    session: Session,
    screen: Arc<Screen>,
    hub: EventHub,
    reader: Option<InputReader>,
    poller: Option<ResizePoller>,
}

impl Console {
    /// Console over the platform terminal.
    ///
    /// # Errors
    ///
    /// Fails on platforms without a backend, or if the terminal size
    /// cannot be read.
    pub fn open(config: SessionConfig) -> Result<Self> {
        #[cfg(unix)]
        {
            Self::new(crate::tty::default_backend()?, config)
        }
        #[cfg(not(unix))]
        {
            let _ = config;
            Err(crate::Error::Unsupported)
        }
    }

    /// Console over any backend. The screen starts at the backend's size.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot report its size.
    pub fn new(backend: impl Backend + 'static, config: SessionConfig) -> Result<Self> {
        let device = Device::new(backend);
        let size = device.lock().size()?;
        Ok(Self {
            session: Session::new(device.clone(), config),
            device,
            screen: Arc::new(Screen::new(size)),
            hub: EventHub::new(),
            reader: None,
            poller: None,
        })
    }

    /// Start the session and the background threads. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates session start failures; no threads are started then.
    pub fn start(&mut self) -> Result<()> {
        if self.session.state() == SessionState::Started {
            return Ok(());
        }
        self.session.start()?;
        self.screen.invalidate();

        let config = *self.session.config();
        self.reader = Some(InputReader::spawn(
            self.device.clone(),
            self.hub.clone(),
            config.click,
            config.input_poll,
        ));
        self.poller = Some(ResizePoller::spawn(
            self.device.clone(),
            Arc::clone(&self.screen),
            self.hub.clone(),
            self.screen.size(),
            config.resize_poll,
        ));
        Ok(())
    }

    /// Stop the background threads, then restore the terminal.
    ///
    /// # Errors
    ///
    /// Returns the session's restore failure.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.session.stop()
    }

    /// Subscribe to key, mouse and resize events.
    #[must_use]
    pub fn events(&self) -> Receiver<Event> {
        self.hub.subscribe()
    }

    /// The shared double-buffered grid.
    #[must_use]
    pub const fn screen(&self) -> &Arc<Screen> {
        &self.screen
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.screen.size()
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Diff and flush one frame.
    ///
    /// # Errors
    ///
    /// Returns the device's write error.
    pub fn render(&self) -> Result<RenderStats> {
        self.screen.render(&self.device)
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::input::{KeyCode, KeyEvent};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn console(size: Size) -> (Console, ScriptedBackend) {
        let backend = ScriptedBackend::new(size);
        let console = Console::new(backend.clone(), SessionConfig::default()).unwrap();
        (console, backend)
    }

    #[test]
    fn screen_starts_at_backend_size() {
        let (console, _backend) = console(Size::new(33, 7));
        assert_eq!(console.size(), Size::new(33, 7));
        assert_eq!(console.state(), SessionState::Stopped);
    }

    #[test]
    fn start_and_stop_round_trip() {
        let (mut console, backend) = console(Size::new(20, 5));
        console.start().unwrap();
        assert!(backend.is_raw());
        assert_eq!(console.state(), SessionState::Started);
        console.stop().unwrap();
        assert!(!backend.is_raw());
        assert_eq!(console.state(), SessionState::Stopped);
    }

    #[test]
    fn input_reaches_subscribers() {
        let (mut console, backend) = console(Size::new(20, 5));
        let rx = console.events();
        console.start().unwrap();
        backend.push_input(b"q");
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).ok(),
            Some(Event::Key(KeyEvent::plain(KeyCode::Char('q'))))
        );
        console.stop().unwrap();
    }

    #[test]
    fn resize_reaches_subscribers() {
        let (mut console, backend) = console(Size::new(20, 5));
        let rx = console.events();
        console.start().unwrap();
        backend.set_size(Size::new(30, 6));
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).ok(),
            Some(Event::Resize(Size::new(30, 6)))
        );
        assert_eq!(console.size(), Size::new(30, 6));
        console.stop().unwrap();
    }

    #[test]
    fn render_after_start_repaints_everything() {
        let (mut console, backend) = console(Size::new(4, 2));
        console.start().unwrap();
        let _ = backend.take_output();
        let stats = console.render().unwrap();
        assert_eq!(stats.cells_rendered, 8);
        assert_eq!(console.render().unwrap().bytes_written, 0);
        console.stop().unwrap();
    }
}
