// SPDX-License-Identifier: MIT
//
// Terminal session lifecycle: Stopped → Started → Stopped.
//
// start() takes the terminal into raw mode, switches to the alternate
// screen, turns on mouse reporting and hides the cursor, then arms the
// emergency hook so a panic or a termination signal still restores it.
//
// stop() undoes all of that. The mouse-disable sequence goes out three
// times on both the primary stream and the direct device path: some
// emulators drop the first disable while they are busy, and a terminal
// left in mouse mode fills the shell with escape garbage.

use std::time::Duration;

use crate::ansi::{self, MouseMode};
use crate::backend::Device;
use crate::emergency;
use crate::error::{Error, Result};
use crate::mouse::ClickConfig;
use crate::output::OutputBuffer;

/// How many times stop() repeats the mouse-disable sequence.
const MOUSE_DISABLE_REPEATS: usize = 3;

// ─── SessionConfig ───────────────────────────────────────────────────────────

/// Session and background-loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Render on the alternate screen (restoring the shell's screen on exit).
    pub alternate_screen: bool,
    /// Which mouse motion the terminal reports.
    pub mouse: MouseMode,
    /// Input thread idle sleep between availability checks.
    pub input_poll: Duration,
    /// Resize poller interval.
    pub resize_poll: Duration,
    /// Click and duplicate-release windows for the decoder.
    pub click: ClickConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            alternate_screen: true,
            mouse: MouseMode::Motion,
            input_poll: Duration::from_millis(10),
            resize_poll: Duration::from_millis(100),
            click: ClickConfig::default(),
        }
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Started,
}

/// Owns the terminal's mode for the duration of a run.
///
/// Dropping a started session stops it, ignoring errors.
pub struct Session {
    device: Device,
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    #[must_use]
    pub const fn new(device: Device, config: SessionConfig) -> Self {
        Self {
            device,
            config,
            state: SessionState::Stopped,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Enter raw mode and set up the screen. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if the terminal mode cannot be queried or set, or if the setup
    /// sequence cannot be written. On a write failure raw mode is undone
    /// before returning.
    pub fn start(&mut self) -> Result<()> {
        if self.state == SessionState::Started {
            return Ok(());
        }

        let mut setup = OutputBuffer::new();
        if self.config.alternate_screen {
            ansi::enter_alt_screen(&mut setup)?;
        }
        ansi::enable_mouse(&mut setup, self.config.mouse)?;
        ansi::autowrap_off(&mut setup)?;
        ansi::cursor_hide(&mut setup)?;
        ansi::clear_screen(&mut setup)?;

        {
            let mut backend = self.device.lock();
            backend.enable_raw_mode()?;
            if let Err(err) = backend.write_all(setup.as_bytes()) {
                if let Err(restore) = backend.disable_raw_mode() {
                    tracing::warn!(%restore, "could not leave raw mode after failed start");
                }
                return Err(err.into());
            }
        }

        emergency::arm();
        self.state = SessionState::Started;
        tracing::debug!(mouse = ?self.config.mouse, "session started");
        Ok(())
    }

    /// Restore the terminal. A no-op when already stopped.
    ///
    /// Every step is attempted even if an earlier one fails; the first
    /// error is returned. The session is `Stopped` afterwards either way.
    ///
    /// # Errors
    ///
    /// Returns the first write or mode-restore failure.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == SessionState::Stopped {
            return Ok(());
        }
        self.state = SessionState::Stopped;

        let teardown = teardown_sequence(self.config.alternate_screen);
        let mouse_off = ansi::DISABLE_MOUSE.repeat(MOUSE_DISABLE_REPEATS);

        let mut first_err: Option<Error> = None;
        {
            let mut backend = self.device.lock();
            if let Err(err) = backend.write_all(&teardown) {
                first_err.get_or_insert(err.into());
            }
            if let Err(err) = backend.write_direct(&mouse_off) {
                first_err.get_or_insert(err.into());
            }
            if let Err(err) = backend.disable_raw_mode() {
                first_err.get_or_insert(err);
            }
        }
        emergency::disarm();

        match first_err {
            Some(err) => {
                tracing::warn!(%err, "session stopped with errors");
                Err(err)
            }
            None => {
                tracing::debug!("session stopped");
                Ok(())
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// The bytes stop() writes to the primary stream.
#[must_use]
pub fn teardown_sequence(alternate_screen: bool) -> Vec<u8> {
    let mut out = OutputBuffer::new();
    ansi::soft_reset(&mut out).ok();
    for _ in 0..MOUSE_DISABLE_REPEATS {
        ansi::disable_mouse(&mut out).ok();
    }
    ansi::autowrap_on(&mut out).ok();
    ansi::reset(&mut out).ok();
    ansi::cursor_show(&mut out).ok();
    if alternate_screen {
        ansi::exit_alt_screen(&mut out).ok();
    }
    out.take()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
