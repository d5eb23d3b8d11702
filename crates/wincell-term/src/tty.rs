// SPDX-License-Identifier: MIT
//
// Unix terminal backend: termios raw mode, poll(2) input, stdout output,
// and `/dev/tty` as the direct device path.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty,
// poll and read have no safe std wrappers. Each unsafe block is one call.
#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::time::Duration;

use crate::backend::{Backend, Size};
use crate::emergency;
use crate::error::{Error, Result};

/// The platform backend for this build.
///
/// # Errors
///
/// Never fails on Unix.
pub fn default_backend() -> Result<UnixBackend> {
    Ok(UnixBackend::new())
}

/// Terminal attached to the process's stdin/stdout.
pub struct UnixBackend {
    original_termios: Option<libc::termios>,
    /// Direct handle on the controlling terminal, if there is one.
    tty: Option<File>,
}

impl UnixBackend {
    #[must_use]
    pub fn new() -> Self {
        let tty = OpenOptions::new().write(true).open("/dev/tty").ok();
        Self {
            original_termios: None,
            tty,
        }
    }
}

impl Default for UnixBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether stdin is a terminal.
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

impl Backend for UnixBackend {
    fn enable_raw_mode(&mut self) -> Result<()> {
        if !is_tty() {
            return Err(Error::NotATerminal);
        }
        let fd = libc::STDIN_FILENO;

        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut termios) } != 0 {
            return Err(Error::ModeQuery(io::Error::last_os_error()));
        }
        self.original_termios = Some(termios);
        emergency::save_termios(termios);

        // cfmakeraw equivalent.
        termios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        termios.c_oflag &= !libc::OPOST;
        termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        termios.c_cflag |= libc::CS8;
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) } != 0 {
            return Err(Error::ModeSet(io::Error::last_os_error()));
        }
        tracing::debug!("raw mode enabled");
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        let Some(original) = self.original_termios else {
            return Ok(());
        };
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original) } != 0
        {
            return Err(Error::ModeRestore(io::Error::last_os_error()));
        }
        self.original_termios = None;
        emergency::clear_termios();
        tracing::debug!("raw mode disabled");
        Ok(())
    }

    fn size(&mut self) -> io::Result<Size> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let ok = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) } == 0
            || unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCGWINSZ, &raw mut ws) } == 0;
        if ok && ws.ws_col > 0 && ws.ws_row > 0 {
            Ok(Size::new(ws.ws_col, ws.ws_row))
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn poll_input(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        match unsafe { libc::poll(&raw mut pfd, 1, ms) } {
            -1 => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
            0 => Ok(false),
            _ => Ok(pfd.revents & (libc::POLLIN | libc::POLLHUP) != 0),
        }
    }

    fn read_input(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        // n >= 0 checked by try_from.
        usize::try_from(n).map_err(|_| io::Error::last_os_error())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()
    }

    fn write_direct(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.tty.as_mut() {
            Some(tty) => {
                tty.write_all(bytes)?;
                tty.flush()
            }
            None => Ok(()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
