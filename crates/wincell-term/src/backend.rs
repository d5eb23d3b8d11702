// SPDX-License-Identifier: MIT
//
// Terminal device abstraction.
//
// Everything that touches the real terminal goes through a `Backend`: mode
// switching, size queries, input polling and reads, and output. One
// implementation per platform (`tty::UnixBackend` on Unix) plus a scripted
// one for tests, chosen once at startup instead of branching on the
// platform throughout the lifecycle code.
//
// `Device` wraps the backend in the single lock that serializes all device
// access. The input reader, the resize poller and the renderer each take
// it for the duration of their operation, so a frame write can never land
// between two halves of an escape sequence the reader is consuming.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Result;

// ─── Size ────────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Platform access to one terminal.
pub trait Backend: Send {
    /// Save the current mode flags and switch to raw input.
    ///
    /// # Errors
    ///
    /// [`Error::ModeQuery`](crate::Error::ModeQuery) or
    /// [`Error::ModeSet`](crate::Error::ModeSet); both are fatal.
    fn enable_raw_mode(&mut self) -> Result<()>;

    /// Restore the mode flags saved by [`enable_raw_mode`](Self::enable_raw_mode).
    ///
    /// # Errors
    ///
    /// [`Error::ModeRestore`](crate::Error::ModeRestore).
    fn disable_raw_mode(&mut self) -> Result<()>;

    /// Current terminal size.
    ///
    /// # Errors
    ///
    /// Fails if the size can't be queried.
    fn size(&mut self) -> io::Result<Size>;

    /// Whether input can be read without blocking, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// Fails if polling the input source fails.
    fn poll_input(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read available input. `Ok(0)` means end of input.
    ///
    /// # Errors
    ///
    /// Fails if the read fails.
    fn read_input(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write to the primary output stream and flush.
    ///
    /// # Errors
    ///
    /// Fails if the write or flush fails.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Write straight to the terminal device, bypassing the primary stream.
    ///
    /// # Errors
    ///
    /// Fails if the write fails. Backends without a separate device path
    /// write nothing and succeed.
    fn write_direct(&mut self, bytes: &[u8]) -> io::Result<()>;
}

// ─── Device ──────────────────────────────────────────────────────────────────

/// Shared, lock-guarded handle to the terminal backend.
///
/// Clones share the same backend and the same lock.
#[derive(Clone)]
pub struct Device {
    inner: Arc<Mutex<Box<dyn Backend>>>,
}

impl Device {
    #[must_use]
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(backend))),
        }
    }

    /// Take the device lock.
    ///
    /// A thread that panicked while holding the lock leaves the backend
    /// itself intact, so a poisoned lock is recovered rather than
    /// propagated: terminal restoration must still be possible.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Backend>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Device")
    }
}

// ─── ScriptedBackend ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct Script {
    size: Size,
    input: VecDeque<Vec<u8>>,
    output: Vec<u8>,
    direct: Vec<u8>,
    writes: usize,
    raw: bool,
    fail_raw_mode: bool,
}

/// A headless backend: output is recorded, input and size are scripted.
///
/// Clones share state, so a test keeps one clone to drive and inspect
/// while the other lives inside a [`Device`].
///
/// ```
/// use wincell_term::backend::{Device, ScriptedBackend, Size};
///
/// let script = ScriptedBackend::new(Size::new(80, 24));
/// let device = Device::new(script.clone());
/// device.lock().write_all(b"hi").unwrap();
/// assert_eq!(script.output(), b"hi");
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                size,
                input: VecDeque::new(),
                output: Vec::new(),
                direct: Vec::new(),
                writes: 0,
                raw: false,
                fail_raw_mode: false,
            })),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one chunk of input, delivered by a single read.
    pub fn push_input(&self, bytes: &[u8]) {
        self.script().input.push_back(bytes.to_vec());
    }

    pub fn set_size(&self, size: Size) {
        self.script().size = size;
    }

    /// Make the next `enable_raw_mode` fail.
    pub fn fail_raw_mode(&self, fail: bool) {
        self.script().fail_raw_mode = fail;
    }

    /// Everything written to the primary stream so far.
    #[must_use]
    pub fn output(&self) -> Vec<u8> {
        self.script().output.clone()
    }

    /// Everything written so far, clearing the record.
    #[must_use]
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.script().output)
    }

    /// Everything written to the direct device path.
    #[must_use]
    pub fn direct_output(&self) -> Vec<u8> {
        self.script().direct.clone()
    }

    /// Number of `write_all` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.script().writes
    }

    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.script().raw
    }

    /// Input chunks not yet read.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.script().input.len()
    }
}

impl Backend for ScriptedBackend {
    fn enable_raw_mode(&mut self) -> Result<()> {
        let mut s = self.script();
        if s.fail_raw_mode {
            return Err(crate::Error::ModeSet(io::Error::other("scripted failure")));
        }
        s.raw = true;
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        self.script().raw = false;
        Ok(())
    }

    fn size(&mut self) -> io::Result<Size> {
        Ok(self.script().size)
    }

    fn poll_input(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(!self.script().input.is_empty())
    }

    fn read_input(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut s = self.script();
        let Some(mut chunk) = s.input.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            s.input.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut s = self.script();
        s.output.extend_from_slice(bytes);
        s.writes += 1;
        Ok(())
    }

    fn write_direct(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.script().direct.extend_from_slice(bytes);
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
