// SPDX-License-Identifier: MIT
//
// Error type for the terminal engine.
//
// Only device-facing paths are fallible. Grid writes, input decoding, and
// compositing never fail: out-of-range writes are clipped and malformed
// input is dropped.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading the current terminal mode flags failed at startup.
    #[error("failed to query terminal mode: {0}")]
    ModeQuery(#[source] io::Error),

    /// Switching the terminal into raw mode failed.
    #[error("failed to set terminal mode: {0}")]
    ModeSet(#[source] io::Error),

    /// Restoring the saved terminal mode failed during shutdown.
    #[error("failed to restore terminal mode: {0}")]
    ModeRestore(#[source] io::Error),

    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not attached to a terminal")]
    NotATerminal,

    #[error("unsupported platform")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, Error>;
