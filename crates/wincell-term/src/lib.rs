// SPDX-License-Identifier: MIT
//
// wincell-term: terminal engine for the wincell windowing runtime.
//
// Bottom to top: cells and styles, a flat cell grid with styled-text
// writes, a diff renderer that turns a shown/pending grid pair into one
// terminal write per frame, a streaming input decoder for keys and mouse
// reports (with click, double-click and drag synthesis), and the session
// lifecycle that owns raw mode and guarantees the terminal is restored.
//
// All device access goes through one `Backend` behind one mutex, shared
// by the renderer, the input thread and the resize poller. The real
// backend is termios on Unix; tests use a scripted one.

pub mod ansi;
pub mod backend;
pub mod cell;
pub mod color;
pub mod console;
pub mod diff;
pub mod emergency;
pub mod error;
pub mod grid;
pub mod hub;
pub mod input;
pub mod mouse;
pub mod output;
pub mod reader;
pub mod resize;
pub mod session;
pub mod styled;
#[cfg(unix)]
pub mod tty;

pub use error::{Error, Result};
