// SPDX-License-Identifier: MIT
//
// wincell-desk: the desktop layer: window descriptors, per-window
// canvases, and the occlusion compositor that decides which windows to
// paint into the shared cell grid each frame.

pub mod canvas;
pub mod compositor;
pub mod window;

pub use canvas::{Canvas, WindowPainter};
pub use compositor::{Compositor, DesktopConfig, FrameReport};
pub use window::{WindowDescriptor, WindowId, WindowState, window_at};
