// SPDX-License-Identifier: MIT
//
// Resize poller: asks the device for its size every interval and, on a
// change, resizes the screen and publishes `Event::Resize`.
//
// The screen is resized before the event goes out, so a subscriber that
// repaints in response already sees grids of the new size.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backend::{Device, Size};
use crate::diff::Screen;
use crate::hub::EventHub;
use crate::input::Event;

/// The poller thread handle. Dropping it stops and joins the thread.
pub struct ResizePoller {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl ResizePoller {
    /// Spawn the poller. `initial` is the size the screen was created with.
    ///
    /// # Panics
    ///
    /// Panics if the OS cannot spawn a new thread.
    #[must_use]
    pub fn spawn(
        device: Device,
        screen: Arc<Screen>,
        hub: EventHub,
        initial: Size,
        interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("wincell-resize".into())
            .spawn(move || {
                let mut last = initial;
                while !stop_flag.load(Ordering::Relaxed) {
                    if let Some(size) = check(&device, &screen, &hub, last) {
                        last = size;
                    }
                    thread::sleep(interval);
                }
            })
            .expect("failed to spawn resize poller thread");

        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Signal the thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ResizePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One poll. Returns the new size if it differs from `last`.
///
/// Size query failures are treated as "unchanged".
pub fn check(device: &Device, screen: &Screen, hub: &EventHub, last: Size) -> Option<Size> {
    // The device lock is released before the screen lock is taken.
    let size = device.lock().size();
    match size {
        Ok(size) if size != last => {
            tracing::debug!(cols = size.cols, rows = size.rows, "terminal resized");
            screen.resize(size);
            hub.publish(Event::Resize(size));
            Some(size)
        }
        Ok(_) => None,
        Err(err) => {
            tracing::trace!(%err, "size query failed");
            None
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
