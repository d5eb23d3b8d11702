// SPDX-License-Identifier: MIT
//
// Background input thread.
//
// Each pass takes the device lock *before* asking whether input is ready
// and holds it through the read. A render can't slip a write in between
// the availability check and the read, so an escape sequence the terminal
// is still delivering is never split by our own output.
//
// The thread never blocks in read(): it only reads after poll says bytes
// are there, and otherwise sleeps for the poll interval with the lock
// released. Stopping therefore takes at most one interval.
//
// Escape timeout: bytes left in the decoder (a lone ESC, a truncated
// sequence) are flushed once a full idle pass has gone by with nothing
// new arriving.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::backend::Device;
use crate::hub::EventHub;
use crate::input::Decoder;
use crate::mouse::ClickConfig;

/// One read's worth of input. A key is a few bytes; a paste can be more,
/// in which case it arrives over several passes.
const READ_BUF_SIZE: usize = 4096;

/// The input thread handle. Dropping it stops and joins the thread.
pub struct InputReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl InputReader {
    /// Spawn the input thread. Decoded events go to `hub`.
    ///
    /// # Panics
    ///
    /// Panics if the OS cannot spawn a new thread.
    #[must_use]
    pub fn spawn(device: Device, hub: EventHub, click: ClickConfig, poll: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("wincell-input".into())
            .spawn(move || {
                input_loop(&device, &hub, Decoder::new(click), poll, &stop_flag);
            })
            .expect("failed to spawn input thread");

        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Whether the thread has exited (stopped, or input closed).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signal the thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn input_loop(
    device: &Device,
    hub: &EventHub,
    mut decoder: Decoder,
    poll: Duration,
    stop: &AtomicBool,
) {
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut stale = false;

    while !stop.load(Ordering::Relaxed) {
        let read = {
            let mut backend = device.lock();
            match backend.poll_input(Duration::ZERO) {
                Ok(true) => backend.read_input(&mut buf).map(Some),
                Ok(false) => Ok(None),
                Err(err) => Err(err),
            }
        };

        match read {
            Ok(Some(0)) => {
                tracing::debug!("input closed");
                break;
            }
            Ok(Some(n)) => {
                stale = false;
                hub.publish_all(decoder.feed(&buf[..n], Instant::now()));
            }
            Ok(None) => {
                if decoder.has_pending() {
                    if stale {
                        hub.publish_all(decoder.flush());
                        stale = false;
                    } else {
                        stale = true;
                    }
                }
                thread::sleep(poll);
            }
            Err(err) => {
                tracing::warn!(%err, "input read failed");
                break;
            }
        }
    }

    hub.publish_all(decoder.flush());
    tracing::debug!("input thread exiting");
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ScriptedBackend, Size};
    use crate::input::{Event, KeyCode, KeyEvent, Modifiers};
    use crate::mouse::MouseFlags;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc::Receiver;

    const WAIT: Duration = Duration::from_secs(2);

    /// Queue `chunks` (one per read), then start the thread.
    fn start(chunks: &[&str]) -> (InputReader, ScriptedBackend, Receiver<Event>) {
        let backend = ScriptedBackend::new(Size::new(80, 24));
        for chunk in chunks {
            backend.push_input(chunk.as_bytes());
        }
        let hub = EventHub::new();
        let rx = hub.subscribe();
        let reader = InputReader::spawn(
            Device::new(backend.clone()),
            hub,
            ClickConfig::default(),
            Duration::from_millis(1),
        );
        (reader, backend, rx)
    }

    #[test]
    fn keys_are_decoded_and_published() {
        let (mut reader, _backend, rx) = start(&["a\x1b[A"]);
        assert_eq!(
            rx.recv_timeout(WAIT).ok(),
            Some(Event::Key(KeyEvent::plain(KeyCode::Char('a'))))
        );
        assert_eq!(
            rx.recv_timeout(WAIT).ok(),
            Some(Event::Key(KeyEvent::plain(KeyCode::Up)))
        );
        reader.stop();
    }

    #[test]
    fn sequence_split_across_reads_is_reassembled() {
        let (mut reader, _backend, rx) = start(&["\x1b[1;5", "C"]);
        assert_eq!(
            rx.recv_timeout(WAIT).ok(),
            Some(Event::Key(KeyEvent::new(KeyCode::Right, Modifiers::CTRL)))
        );
        reader.stop();
    }

    #[test]
    fn lone_escape_is_flushed_after_idle() {
        let (mut reader, _backend, rx) = start(&["\x1b"]);
        assert_eq!(
            rx.recv_timeout(WAIT).ok(),
            Some(Event::Key(KeyEvent::plain(KeyCode::Escape)))
        );
        reader.stop();
    }

    #[test]
    fn mouse_reports_are_classified() {
        let (mut reader, _backend, rx) = start(&["\x1b[<0;41;13M"]);
        let Some(Event::Mouse(ev)) = rx.recv_timeout(WAIT).ok() else {
            panic!("expected a mouse event");
        };
        assert_eq!(ev.flags, MouseFlags::BUTTON1_PRESSED);
        assert_eq!((ev.x, ev.y), (40, 12));
        reader.stop();
    }

    #[test]
    fn closed_input_ends_the_thread() {
        let (reader, _backend, _rx) = start(&[""]);
        let deadline = Instant::now() + WAIT;
        while !reader.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(reader.is_finished());
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut reader, _backend, _rx) = start(&[]);
        reader.stop();
        reader.stop();
        assert!(reader.is_finished());
    }
}
