// SPDX-License-Identifier: MIT
//
// Emergency terminal restoration.
//
// If the process dies while the session is started (a panic, a fatal
// signal, `std::process::exit` from somewhere deep), the user is left with
// a terminal in raw mode with mouse reporting on: no echo, escape garbage
// on every mouse move. This module restores the terminal on every
// abnormal exit path Unix offers:
//
//   - panic hook (chained in front of the existing hook)
//   - SIGTERM / SIGINT / SIGHUP / SIGQUIT handlers, which restore and then
//     re-raise the signal with the default disposition
//   - an `atexit` callback
//
// All three run the same minimal routine: one raw write of a fixed byte
// string to fd 1, then the saved termios. Errors are ignored; nobody is
// left to report them to.
//
// The hooks are installed once per process and stay installed. Whether
// they *act* is governed by the armed flag, which the session sets on
// start and clears on stop. A disarmed hook does nothing, so a normal
// shutdown is never followed by a second, redundant restore.
#![allow(unsafe_code)]

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(unix)]
use std::sync::Mutex;

/// What an emergency restore writes: end any half-written synchronized
/// frame, reset styling, re-enable autowrap, disable every mouse mode,
/// show the cursor, leave the alternate screen. The alternate screen goes
/// last so the shell's content reappears clean.
#[rustfmt::skip]
pub const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[0m\
    \x1b[?7h\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[?25h\
    \x1b[?1049l";

static ARMED: AtomicBool = AtomicBool::new(false);
static HOOKS_INSTALLED: Once = Once::new();

/// Termios saved by the backend when it entered raw mode.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Remember the original terminal mode for emergency restore.
#[cfg(unix)]
pub fn save_termios(termios: libc::termios) {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        *guard = Some(termios);
    }
}

/// Forget the saved mode (it was restored normally).
#[cfg(unix)]
pub fn clear_termios() {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        *guard = None;
    }
}

/// Enable emergency restoration, installing the hooks on first use.
pub fn arm() {
    HOOKS_INSTALLED.call_once(install_hooks);
    ARMED.store(true, Ordering::SeqCst);
    tracing::debug!("emergency restore armed");
}

/// Disable emergency restoration. The hooks stay installed but inert.
pub fn disarm() {
    ARMED.store(false, Ordering::SeqCst);
    tracing::debug!("emergency restore disarmed");
}

#[must_use]
pub fn is_armed() -> bool {
    ARMED.load(Ordering::SeqCst)
}

/// Restore the terminal if armed, then disarm. Safe to call from any of
/// the hooks; only the first caller acts.
pub fn restore() {
    if !ARMED.swap(false, Ordering::SeqCst) {
        return;
    }
    write_restore_sequence();
    #[cfg(unix)]
    restore_termios();
}

/// One raw write to fd 1. Bypasses `io::stdout()`, whose lock may be held
/// by the thread that panicked mid-frame.
fn write_restore_sequence() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        use std::io::Write;
        let mut out = std::io::stdout();
        let _ = out.write_all(EMERGENCY_RESTORE);
        let _ = out.flush();
    }
}

/// `try_lock` only: inside a signal handler the interrupted thread may
/// hold the lock, and blocking would hang the exit.
#[cfg(unix)]
fn restore_termios() {
    if let Ok(guard) = TERMIOS_BACKUP.try_lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

fn install_hooks() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        original(info);
    }));

    #[cfg(unix)]
    unsafe {
        for sig in [libc::SIGTERM, libc::SIGINT, libc::SIGHUP, libc::SIGQUIT] {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            libc::sigemptyset(&raw mut action.sa_mask);
            let _ = libc::sigaction(sig, &raw const action, std::ptr::null_mut());
        }
        let _ = libc::atexit(on_exit);
    }
}

#[cfg(unix)]
extern "C" fn on_signal(sig: libc::c_int) {
    restore();
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
        libc::raise(sig);
    }
}

#[cfg(unix)]
extern "C" fn on_exit() {
    restore();
}

// ─── Tests ───────────────────────────────────────────────────────────────────
