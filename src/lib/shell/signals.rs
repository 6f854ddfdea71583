//! This module contains all of the code that manages signal handling in the
//! shell. The shell itself ignores `SIGINT` and turns `SIGTSTP` into a toggle
//! for foreground-only mode; forked children adjust those dispositions again
//! before they exec.
//!
//! The foreground-only flag is the one piece of state a signal handler may
//! touch, so it lives here as a lone atomic rather than on the `Shell`.

use nix::{
    libc::{c_int, STDOUT_FILENO},
    sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal},
    unistd::write,
};
use std::sync::atomic::{AtomicBool, Ordering};

pub const ENTER_FOREGROUND_ONLY: &str = "\nEntering foreground-only mode (& is now ignored)\n";
pub const EXIT_FOREGROUND_ONLY: &str = "\nExiting foreground-only mode\n";

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// Whether `&` is currently being ignored.
pub fn foreground_only() -> bool { FOREGROUND_ONLY.load(Ordering::SeqCst) }

/// Flips foreground-only mode and returns the banner announcing the new mode.
pub fn toggle_foreground_only() -> &'static str {
    if FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst) {
        EXIT_FOREGROUND_ONLY
    } else {
        ENTER_FOREGROUND_ONLY
    }
}

extern "C" fn handle_sigtstp(_signal: c_int) {
    // Only async-signal-safe calls past this point.
    let banner = toggle_foreground_only();
    let _ = write(STDOUT_FILENO, banner.as_bytes());
}

fn set_disposition(signal: Signal, handler: SigHandler, flags: SaFlags) -> nix::Result<()> {
    let action = SigAction::new(handler, flags, SigSet::all());
    unsafe { sigaction(signal, &action) }.map(|_| ())
}

/// Install the shell's own dispositions: `SIGINT` is ignored, and `SIGTSTP`
/// toggles foreground-only mode. `SA_RESTART` lets a pending read or wait
/// carry on once the banner has been written.
pub fn install() -> nix::Result<()> {
    set_disposition(Signal::SIGINT, SigHandler::SigIgn, SaFlags::empty())?;
    set_disposition(Signal::SIGTSTP, SigHandler::Handler(handle_sigtstp), SaFlags::SA_RESTART)
}

/// Lets a forked child be interrupted again. Runs between fork and exec.
pub(crate) fn restore_interrupt() -> nix::Result<()> {
    set_disposition(Signal::SIGINT, SigHandler::SigDfl, SaFlags::empty())
}

/// Keeps a forked child from being stopped by the toggle signal. Runs between
/// fork and exec.
pub(crate) fn ignore_stop() -> nix::Result<()> {
    set_disposition(Signal::SIGTSTP, SigHandler::SigIgn, SaFlags::empty())
}

#[cfg(test)]
pub(crate) fn reset_foreground_only() { FOREGROUND_ONLY.store(false, Ordering::SeqCst) }
