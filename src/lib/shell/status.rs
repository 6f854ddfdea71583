use nix::sys::{signal::Signal, wait::WaitStatus};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// How a command finished.
///
/// A foreground child killed by a signal is recorded as `Signaled` rather
/// than leaving the previous exit code in place, so `status` can tell the
/// two apart.
pub enum Status {
    Exited(i32),
    Signaled(i32),
}

impl Default for Status {
    fn default() -> Self { Status::SUCCESS }
}

impl Status {
    pub const FAILURE: Self = Status::Exited(1);
    pub const SUCCESS: Self = Status::Exited(0);

    pub fn from_exit_code(code: i32) -> Self { Status::Exited(code) }

    pub fn from_signal(signal: Signal) -> Self { Status::Signaled(signal as i32) }

    /// Converts a finished `WaitStatus`. Anything that is not a termination
    /// (still alive, stopped, continued) yields `None`.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Status::from_exit_code(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Status::from_signal(signal)),
            _ => None,
        }
    }

    pub fn error<T: AsRef<str>>(err: T) -> Self {
        let err = err.as_ref();
        if !err.is_empty() {
            eprintln!("{}", err);
        }
        Status::FAILURE
    }

    pub fn is_success(self) -> bool { self == Status::SUCCESS }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Status::Exited(code) => write!(f, "exit value {}", code),
            Status::Signaled(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}
