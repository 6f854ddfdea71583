//! Standard stream redirection for a forked child.
//!
//! Everything here runs between `fork` and `exec`, so nothing allocates:
//! paths arrive as prepared `CString`s and errors are written straight to the
//! standard error descriptor.

use crate::parser::Direction;
use nix::{
    errno::Errno,
    fcntl::{open, OFlag},
    libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO},
    sys::stat::Mode,
    unistd::{close, dup2, write},
};
use std::{ffi::CStr, os::unix::io::RawFd};
use thiserror::Error;

/// An error that aborts a forked child before or instead of its program.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ChildError<'a> {
    /// A file could not be opened for one of the standard streams
    #[error("cannot open {path} for {direction}: {errno}")]
    Redirect { path: &'a str, direction: Direction, errno: Errno },
    /// The program could not be executed
    #[error("{program}: {errno}")]
    Exec { program: &'a str, errno: Errno },
}

impl<'a> ChildError<'a> {
    /// Writes the error to stderr using nothing but `write(2)`.
    pub(crate) fn report(&self) {
        let parts: [&[u8]; 5] = match *self {
            ChildError::Redirect { path, direction, errno } => [
                b"cannot open ",
                path.as_bytes(),
                match direction {
                    Direction::Input => b" for input: " as &[u8],
                    Direction::Output => b" for output: ",
                },
                errno.desc().as_bytes(),
                b"\n",
            ],
            ChildError::Exec { program, errno } => {
                [program.as_bytes(), b": ", errno.desc().as_bytes(), b"\n", b""]
            }
        };
        for part in &parts {
            let _ = write(STDERR_FILENO, part);
        }
    }

    /// Status the child exits with.
    pub(crate) fn exit_code(&self) -> i32 { 1 }
}

/// A redirection prepared for use after `fork`.
#[derive(Debug)]
pub(crate) struct PreparedRedirect<'a> {
    pub(crate) direction: Direction,
    pub(crate) display:   &'a str,
    pub(crate) path:      &'a CStr,
}

impl<'a> PreparedRedirect<'a> {
    fn flags(&self) -> OFlag {
        match self.direction {
            Direction::Input => OFlag::O_RDONLY,
            Direction::Output => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        }
    }

    fn target(&self) -> RawFd {
        match self.direction {
            Direction::Input => STDIN_FILENO,
            Direction::Output => STDOUT_FILENO,
        }
    }

    /// Opens the file and installs it over stdin or stdout.
    pub(crate) fn apply(&self, mode: Mode) -> Result<(), ChildError<'a>> {
        let error =
            |errno| ChildError::Redirect { path: self.display, direction: self.direction, errno };
        let fd = open(self.path, self.flags(), mode).map_err(error)?;
        redir(fd, self.target()).map_err(error)
    }
}

/// Use dup2 to replace `new` with `old`, then drop the now redundant `old`.
pub(crate) fn redir(old: RawFd, new: RawFd) -> nix::Result<()> {
    if old == new {
        return Ok(());
    }
    dup2(old, new)?;
    close(old)
}

/// Points stdin and stdout of a background job at the null device.
pub(crate) fn redirect_to_null<'a>(
    display: &'a str,
    path: &'a CStr,
    mode: Mode,
) -> Result<(), ChildError<'a>> {
    for &direction in &[Direction::Input, Direction::Output] {
        PreparedRedirect { direction, display, path }.apply(mode)?;
    }
    Ok(())
}
