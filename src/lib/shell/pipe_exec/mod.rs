//! The final step in running a command: forking off a child process,
//! wiring up its standard streams and signal dispositions, and handing the
//! child over to job control once the parent regains control.

pub mod job_control;
mod streams;

use self::streams::{redirect_to_null, ChildError, PreparedRedirect};
use super::{signals, Options, Shell};
use crate::parser::{Command, Direction};
use log::debug;
use nix::{
    errno::Errno,
    libc::{self, c_char},
    sys::stat::Mode,
    unistd::{fork, ForkResult, Pid},
};
use std::{
    ffi::CString,
    io::{self, Write},
    iter, ptr,
};
use thiserror::Error;

/// An error that occurred in the shell while launching or waiting on a child.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ExecutionError {
    /// A new process could not be created
    #[error("failed to fork: {0}")]
    Fork(#[source] Errno),
    /// Waiting on a child failed for a reason other than an interruption
    #[error("failed to wait on process {0}: {1}")]
    WaitPid(Pid, #[source] Errno),
    /// A word of the command cannot be passed to the operating system
    #[error("'{0}' contains a nul byte")]
    NulByte(String),
}

impl ExecutionError {
    /// Whether the shell can no longer carry on after this error.
    pub fn is_fatal(&self) -> bool { matches!(self, ExecutionError::Fork(_)) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Where a launched command runs.
pub enum Disposition {
    Foreground,
    Background,
}

impl Disposition {
    /// A command only goes to the background when it asked to and the shell
    /// is not in foreground-only mode.
    pub fn of(command: &Command, foreground_only: bool) -> Self {
        if command.background && !foreground_only {
            Disposition::Background
        } else {
            Disposition::Foreground
        }
    }
}

fn c_string(word: &str) -> Result<CString, ExecutionError> {
    CString::new(word).map_err(|_| ExecutionError::NulByte(word.into()))
}

/// Everything the child needs, prepared by the parent so that the child
/// never allocates between `fork` and `exec`.
struct ChildPlan<'a> {
    program:           &'a str,
    argv:              Vec<CString>,
    argv_ptrs:         Vec<*const c_char>,
    redirections:      Vec<(Direction, &'a str, CString)>,
    null_display:      String,
    null_device:       CString,
    mode:              Mode,
    restore_interrupt: bool,
    null_streams:      bool,
}

impl<'a> ChildPlan<'a> {
    fn new(
        command: &'a Command,
        opts: &Options,
        disposition: Disposition,
        foreground_only: bool,
    ) -> Result<Self, ExecutionError> {
        let argv = command.argv().map(c_string).collect::<Result<Vec<_>, _>>()?;
        // The heap buffers of the strings stay put when `argv` itself moves.
        let argv_ptrs: Vec<*const c_char> =
            argv.iter().map(|arg| arg.as_ptr()).chain(iter::once(ptr::null())).collect();

        let redirections = command
            .redirections
            .iter()
            .map(|r| Ok((r.direction, r.file.as_str(), c_string(&r.file)?)))
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        Ok(ChildPlan {
            program: &command.program,
            argv,
            argv_ptrs,
            redirections,
            null_display: opts.null_device.clone(),
            null_device: c_string(&opts.null_device)?,
            mode: Mode::from_bits_truncate(opts.output_mode as libc::mode_t),
            restore_interrupt: !command.background && foreground_only,
            null_streams: disposition == Disposition::Background && !command.has_redirections(),
        })
    }

    fn prepare(&self) -> Result<(), ChildError<'_>> {
        if self.restore_interrupt {
            let _ = signals::restore_interrupt();
        }

        if self.null_streams {
            redirect_to_null(&self.null_display, &self.null_device, self.mode)?;
        } else {
            for &(direction, display, ref path) in &self.redirections {
                PreparedRedirect { direction, display, path }.apply(self.mode)?;
            }
        }

        let _ = signals::ignore_stop();
        Ok(())
    }

    /// Replaces the child with the program. Only returns through `_exit`.
    ///
    /// # Safety
    /// Must only be called in the child half of a `fork`.
    unsafe fn exec(&self) -> ! {
        let err = match self.prepare() {
            Ok(()) => {
                libc::execvp(self.argv[0].as_ptr(), self.argv_ptrs.as_ptr());
                ChildError::Exec { program: self.program, errno: Errno::last() }
            }
            Err(err) => err,
        };
        err.report();
        libc::_exit(err.exit_code())
    }
}

impl Shell {
    /// Forks and executes an external program, then either waits on it or
    /// leaves it running in the background.
    pub(crate) fn execute_external(&mut self, command: &Command) -> Result<(), ExecutionError> {
        let foreground_only = signals::foreground_only();
        let disposition = Disposition::of(command, foreground_only);
        let plan = ChildPlan::new(command, &self.opts, disposition, foreground_only)?;

        // Anything still buffered would otherwise be written twice.
        let _ = io::stdout().flush();

        match unsafe { fork() }.map_err(ExecutionError::Fork)? {
            ForkResult::Child => unsafe { plan.exec() },
            ForkResult::Parent { child } => {
                drop(plan);
                debug!("spawned '{}' as {} in the {:?}", command, child, disposition);
                match disposition {
                    Disposition::Background => self.send_to_background(child, command),
                    Disposition::Foreground => self.watch_foreground(child),
                }
            }
        }
    }
}
