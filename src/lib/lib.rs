//! smallsh: a small interactive shell with POSIX job control.
//!
//! A line goes through `$$` expansion and the command parser, then either
//! runs as a builtin inside the shell or is forked off as an external
//! program, in the foreground or in the background.

pub mod builtins;
pub mod parser;
pub mod shell;

pub use crate::shell::{
    signals, status::Status, BackgroundProcess, ExecutionError, JobRegistry, Options, Shell,
    ShellError,
};
