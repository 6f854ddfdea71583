//! Turns a raw input line into a `Command`.
//!
//! Parsing happens in two passes: `expand` substitutes the `$$` placeholder
//! and splits the line into whitespace-separated words, then the `Collector`
//! walks those words and assembles the program, its arguments, the
//! redirections and the background marker.

mod collector;
mod command;
pub mod expand;

pub use self::{
    collector::Collector,
    command::{Command, Direction, Redirection, Redirections},
    expand::{expand_pid, tokenize},
};
use thiserror::Error;

/// The word that sends a command to the background.
pub const BACKGROUND: &str = "&";
/// Redirects standard input from a file.
pub const REDIRECT_INPUT: &str = "<";
/// Redirects standard output into a file.
pub const REDIRECT_OUTPUT: &str = ">";

/// An error that occurred while parsing a command line.
#[derive(Debug, Error, PartialEq, Eq, Hash, Clone)]
pub enum ParseError {
    /// Nothing but whitespace was supplied
    #[error("no command was supplied")]
    Empty,
    /// The line began with an operator instead of a program name
    #[error("expected command, but found '{0}'")]
    ExpectedCommand(String),
    /// The background marker was found before the end of the line
    #[error("'&' at position {0} is out of place, it may only end the line")]
    MisplacedBackground(usize),
    /// A redirection operator was not followed by a file
    #[error("expected file argument after redirection for {0}")]
    MissingRedirectTarget(Direction),
    /// The same stream was redirected twice
    #[error("{0} was redirected more than once")]
    DuplicateRedirect(Direction),
    /// A plain word followed the redirections
    #[error("'{0}' is out of place, arguments must precede redirections")]
    UnexpectedToken(String),
}

/// Parses an already expanded line.
pub fn parse(line: &str) -> Result<Command, ParseError> { Collector::new(line).parse() }
