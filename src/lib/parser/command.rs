use super::{BACKGROUND, REDIRECT_INPUT, REDIRECT_OUTPUT};
use smallvec::SmallVec;
use std::fmt;

/// The list of redirections for a single command. The grammar allows one per
/// direction, so two entries fit inline.
pub type Redirections = SmallVec<[Redirection; 2]>;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
/// Which standard stream a redirection replaces.
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    /// The operator that introduces this redirection.
    pub fn operator(self) -> &'static str {
        match self {
            Direction::Input => REDIRECT_INPUT,
            Direction::Output => REDIRECT_OUTPUT,
        }
    }

    pub(crate) fn from_operator(word: &str) -> Option<Self> {
        match word {
            REDIRECT_INPUT => Some(Direction::Input),
            REDIRECT_OUTPUT => Some(Direction::Output),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
/// A stream to replace, and the file to replace it with.
pub struct Redirection {
    pub direction: Direction,
    pub file:      String,
}

impl Redirection {
    pub fn new<S: Into<String>>(direction: Direction, file: S) -> Self {
        Redirection { direction, file: file.into() }
    }
}

impl fmt::Display for Redirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction.operator(), self.file)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default, Hash)]
/// A single parsed command line.
///
/// `program` is never empty, and `args` never holds an operator or the
/// background marker; the `Collector` rejects any line that would break
/// either rule.
pub struct Command {
    pub program:      String,
    pub args:         Vec<String>,
    pub redirections: Redirections,
    pub background:   bool,
}

impl Command {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Command { program: program.into(), ..Command::default() }
    }

    /// The full argument vector handed to the program, its own name first.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    pub fn has_redirections(&self) -> bool { !self.redirections.is_empty() }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        for redirection in &self.redirections {
            write!(f, " {}", redirection)?;
        }
        if self.background {
            write!(f, " {}", BACKGROUND)?;
        }
        Ok(())
    }
}
