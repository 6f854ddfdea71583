use super::{
    command::{Command, Direction, Redirection},
    expand::tokenize,
    ParseError, BACKGROUND,
};
use std::iter::Peekable;

#[derive(Debug)]
/// Assembles a `Command` out of the words of a single expanded line.
pub struct Collector<'a> {
    data: &'a str,
}

impl<'a> Collector<'a> {
    pub fn new(data: &'a str) -> Self { Collector { data } }

    fn is_operator(word: &str) -> bool {
        word == BACKGROUND || Direction::from_operator(word).is_some()
    }

    /// Consumes the plain words that precede the first redirection.
    fn push_args<I>(&self, command: &mut Command, words: &mut Peekable<I>) -> Result<(), ParseError>
    where
        I: Iterator<Item = (usize, &'a str)>,
    {
        while let Some(&(position, word)) = words.peek() {
            if word == BACKGROUND {
                return Err(ParseError::MisplacedBackground(position));
            }
            if Direction::from_operator(word).is_some() {
                break;
            }
            command.args.push(word.into());
            words.next();
        }
        Ok(())
    }

    /// Consumes `(operator, file)` pairs until the words run out.
    fn push_redirections<I>(
        &self,
        command: &mut Command,
        words: &mut Peekable<I>,
    ) -> Result<(), ParseError>
    where
        I: Iterator<Item = (usize, &'a str)>,
    {
        while let Some((position, word)) = words.next() {
            let direction = match Direction::from_operator(word) {
                Some(direction) => direction,
                None if word == BACKGROUND => {
                    return Err(ParseError::MisplacedBackground(position))
                }
                None => return Err(ParseError::UnexpectedToken(word.into())),
            };

            if command.redirections.iter().any(|r| r.direction == direction) {
                return Err(ParseError::DuplicateRedirect(direction));
            }

            match words.next() {
                Some((_, file)) if !Self::is_operator(file) => {
                    command.redirections.push(Redirection::new(direction, file))
                }
                _ => return Err(ParseError::MissingRedirectTarget(direction)),
            }
        }
        Ok(())
    }

    pub fn parse(&self) -> Result<Command, ParseError> {
        let words: Vec<&str> = tokenize(self.data).collect();
        let (&program, rest) = words.split_first().ok_or(ParseError::Empty)?;
        if Self::is_operator(program) {
            return Err(ParseError::ExpectedCommand(program.into()));
        }

        let mut command = Command::new(program);
        command.args.reserve(rest.len());

        // The marker only counts as the very last word of the line.
        let body = match rest.split_last() {
            Some((&BACKGROUND, body)) => {
                command.background = true;
                body
            }
            _ => rest,
        };

        let mut words = body.iter().copied().enumerate().map(|(i, w)| (i + 1, w)).peekable();
        self.push_args(&mut command, &mut words)?;
        self.push_redirections(&mut command, &mut words)?;
        Ok(command)
    }
}
