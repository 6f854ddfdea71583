use std::io::{self, BufRead, Read};

#[derive(Debug, PartialEq, Eq, Clone)]
/// The outcome of reading one line from the terminal.
pub enum Input {
    /// A complete line, newline included when one was read.
    Line(String),
    /// The line was longer than the limit; the rest of it was discarded.
    TooLong,
    /// Standard input was closed.
    Eof,
}

/// Reads a single line of at most `max` bytes. Bytes that are not valid
/// UTF-8 are replaced rather than rejected.
pub fn read_line<R: BufRead>(reader: &mut R, max: usize) -> io::Result<Input> {
    let mut buffer = Vec::with_capacity(128);
    let read = reader.by_ref().take(max as u64 + 1).read_until(b'\n', &mut buffer)?;
    if read == 0 {
        return Ok(Input::Eof);
    }

    if buffer.len() > max {
        if buffer.last() != Some(&b'\n') {
            discard_line(reader)?;
        }
        return Ok(Input::TooLong);
    }

    Ok(Input::Line(String::from_utf8_lossy(&buffer).into_owned()))
}

fn discard_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let mut sink = Vec::new();
    loop {
        sink.clear();
        let read = reader.by_ref().take(4096).read_until(b'\n', &mut sink)?;
        if read == 0 || sink.last() == Some(&b'\n') {
            return Ok(());
        }
    }
}
