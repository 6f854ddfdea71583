use std::borrow::Cow;

/// The placeholder that expands to the shell's process ID.
pub const PID_PLACEHOLDER: &str = "$$";

/// Replaces every `$$` in `line` with the decimal form of `pid`.
///
/// Matching is strictly left to right and non-overlapping, so `$$$` becomes
/// the pid followed by a single `$`. Lines without a placeholder are handed
/// back without allocating.
pub fn expand_pid(line: &str, pid: u32) -> Cow<'_, str> {
    if line.len() < PID_PLACEHOLDER.len() || !line.contains(PID_PLACEHOLDER) {
        return Cow::Borrowed(line);
    }

    let pid = pid.to_string();
    let mut expanded = String::with_capacity(line.len() + pid.len());
    let mut rest = line;
    while let Some(found) = rest.find(PID_PLACEHOLDER) {
        expanded.push_str(&rest[..found]);
        expanded.push_str(&pid);
        rest = &rest[found + PID_PLACEHOLDER.len()..];
    }
    expanded.push_str(rest);
    Cow::Owned(expanded)
}

/// Splits a line into words on runs of ASCII whitespace.
///
/// The trailing newline is whitespace like any other, and no empty words are
/// produced.
pub fn tokenize(line: &str) -> impl Iterator<Item = &str> { line.split_ascii_whitespace() }
