//! Line framing.
//!
//! A line ends at the first CR or LF. Every CR/LF byte directly after it
//! belongs to the same terminator run, so `\r\n`, `\n` and `\r\n\r\n` all
//! close exactly one line.

/// Result of framing a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineResult {
    /// A line was found.
    Complete {
        /// Length of the line content, terminators excluded.
        len: usize,
        /// Bytes to consume, content plus the whole terminator run.
        consumed: usize,
    },
    /// No terminator buffered yet.
    Incomplete,
}

/// Frame one line from the start of `input`.
pub fn frame_line(input: &[u8]) -> LineResult {
    let len = match input.iter().position(|&b| is_terminator(b)) {
        Some(pos) => pos,
        None => return LineResult::Incomplete,
    };

    let run = input[len..]
        .iter()
        .take_while(|&&b| is_terminator(b))
        .count();

    LineResult::Complete {
        len,
        consumed: len + run,
    }
}

fn is_terminator(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}
