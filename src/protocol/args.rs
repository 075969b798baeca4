//! Command-line tokenizer.
//!
//! Splits a line on spaces. A token that starts with `'` or `"` runs until
//! the matching quote, spaces included; anything between the closing quote
//! and the next space is dropped. A quote in the middle of a token is an
//! ordinary character. An unterminated quote runs to the end of the line.

/// Split `line` into at most `max_tokens` tokens.
///
/// Once the limit is reached the rest of the line is ignored.
pub fn tokenize(line: &str, max_tokens: usize) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while tokens.len() < max_tokens {
        while pos < bytes.len() && bytes[pos] == b' ' {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let mut quote = match bytes[pos] {
            q @ (b'\'' | b'"') => {
                pos += 1;
                Some(q)
            }
            _ => None,
        };
        let start = pos;
        let mut end = None;

        while pos < bytes.len() && (bytes[pos] != b' ' || quote.is_some()) {
            if quote == Some(bytes[pos]) {
                quote = None;
                end = Some(pos);
            }
            pos += 1;
        }

        // Quotes and spaces are ASCII, so both bounds sit on char boundaries.
        tokens.push(&line[start..end.unwrap_or(pos)]);
        pos += 1;
    }

    tokens
}
