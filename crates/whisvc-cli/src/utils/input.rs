//! Line-oriented input helpers for interactive prompts.
//!
//! Every helper takes its reader and writer explicitly so the prompt logic can
//! be driven from a script in tests.

use std::io::{self, BufRead, Write};

/// Outcome of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    /// The input stream is closed; nobody can answer.
    Closed,
}

/// Print `prompt` and read one trimmed line.
pub fn read_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<Line> {
    write!(output, "{prompt} ")?;
    output.flush()?;

    let mut buffer = String::new();
    if input.read_line(&mut buffer)? == 0 {
        return Ok(Line::Closed);
    }
    Ok(Line::Text(buffer.trim().to_string()))
}

/// Parse a yes/no answer. Empty input takes `default`.
///
/// Accepts 'y', 'yes', 'n', 'no' (case insensitive).
pub fn parse_confirmation(answer: &str, default: bool) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Suffix shown after a yes/no question.
pub const fn confirmation_hint(default: bool) -> &'static str {
    if default { "(Y/n)" } else { "(y/N)" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_trimmed_line_and_detects_eof() {
        let mut input = Cursor::new("  medium \n");
        let mut output = Vec::new();
        assert_eq!(
            read_line(&mut input, &mut output, "Model:").unwrap(),
            Line::Text("medium".to_string())
        );
        assert_eq!(read_line(&mut input, &mut output, "Model:").unwrap(), Line::Closed);
        assert_eq!(String::from_utf8(output).unwrap(), "Model: Model: ");
    }

    #[test]
    fn confirmation_answers() {
        assert_eq!(parse_confirmation("", true), Some(true));
        assert_eq!(parse_confirmation("", false), Some(false));
        assert_eq!(parse_confirmation("YES", false), Some(true));
        assert_eq!(parse_confirmation("n", true), Some(false));
        assert_eq!(parse_confirmation("maybe", true), None);
    }
}
