use std::io::{self, BufRead, Write};

use tracing::warn;

/// Yes/no decision before the project file is overwritten
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Only a literal "yes" counts
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Asks on a writer and reads the answer from a reader (stdin/stdout in the binary)
pub struct TerminalPrompt<R, W> {
    reader: R,
    writer: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        if let Err(e) = write!(self.writer, "{} (yes/no): ", question).and_then(|_| self.writer.flush()) {
            warn!("Could not write prompt: {}", e);
            return false;
        }

        let mut answer = String::new();
        match self.reader.read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                warn!("Could not read answer: {}", e);
                false
            }
        }
    }
}

/// `--yes`: approve without asking
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("  YES \n"));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn test_terminal_prompt_writes_question() {
        let mut output = Vec::new();
        let answered = TerminalPrompt::new(Cursor::new("yes\n"), &mut output).confirm("Continue?");

        assert!(answered);
        assert_eq!(String::from_utf8(output).unwrap(), "Continue? (yes/no): ");
    }

    #[test]
    fn test_terminal_prompt_declines_on_eof() {
        let mut prompt = TerminalPrompt::new(Cursor::new(""), Vec::new());
        assert!(!prompt.confirm("Continue?"));
    }

    #[test]
    fn test_auto_approve() {
        assert!(AutoApprove.confirm("anything"));
    }
}
