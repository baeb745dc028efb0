//! Interactive confirmation prompts.

use std::io::{BufRead, Write};

use crate::error::CliError;

/// Ask the user a yes/no question and return their answer.
///
/// Accepts `y` or `yes` (any case) as confirmation; anything else,
/// including an empty line, declines.
///
/// # Errors
///
/// Returns an error if the prompt cannot be written or the answer read.
pub fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<bool, CliError> {
    write!(output, "{question} [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Ask a yes/no question on stdin/stderr.
///
/// The prompt goes to stderr so it never contaminates piped output.
///
/// # Errors
///
/// Returns an error if stdin or stderr fail.
pub fn confirm(question: &str) -> Result<bool, CliError> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stderr();
    confirm_with(&mut input, &mut output, question)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(reply: &str) -> bool {
        let mut input = reply.as_bytes();
        let mut output = Vec::new();
        confirm_with(&mut input, &mut output, "Proceed?").expect("prompt should work")
    }

    #[test]
    fn yes_answers_confirm() {
        assert!(ask("y\n"));
        assert!(ask("yes\n"));
        assert!(ask("YES\n"));
        assert!(ask("  y  \n"));
    }

    #[test]
    fn anything_else_declines() {
        assert!(!ask("n\n"));
        assert!(!ask("no\n"));
        assert!(!ask("\n"));
        assert!(!ask("maybe\n"));
        assert!(!ask(""));
    }

    #[test]
    fn question_is_written() {
        let mut input = "y\n".as_bytes();
        let mut output = Vec::new();
        confirm_with(&mut input, &mut output, "Redeploy production?").expect("prompt should work");
        let prompt = String::from_utf8(output).expect("utf8");
        assert!(prompt.contains("Redeploy production?"));
        assert!(prompt.contains("[y/N]"));
    }
}
