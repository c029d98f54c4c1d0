//! Confirmation gate for destructive commands.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

/// Asks `question` on stderr and reads a yes/no answer from stdin.
///
/// `assume_yes` skips the prompt. When stdin is not a terminal the answer
/// cannot be given interactively, so the command is refused instead.
pub fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !atty::is(atty::Stream::Stdin) {
        bail!("{} requires confirmation; re-run with --yes", question);
    }
    let mut stderr = std::io::stderr().lock();
    write!(stderr, "{} [y/N] ", question)?;
    stderr.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
