use anyhow::{anyhow, Context, Result};
use std::io::{self, BufRead, IsTerminal, Write};

/// Asks a yes/no question on stderr. `--yes` answers for the user; without a
/// terminal on stdin the question cannot be asked and the action is refused.
pub(crate) fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(anyhow!("{question} (confirmation required; pass --yes)"));
    }

    let answer = ask(&format!("{question} [y/N] "))?;
    Ok(parse_yes_no(&answer))
}

/// Lets the user pick one of `options` by number.
pub(crate) fn choose(title: &str, options: &[String]) -> Result<Option<usize>> {
    if !io::stdin().is_terminal() {
        return Err(anyhow!("{title} (no terminal to prompt on; pass a target)"));
    }

    let mut stderr = io::stderr();
    writeln!(stderr, "{title}").context("failed to write prompt")?;
    for (index, option) in options.iter().enumerate() {
        writeln!(stderr, "  {}) {option}", index + 1).context("failed to write prompt")?;
    }
    let answer = ask("Select a number (empty to cancel): ")?;
    Ok(parse_choice(&answer, options.len()))
}

fn ask(prompt: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}").context("failed to write prompt")?;
    stderr.flush().ok();

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(answer)
}

pub(crate) fn parse_yes_no(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// One-based choice to zero-based index.
pub(crate) fn parse_choice(answer: &str, len: usize) -> Option<usize> {
    let choice = answer.trim().parse::<usize>().ok()?;
    (1..=len).contains(&choice).then(|| choice - 1)
}
