//! Small CLI helpers

use std::io::{BufRead, Write};

/// Interactive yes/no confirmation; anything but an explicit yes declines.
pub fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
