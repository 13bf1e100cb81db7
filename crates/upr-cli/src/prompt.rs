//! The real terminal prompt.

use std::io::{BufRead, IsTerminal, Write};

use upr_core::errors::CoreError;
use upr_core::prompt::Prompt;

pub struct TerminalPrompt;

impl TerminalPrompt {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str, default_answer: bool) -> Result<bool, CoreError> {
        if !std::io::stdin().is_terminal() {
            // Unattended runs must pass --yes/--no instead of hanging here.
            return Err(CoreError::ConfirmationUnavailable {
                action: question.to_string(),
            });
        }
        let hint = if default_answer { "[Y/n]" } else { "[y/N]" };
        loop {
            print!("{question} {hint} ");
            std::io::stdout()
                .flush()
                .map_err(|error| CoreError::Other(error.into()))?;
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|error| CoreError::Other(error.into()))?;
            match line.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default_answer),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("please answer y or n"),
            }
        }
    }

    fn password(&self, prompt: &str) -> Result<String, CoreError> {
        rpassword::prompt_password(prompt).map_err(|error| CoreError::Other(error.into()))
    }
}
