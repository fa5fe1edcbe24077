//! Interactive permission prompts.

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

/// Asks the user whether to grant host permissions.
pub trait GrantPrompt {
    fn ask(&mut self, source: &str, permissions: &[String], prompt: &str) -> anyhow::Result<bool>;
}

/// Reads y/n answers from the terminal.
pub struct TerminalPrompt {
    editor: Editor<(), DefaultHistory>,
}

impl TerminalPrompt {
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::builder().auto_add_history(false).build();
        Ok(Self {
            editor: Editor::with_config(config)?,
        })
    }
}

impl GrantPrompt for TerminalPrompt {
    fn ask(&mut self, source: &str, permissions: &[String], prompt: &str) -> anyhow::Result<bool> {
        eprintln!();
        eprintln!("  \x1b[1m{source}\x1b[0m needs access to:");
        for pattern in permissions {
            eprintln!("    {pattern}");
        }
        match self.editor.readline(&format!("  {prompt}? [y/N] ")) {
            Ok(line) => Ok(is_yes(&line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// Never grants anything.
pub struct DenyAll;

impl GrantPrompt for DenyAll {
    fn ask(&mut self, _source: &str, _permissions: &[String], _prompt: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
