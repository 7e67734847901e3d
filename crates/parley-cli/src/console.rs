//! CLI console utilities

use colored::*;

/// Status messages on stderr, so they never mix with model output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            eprintln!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    /// Print a notice the user should always see, like a resumed chat id
    pub fn notice(&self, message: &str) {
        eprintln!("{}", format!("[ {} ]", message).cyan());
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.chars().count()).dimmed());
    }
}
