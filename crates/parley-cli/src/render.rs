//! Output rendering per strategy

use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use parley_core::{Fragment, OutputStrategy};
use std::io::{self, Write};
use std::time::Duration;

/// Writes fragments to stdout as they arrive.
///
/// Markdown strategies print model text as is and style notices; plain
/// strategies print model text in the configured color.
pub struct Renderer {
    strategy: OutputStrategy,
    color: Option<Color>,
    styled: bool,
    spinner: Option<ProgressBar>,
    ends_with_newline: bool,
}

impl Renderer {
    pub fn new(strategy: OutputStrategy, color: &str, prettify: bool) -> Self {
        Self {
            strategy,
            color: color.parse().ok(),
            styled: prettify,
            spinner: None,
            ends_with_newline: true,
        }
    }

    /// Show a spinner until the first fragment arrives
    pub fn start_spinner(&mut self) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Loading...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn write(&mut self, fragment: &Fragment) -> io::Result<()> {
        let Some(text) = fragment.display_text() else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }
        self.stop_spinner();

        let rendered = match fragment {
            Fragment::Notice(notice) if self.styled => notice.dimmed().italic().to_string(),
            Fragment::Text(body) if !self.strategy.is_markdown() => match self.color {
                Some(color) => body.color(color).to_string(),
                None => body.clone(),
            },
            _ => text.to_string(),
        };

        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        self.ends_with_newline = text.ends_with('\n');
        Ok(())
    }

    /// Terminate the output with a newline
    pub fn finish(&mut self) -> io::Result<()> {
        self.stop_spinner();
        if !self.ends_with_newline {
            let mut stdout = io::stdout().lock();
            stdout.write_all(b"\n")?;
            stdout.flush()?;
            self.ends_with_newline = true;
        }
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}
