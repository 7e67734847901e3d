//! Parley CLI application
//!
//! Sends a prompt to a hosted completion API and streams the answer to the
//! terminal.
//!
//! ```bash
//! parley "what is a monad"               # one-shot question (fresh default chat)
//! parley --chat rust "explain lifetimes"  # persistent chat named `rust`
//! parley --resume "and borrowing?"        # continue the most recent chat
//! parley -s "list open ports"             # shell command with execute prompt
//! parley --repl work                      # interactive chat loop
//! ```

mod app;
mod args;
mod chat;
mod console;
mod functions;
mod handler;
mod input;
mod interaction;
mod logging;
mod naming;
mod render;
mod repl;
mod router;

use args::Cli;
use clap::Parser;
use console::CliConsole;
use parley_core::ParleyError;
use std::io::IsTerminal;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    if let Err(e) = router::route(cli).await {
        let console = CliConsole::new(false);
        let message = e.to_string();
        console.error(&message);
        if let Some(hint) = e.suggestion().filter(|hint| !message.contains(*hint)) {
            console.warn(hint);
        }
        let code = match e {
            ParleyError::Usage { .. } | ParleyError::InvalidInput { .. } => 2,
            ParleyError::Cancelled => 130,
            _ => 1,
        };
        std::process::exit(code);
    }
}
