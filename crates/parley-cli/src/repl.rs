//! Interactive chat loop

use crate::app::App;
use crate::chat::{TEMP_CHAT, chat_role, chat_turn, enter_chat, show_chat};
use crate::handler::run_completion;
use crate::interaction::run_command;
use parley_core::{OutputStrategy, ParleyError, ParleyResult, SystemRole};
use std::fs::File;
use std::io::{BufRead, BufReader, IsTerminal, Write};

const MULTILINE: &str = "\"\"\"";
const EXIT: &str = "exit()";

/// What a line of REPL input amounts to
#[derive(Debug, PartialEq, Eq)]
pub enum ReplLine {
    Prompt(String),
    Exit,
    /// Nothing to send yet
    Pending,
}

/// Collects `"""`-delimited multi-line prompts
#[derive(Debug, Default)]
pub struct LineCollector {
    multiline: Option<Vec<String>>,
}

impl LineCollector {
    pub fn in_multiline(&self) -> bool {
        self.multiline.is_some()
    }

    pub fn feed(&mut self, line: &str) -> ReplLine {
        let trimmed = line.trim();
        if let Some(lines) = self.multiline.as_mut() {
            if trimmed == MULTILINE {
                let lines = self.multiline.take().unwrap_or_default();
                return ReplLine::Prompt(lines.join("\n"));
            }
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
            return ReplLine::Pending;
        }
        match trimmed {
            EXIT => ReplLine::Exit,
            MULTILINE => {
                self.multiline = Some(Vec::new());
                ReplLine::Pending
            }
            "" => ReplLine::Pending,
            _ => ReplLine::Prompt(trimmed.to_string()),
        }
    }
}

type Reader = Box<dyn BufRead + Send>;

/// The terminal, even when stdin carried the initial prompt
fn terminal_reader() -> Reader {
    if !std::io::stdin().is_terminal() {
        if let Ok(tty) = File::open("/dev/tty") {
            return Box::new(BufReader::new(tty));
        }
    }
    Box::new(BufReader::new(std::io::stdin()))
}

/// Read a line off the runtime threads; `None` on EOF or Ctrl-C
async fn read_line(reader: Reader) -> ParleyResult<Option<(Reader, String)>> {
    let read = tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        Ok::<_, std::io::Error>((n > 0).then_some((reader, line)))
    });
    tokio::select! {
        _ = tokio::signal::ctrl_c() => Ok(None),
        joined = read => joined
            .map_err(|e| ParleyError::other(format!("Input task failed: {}", e)))?
            .map_err(ParleyError::from),
    }
}

pub async fn run_repl(
    app: &App,
    id: &str,
    role: SystemRole,
    mut init_prompt: String,
) -> ParleyResult<()> {
    if id == TEMP_CHAT {
        app.store.invalidate(TEMP_CHAT).await?;
    }
    let previous = app.store.get_last().await;
    let role = chat_role(&app.store, &app.roles, id, role).await?;
    enter_chat(&app.store, previous.as_deref(), id).await?;
    let strategy = role.strategy();

    if app.store.exists(id).await {
        show_chat(&app.store, id, &app.config.default_color).await?;
    }
    app.console
        .notice("Entering REPL mode, press Ctrl+C to exit. Type \"\"\" for multi-line input.");
    if strategy == OutputStrategy::ShellCommand {
        app.console.notice("Type \"e\" to execute the last command.");
    }

    let mut reader = terminal_reader();
    let mut collector = LineCollector::default();
    let mut last_answer = String::new();

    loop {
        print!("{}", if collector.in_multiline() { "... " } else { ">>> " });
        std::io::stdout().flush()?;

        let Some((next, line)) = read_line(reader).await? else {
            println!();
            return Ok(());
        };
        reader = next;

        let prompt = match collector.feed(&line) {
            ReplLine::Exit => return Ok(()),
            ReplLine::Pending => continue,
            ReplLine::Prompt(prompt) => prompt,
        };

        if strategy == OutputStrategy::ShellCommand && prompt == "e" && !last_answer.is_empty() {
            run_command(last_answer.trim()).await?;
            continue;
        }

        let prompt = if init_prompt.is_empty() {
            prompt
        } else {
            format!("{}\n\n{}", std::mem::take(&mut init_prompt), prompt)
        };
        let messages = chat_turn(&app.store, id, &role, &prompt).await;
        let request = app.request(messages).with_chat_id(id);
        match run_completion(app, request, strategy).await {
            Ok(answer) => last_answer = answer,
            Err(ParleyError::Cancelled) => println!(),
            Err(e) => return Err(e),
        }
    }
}
