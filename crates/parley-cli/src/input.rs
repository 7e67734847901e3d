//! Prompt sources: argument, piped stdin and $EDITOR

use parley_core::{ParleyError, ParleyResult};
use std::io::{IsTerminal, Read};
use tokio::process::Command;
use uuid::Uuid;

/// Text piped on stdin, if stdin is not a terminal
pub fn piped_stdin() -> ParleyResult<Option<String>> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut text = String::new();
    stdin.lock().read_to_string(&mut text)?;
    Ok(Some(text))
}

/// Piped text goes before the prompt argument
pub fn merge_prompt(stdin: Option<String>, prompt: Option<String>) -> String {
    let prompt = prompt.unwrap_or_default();
    match stdin {
        Some(stdin) if prompt.is_empty() => stdin,
        Some(stdin) => format!("{}\n\n{}", stdin, prompt),
        None => prompt,
    }
}

/// Let the user write the prompt in `$EDITOR`
pub async fn edited_prompt() -> ParleyResult<String> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    let mut words = editor.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| ParleyError::invalid_field("EDITOR", "empty editor command"))?;

    let path = std::env::temp_dir().join(format!("parley-prompt-{}.txt", Uuid::new_v4()));
    tokio::fs::write(&path, b"").await?;

    let status = Command::new(program).args(words).arg(&path).status().await;
    let content = tokio::fs::read_to_string(&path).await;
    let _ = tokio::fs::remove_file(&path).await;

    let status = status.map_err(|e| ParleyError::io(format!("Failed to run {}: {}", editor, e)))?;
    if !status.success() {
        return Err(ParleyError::invalid_input(format!(
            "{} exited with {}",
            editor, status
        )));
    }
    let content = content?;
    if content.trim().is_empty() {
        return Err(ParleyError::invalid_input(
            "Couldn't get a valid prompt from $EDITOR",
        ));
    }
    Ok(content)
}
