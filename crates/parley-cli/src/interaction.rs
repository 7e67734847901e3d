//! Execute / modify / describe prompt for generated shell commands

use crate::app::App;
use crate::functions::shell;
use crate::handler::run_completion;
use dialoguer::{Input, theme::ColorfulTheme};
use parley_core::{DefaultRole, Message, ParleyError, ParleyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Execute,
    Modify,
    Describe,
    Abort,
}

impl ShellAction {
    /// `y` is accepted as execute
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "e" | "y" => Some(ShellAction::Execute),
            "m" => Some(ShellAction::Modify),
            "d" => Some(ShellAction::Describe),
            "a" => Some(ShellAction::Abort),
            _ => None,
        }
    }
}

fn prompt_error(e: dialoguer::Error) -> ParleyError {
    ParleyError::io(format!("Failed to read answer: {}", e))
}

fn ask(default_execute: bool) -> ParleyResult<ShellAction> {
    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("[E]xecute, [M]odify, [D]escribe, [A]bort")
        .default(if default_execute { "e" } else { "a" }.to_string())
        .show_default(false)
        .validate_with(|input: &String| -> Result<(), &str> {
            ShellAction::parse(input)
                .map(|_| ())
                .ok_or("Choose one of e, m, d, a")
        })
        .interact_text()
        .map_err(prompt_error)?;
    ShellAction::parse(&answer).ok_or_else(|| ParleyError::invalid_input("unknown choice"))
}

/// Run `command` in the user's shell with inherited stdio
pub async fn run_command(command: &str) -> ParleyResult<()> {
    let status = shell(command).status().await?;
    if !status.success() {
        tracing::debug!("Command exited with {}", status);
    }
    Ok(())
}

/// Offer the generated command until the user executes or aborts
pub async fn shell_loop(app: &App, mut command: String) -> ParleyResult<()> {
    loop {
        match ask(app.config.default_execute_shell_cmd)? {
            ShellAction::Execute => {
                run_command(command.trim()).await?;
                return Ok(());
            }
            ShellAction::Modify => {
                command = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("")
                    .with_initial_text(command.trim())
                    .interact_text()
                    .map_err(prompt_error)?;
            }
            ShellAction::Describe => {
                let role = app.roles.default_role(DefaultRole::DescribeShell);
                let request = app.request(vec![role.system_message(), Message::user(&command)]);
                run_completion(app, request, role.strategy()).await?;
            }
            ShellAction::Abort => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(ShellAction::parse("e"), Some(ShellAction::Execute));
        assert_eq!(ShellAction::parse("Y"), Some(ShellAction::Execute));
        assert_eq!(ShellAction::parse(" m "), Some(ShellAction::Modify));
        assert_eq!(ShellAction::parse("D"), Some(ShellAction::Describe));
        assert_eq!(ShellAction::parse("a"), Some(ShellAction::Abort));
        assert_eq!(ShellAction::parse("x"), None);
        assert_eq!(ShellAction::parse(""), None);
    }
}
