//! Command routing logic for CLI

use crate::app::{self, App};
use crate::args::Cli;
use crate::chat::{self, chat_role, chat_turn, enter_chat};
use crate::console::CliConsole;
use crate::handler::run_completion;
use crate::input::{edited_prompt, merge_prompt, piped_stdin};
use crate::interaction::shell_loop;
use crate::naming::generate_chat_name;
use crate::repl::run_repl;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use parley_core::{
    Config, ConversationStore, DefaultRole, Message, OutputStrategy, ParleyError, ParleyResult,
    SystemRole,
};
use std::io::IsTerminal;

/// Route CLI flags to their handlers
pub async fn route(cli: Cli) -> ParleyResult<()> {
    let (config, config_path) = app::load(&cli)?;
    let console = CliConsole::new(cli.verbose);
    console.info(&format!("Using config {}", config_path.display()));

    // Role management
    if let Some(name) = &cli.create_role {
        return create_role(&config, &console, name).await;
    }
    if let Some(name) = &cli.show_role {
        let role = app::role_store(&config).get(name).await?;
        println!("{}", role.system_text());
        return Ok(());
    }
    if cli.list_roles {
        for path in app::role_store(&config).list().await? {
            println!("{}", path.display());
        }
        return Ok(());
    }

    // Chat inspection
    if cli.list_chats || cli.show_chat.is_some() {
        let store = ConversationStore::new(&config.chat_cache_path, config.chat_cache_length);
        return match &cli.show_chat {
            Some(id) => chat::show_chat(&store, id, &config.default_color).await,
            None => chat::list_chats(&store).await,
        };
    }

    let stdin = piped_stdin()?;
    if cli.editor && stdin.is_some() {
        return Err(ParleyError::usage(
            "--editor option cannot be used with stdin input.",
        ));
    }
    let prompt = if cli.editor {
        edited_prompt().await?
    } else {
        merge_prompt(stdin, cli.prompt.clone())
    };

    let app = App::build(&cli, config, config_path)?;
    let role = match &cli.role {
        Some(name) => app.roles.get(name).await?,
        None => app.roles.default_role(DefaultRole::from_flags(
            cli.shell,
            cli.describe_shell,
            cli.code,
        )),
    };

    if let Some(id) = &cli.repl {
        return run_repl(&app, id, role, prompt).await;
    }
    if prompt.trim().is_empty() {
        return Err(ParleyError::usage("A prompt is required."));
    }

    let (answer, strategy) = if cli.chat.is_some() || cli.resume || !cli.single_shot_mode() {
        route_chat(&cli, &app, role, &prompt).await?
    } else {
        let request = app.request(vec![role.system_message(), Message::user(&prompt)]);
        let strategy = role.strategy();
        (run_completion(&app, request, strategy).await?, strategy)
    };

    if strategy == OutputStrategy::ShellCommand
        && app.config.shell_interaction
        && !cli.no_interaction
        && std::io::stdout().is_terminal()
    {
        shell_loop(&app, answer).await?;
    }
    Ok(())
}

/// One turn in a persisted chat
async fn route_chat(
    cli: &Cli,
    app: &App,
    role: SystemRole,
    prompt: &str,
) -> ParleyResult<(String, OutputStrategy)> {
    let target =
        chat::resolve_target(&app.store, &app.console, cli.chat.as_deref(), cli.resume).await?;
    let previous = app.store.get_last().await;
    let role = chat_role(&app.store, &app.roles, &target.id, role).await?;
    enter_chat(&app.store, previous.as_deref(), &target.id).await?;
    tracing::debug!(chat = %target.id, role = %role.name, "chat turn");

    let messages = chat_turn(&app.store, &target.id, &role, prompt).await;
    let request = app.request(messages).with_chat_id(&target.id);
    let answer = run_completion(app, request, role.strategy()).await?;

    if target.auto_named {
        let name = generate_chat_name(app, prompt).await;
        let final_name = app.store.rename(&target.id, &name).await?;
        app.console
            .notice(&format!("Chat session created: {}", final_name));
    }
    Ok((answer, role.strategy()))
}

async fn create_role(config: &Config, console: &CliConsole, name: &str) -> ParleyResult<()> {
    let roles = app::role_store(config);
    let existing = roles.dir().join(format!("{}.json", name));
    if tokio::fs::try_exists(&existing).await.unwrap_or(false) {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Role \"{}\" already exists, overwrite it?", name))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !overwrite {
            console.warn("Role creation cancelled.");
            return Ok(());
        }
    }

    let description: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter role description")
        .interact_text()
        .map_err(|e| ParleyError::io(format!("Failed to read role description: {}", e)))?;
    let path = roles.create(&SystemRole::new(name, description)).await?;
    console.success(&format!("Role created: {}", path.display()));
    Ok(())
}
