//! Chat id resolution, role checks and chat listing

use crate::console::CliConsole;
use crate::naming::temp_auto_id;
use chrono::{DateTime, Local};
use colored::{Color, Colorize};
use parley_core::role::{DEFAULT_ROLE, role_name};
use parley_core::{
    ConversationStore, Message, MessageRole, ParleyError, ParleyResult, RoleStore, SystemRole,
};

pub const DEFAULT_CHAT: &str = "default";
pub const TEMP_CHAT: &str = "temp";
pub const AUTO_CHAT: &str = "auto";
pub const LAST_CHAT: &str = "last";

/// Which chat a prompt goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTarget {
    pub id: String,
    /// Named after the first exchange
    pub auto_named: bool,
}

/// Work out the chat for a prompt from `--chat` and `--resume`.
///
/// Without either, the prompt goes to a freshly cleared `default` chat.
pub async fn resolve_target(
    store: &ConversationStore,
    console: &CliConsole,
    chat: Option<&str>,
    resume: bool,
) -> ParleyResult<ChatTarget> {
    let explicit = chat.is_some();
    let mut id = match chat {
        Some(LAST_CHAT) => {
            let id = last_chat(store).await?;
            console.notice(&format!("Resuming chat session: {}", id));
            id
        }
        Some(id) => id.to_string(),
        None if resume => match store.most_recent().await? {
            Some(id) => {
                console.notice(&format!("Resuming chat session: {}", id));
                id
            }
            None => {
                console.notice("No previous chat session found. Starting new default session.");
                DEFAULT_CHAT.to_string()
            }
        },
        None => DEFAULT_CHAT.to_string(),
    };

    let auto_named = id == AUTO_CHAT;
    if auto_named {
        id = temp_auto_id();
    }
    if id == DEFAULT_CHAT && !explicit && !resume {
        store.invalidate(&id).await?;
    }
    Ok(ChatTarget { id, auto_named })
}

/// Id behind the last chat pointer
pub async fn last_chat(store: &ConversationStore) -> ParleyResult<String> {
    store
        .get_last()
        .await
        .ok_or_else(|| ParleyError::usage("No previous chat session found."))
}

/// Make `id` the current chat, discarding `temp` when leaving it.
///
/// `previous` is the pointer as it was before this invocation touched any chat.
pub async fn enter_chat(
    store: &ConversationStore,
    previous: Option<&str>,
    id: &str,
) -> ParleyResult<()> {
    if id != TEMP_CHAT && previous == Some(TEMP_CHAT) {
        store.invalidate(TEMP_CHAT).await?;
    }
    store.set_last(id).await
}

/// Role to continue `id` with.
///
/// A chat keeps the role it was started with: the default role adopts it,
/// any other role must match.
pub async fn chat_role(
    store: &ConversationStore,
    roles: &RoleStore,
    id: &str,
    role: SystemRole,
) -> ParleyResult<SystemRole> {
    let history = store.read(id).await;
    let Some(first) = history.first() else {
        return Ok(role);
    };
    let Some(started_as) = role_name(&first.content) else {
        return Err(ParleyError::usage(format!(
            "Could not determine chat role of \"{}\"",
            id
        )));
    };
    if role.name == DEFAULT_ROLE {
        return roles.get(&started_as).await;
    }
    if !role.matches(first) {
        return Err(ParleyError::usage(format!(
            "Cant change chat role to \"{}\" since it was initiated as \"{}\" chat.",
            role.name, started_as
        )));
    }
    Ok(role)
}

/// Messages for the next turn of `id`.
///
/// A chat whose stored history is empty or unreadable starts over with the
/// role's system message.
pub async fn chat_turn(
    store: &ConversationStore,
    id: &str,
    role: &SystemRole,
    prompt: &str,
) -> Vec<Message> {
    let initiated = !store.read(id).await.is_empty();
    turn_messages(initiated, role, prompt)
}

/// Messages for a new turn: the system message only opens a chat
pub fn turn_messages(initiated: bool, role: &SystemRole, prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if !initiated {
        messages.push(role.system_message());
    }
    messages.push(Message::user(prompt));
    messages
}

/// Print every message of a chat as `role: content`
pub async fn show_chat(store: &ConversationStore, id: &str, color: &str) -> ParleyResult<()> {
    let id = if id == LAST_CHAT {
        last_chat(store).await?
    } else {
        id.to_string()
    };
    let messages = store.read(&id).await;
    println!("{}", format!("[ {} ]", id).cyan().bold());
    if messages.is_empty() {
        println!("{}", "No messages in this chat session.".yellow());
        return Ok(());
    }
    let color: Option<Color> = color.parse().ok();
    for message in &messages {
        let line = format!("{}: {}", message.role, message.content);
        let line = match (message.role, color) {
            (MessageRole::User, _) => line.cyan(),
            (MessageRole::System, _) => line.green(),
            (_, Some(color)) => line.color(color),
            (_, None) => line.normal(),
        };
        println!("{}", line);
    }
    Ok(())
}

/// Stored chats with their last modification time, oldest first
pub async fn chat_listing(store: &ConversationStore) -> ParleyResult<Vec<(String, String)>> {
    let mut rows = Vec::new();
    for id in store.list().await? {
        let modified = tokio::fs::metadata(store.chat_path(&id))
            .await
            .and_then(|m| m.modified())
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        rows.push((id, modified));
    }
    Ok(rows)
}

pub async fn list_chats(store: &ConversationStore) -> ParleyResult<()> {
    let rows = chat_listing(store).await?;
    if rows.is_empty() {
        println!("{}", "No chat sessions found.".yellow());
        return Ok(());
    }
    println!(
        "{}",
        format!("Available Chat Sessions ({})", rows.len()).cyan().bold()
    );
    let width = rows.iter().map(|(id, _)| id.len()).max().unwrap_or(0);
    for (id, modified) in rows {
        println!("{}  {}", format!("{:<width$}", id, width = width).green(), modified.dimmed());
    }
    Ok(())
}
