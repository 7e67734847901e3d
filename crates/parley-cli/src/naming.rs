//! Names for auto-named chats

use crate::app::App;
use once_cell::sync::Lazy;
use parley_core::{CompletionRequest, Message, ParleyResult, collect_text};
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("valid chat name regex"));
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid dash regex"));

const MAX_NAME_LEN: usize = 50;
const MAX_PROMPT_CHARS: usize = 500;

fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Placeholder id until the chat is named
pub fn temp_auto_id() -> String {
    format!("auto-{}", short_hex())
}

fn fallback_name() -> String {
    format!("chat-{}", short_hex())
}

/// Reduce model output to a file-safe chat name
pub fn sanitize_chat_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let replaced = INVALID_CHARS.replace_all(&lowered, "-");
    let collapsed = DASH_RUNS.replace_all(&replaced, "-");
    let mut name: String = collapsed.trim_matches('-').chars().take(MAX_NAME_LEN).collect();
    let trimmed = name.trim_end_matches('-').len();
    name.truncate(trimmed);
    if name.is_empty() {
        fallback_name()
    } else {
        name
    }
}

fn naming_prompt(prompt: &str) -> String {
    let excerpt: String = prompt.chars().take(MAX_PROMPT_CHARS).collect();
    format!(
        "Based on the following user message, generate a very short descriptive name \
         (2-5 words, max 50 characters) for this chat session. \
         Use only lowercase English letters, numbers, and hyphens. \
         No spaces, no special characters. Output ONLY the name, nothing else.\n\n\
         User message: {}",
        excerpt
    )
}

async fn ask_for_name(app: &App, prompt: &str) -> ParleyResult<String> {
    let request = CompletionRequest::new(
        &app.config.default_model,
        vec![Message::user(naming_prompt(prompt))],
    )
    .with_temperature(0.35)
    .with_max_tokens(100)
    .with_caching(false);
    collect_text(app.completion.complete(request).await?).await
}

/// Ask the model for a chat name, falling back to a random one
pub async fn generate_chat_name(app: &App, prompt: &str) -> String {
    match ask_for_name(app, prompt).await {
        Ok(raw) => sanitize_chat_name(&raw),
        Err(e) => {
            warn!("Chat name generation failed: {}", e);
            fallback_name()
        }
    }
}
