//! File-backed conversation store

use super::retention::apply_retention;
use crate::error::{ParleyError, ParleyResult};
use crate::fs_util::{is_hidden, write_atomic};
use crate::llm::Message;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Name of the file holding the last used chat id
pub const LAST_CHAT_FILE: &str = ".last_chat_id";

/// Check that a chat id can be used as a file name
pub fn validate_chat_id(id: &str) -> ParleyResult<()> {
    if id.trim().is_empty() {
        return Err(ParleyError::invalid_field("chat_id", "chat id must not be empty"));
    }
    if is_hidden(id) || id.contains('/') || id.contains('\\') || id.contains('\0') {
        return Err(ParleyError::invalid_field(
            "chat_id",
            format!("chat id {:?} is not a valid file name", id),
        ));
    }
    Ok(())
}

/// One JSON file per chat in a single directory.
///
/// Writes replace whole files. Concurrent writers to the same chat are not
/// coordinated: the last write wins.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    dir: PathBuf,
    max_messages: usize,
}

impl ConversationStore {
    pub fn new(dir: impl Into<PathBuf>, max_messages: usize) -> Self {
        Self {
            dir: dir.into(),
            max_messages,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a chat id
    pub fn chat_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    fn pointer_path(&self) -> PathBuf {
        self.dir.join(LAST_CHAT_FILE)
    }

    /// Stored history of a chat.
    ///
    /// Missing, unreadable and malformed files read as an empty history.
    pub async fn read(&self, id: &str) -> Vec<Message> {
        if validate_chat_id(id).is_err() {
            return Vec::new();
        }
        let path = self.chat_path(id);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read chat {}: {}", path.display(), e);
                }
                return Vec::new();
            }
        };

        self.touch_pointer(id).await;
        match serde_json::from_slice::<Vec<Message>>(&content) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Ignoring malformed chat file {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    pub async fn exists(&self, id: &str) -> bool {
        validate_chat_id(id).is_ok()
            && tokio::fs::try_exists(self.chat_path(id))
                .await
                .unwrap_or(false)
    }

    /// Replace a chat's history, applying the retention limit
    pub async fn write(&self, id: &str, history: Vec<Message>) -> ParleyResult<()> {
        validate_chat_id(id)?;
        let history = apply_retention(history, self.max_messages);
        let content = serde_json::to_vec_pretty(&history)?;
        write_atomic(&self.chat_path(id), &content)
            .await
            .map_err(|e| ParleyError::storage_with_context(e.to_string(), format!("chat {}", id)))?;
        debug!("Saved chat {} ({} messages)", id, history.len());
        self.touch_pointer(id).await;
        Ok(())
    }

    /// Append a turn to a chat and persist it
    pub async fn append(
        &self,
        id: &str,
        new_messages: &[Message],
        assistant_reply: &str,
    ) -> ParleyResult<()> {
        let mut history = self.read(id).await;
        history.extend_from_slice(new_messages);
        history.push(Message::assistant(assistant_reply));
        self.write(id, history).await
    }

    /// Delete a chat. Deleting a missing chat is not an error.
    pub async fn invalidate(&self, id: &str) -> ParleyResult<()> {
        validate_chat_id(id)?;
        match tokio::fs::remove_file(self.chat_path(id)).await {
            Ok(()) => {
                debug!("Removed chat {}", id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ParleyError::storage(format!(
                "Failed to remove chat {}: {}",
                id, e
            ))),
        }
    }

    /// Move a chat to a new id and return the id actually used.
    ///
    /// Taken ids get a numeric suffix (`-2`, `-3`, ...). A missing chat is not
    /// moved and its id is returned unchanged.
    pub async fn rename(&self, old_id: &str, new_id: &str) -> ParleyResult<String> {
        validate_chat_id(new_id)?;
        if !self.exists(old_id).await {
            return Ok(old_id.to_string());
        }

        let mut target = new_id.to_string();
        let mut suffix = 2;
        while self.exists(&target).await {
            target = format!("{}-{}", new_id, suffix);
            suffix += 1;
        }

        tokio::fs::rename(self.chat_path(old_id), self.chat_path(&target))
            .await
            .map_err(|e| {
                ParleyError::storage(format!("Failed to rename chat {} to {}: {}", old_id, target, e))
            })?;
        debug!("Renamed chat {} to {}", old_id, target);

        if self.get_last().await.as_deref() == Some(old_id) {
            self.set_last(&target).await?;
        }
        Ok(target)
    }

    /// Chat ids, least recently modified first
    pub async fn list(&self) -> ParleyResult<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ParleyError::io_at(&self.dir, e.to_string())),
        };

        let mut chats: Vec<(SystemTime, String)> = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            chats.push((metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH), name));
        }
        chats.sort();
        Ok(chats.into_iter().map(|(_, name)| name).collect())
    }

    /// Most recently modified chat, if any
    pub async fn most_recent(&self) -> ParleyResult<Option<String>> {
        Ok(self.list().await?.pop())
    }

    pub async fn get_last(&self) -> Option<String> {
        match tokio::fs::read_to_string(self.pointer_path()).await {
            Ok(id) => {
                let id = id.trim();
                (!id.is_empty()).then(|| id.to_string())
            }
            Err(_) => None,
        }
    }

    pub async fn set_last(&self, id: &str) -> ParleyResult<()> {
        validate_chat_id(id)?;
        write_atomic(&self.pointer_path(), id.as_bytes()).await
    }

    async fn touch_pointer(&self, id: &str) {
        if let Err(e) = self.set_last(id).await {
            warn!("Failed to update last chat pointer: {}", e);
        }
    }
}
