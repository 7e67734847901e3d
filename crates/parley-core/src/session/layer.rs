//! Chat session completion layer

use super::store::ConversationStore;
use crate::completion::{Completion, Fragment, FragmentStream};
use crate::error::ParleyResult;
use crate::llm::{CompletionRequest, Message};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

/// Wraps a completion with chat history.
///
/// Requests carrying a `chat_id` are sent with the chat's stored history in
/// front of the new messages. Once the inner stream is exhausted the new
/// messages, any messages produced along the way (function calls and their
/// results) and the accumulated reply are appended to the chat. A failed or
/// abandoned stream persists nothing. Requests without a `chat_id` pass through.
pub struct ChatSession<C> {
    inner: Arc<C>,
    store: Arc<ConversationStore>,
}

impl<C> ChatSession<C> {
    pub fn new(inner: Arc<C>, store: Arc<ConversationStore>) -> Self {
        Self { inner, store }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }
}

#[async_trait]
impl<C: Completion + 'static> Completion for ChatSession<C> {
    async fn complete(&self, mut request: CompletionRequest) -> ParleyResult<FragmentStream> {
        let Some(chat_id) = request.chat_id.take() else {
            return self.inner.complete(request).await;
        };
        if request.messages.is_empty() {
            return Ok(Box::pin(futures::stream::empty()));
        }

        let turn = std::mem::take(&mut request.messages);
        let mut history = self.store.read(&chat_id).await;
        tracing::debug!(
            "Chat {}: {} stored messages, {} new",
            chat_id,
            history.len(),
            turn.len()
        );
        history.extend(turn.iter().cloned());
        request.messages = history;

        let inner = self.inner.complete(request).await?;
        let state = SessionState {
            inner,
            store: Arc::clone(&self.store),
            chat_id,
            turn,
            reply: String::new(),
            done: false,
        };
        Ok(record(state))
    }
}

struct SessionState {
    inner: FragmentStream,
    store: Arc<ConversationStore>,
    chat_id: String,
    /// New messages of this turn, extended by messages from the inner stream
    turn: Vec<Message>,
    reply: String,
    done: bool,
}

fn record(state: SessionState) -> FragmentStream {
    Box::pin(futures::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        match state.inner.next().await {
            Some(Ok(fragment)) => {
                match &fragment {
                    Fragment::Text(text) => state.reply.push_str(text),
                    Fragment::Message(message) => state.turn.push(message.clone()),
                    Fragment::Notice(_) => {}
                }
                Some((Ok(fragment), state))
            }
            Some(Err(e)) => {
                state.done = true;
                Some((Err(e), state))
            }
            None => {
                state.done = true;
                match state
                    .store
                    .append(&state.chat_id, &state.turn, &state.reply)
                    .await
                {
                    Ok(()) => None,
                    Err(e) => Some((Err(e), state)),
                }
            }
        }
    }))
}
