//! The completion interface shared by every layer
//!
//! A layer takes a [`CompletionRequest`] and returns a lazy [`FragmentStream`].
//! The HTTP-backed function call orchestrator is the innermost layer, the
//! response cache wraps it and the chat session wraps the cache.

use crate::error::ParleyResult;
use crate::llm::{CompletionRequest, Message};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

/// One item of completion output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Fragment {
    /// Model-generated text
    Text(String),
    /// Text shown to the user that the model did not generate, such as a
    /// function call banner
    Notice(String),
    /// A message appended to the running history while producing the output
    Message(Message),
}

impl Fragment {
    /// Text to print for this fragment, if any
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(text) | Fragment::Notice(text) => Some(text),
            Fragment::Message(_) => None,
        }
    }
}

/// Lazy sequence of completion output
pub type FragmentStream = Pin<Box<dyn Stream<Item = ParleyResult<Fragment>> + Send>>;

/// Anything that turns a request into a fragment stream
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> ParleyResult<FragmentStream>;
}

#[async_trait]
impl<C: Completion + ?Sized> Completion for Arc<C> {
    async fn complete(&self, request: CompletionRequest) -> ParleyResult<FragmentStream> {
        (**self).complete(request).await
    }
}

/// Drain a stream and return the model text it produced
pub async fn collect_text(mut stream: FragmentStream) -> ParleyResult<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        if let Fragment::Text(t) = fragment? {
            text.push_str(&t);
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_text_skips_notices_and_messages() {
        let stream: FragmentStream = Box::pin(futures::stream::iter(vec![
            Ok(Fragment::Text("Hello ".to_string())),
            Ok(Fragment::Notice("> banner\n".to_string())),
            Ok(Fragment::Message(Message::assistant(""))),
            Ok(Fragment::Text("world".to_string())),
        ]));
        assert_eq!(collect_text(stream).await.unwrap(), "Hello world");
    }

    #[test]
    fn test_fragment_serialization_is_tagged() {
        let json = serde_json::to_string(&Fragment::Text("hi".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"text","value":"hi"}"#);
        assert_eq!(Fragment::Notice("n".to_string()).display_text(), Some("n"));
        assert_eq!(Fragment::Message(Message::user("u")).display_text(), None);
    }
}
