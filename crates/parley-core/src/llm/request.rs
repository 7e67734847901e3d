//! Completion request

use super::messages::{FunctionSchema, Message};
use serde::{Deserialize, Serialize};

/// Inputs of a single completion call.
///
/// Every serialized field takes part in the response cache key. `caching` and
/// `chat_id` steer the cache and session layers and are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionSchema>>,
    #[serde(skip)]
    pub caching: bool,
    #[serde(skip)]
    pub chat_id: Option<String>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 2048,
            functions: None,
            caching: true,
            chat_id: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionSchema>) -> Self {
        self.functions = if functions.is_empty() {
            None
        } else {
            Some(functions)
        };
        self
    }

    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }
}
