//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::{
    CachedCompletion, ChatSession, ChatTransport, Completion, CompletionRequest,
    ConversationStore, DiskCache, EventStream, Fragment, FunctionCallOrchestrator,
    FunctionRegistry, OrchestratorOptions, ParleyError, ParleyResult, StreamEvent,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub type Turn = Vec<ParleyResult<StreamEvent>>;

/// Transport that replays scripted model turns and records every request
pub struct ScriptedTransport {
    turns: Mutex<VecDeque<Turn>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    pub fn new(turns: Vec<Turn>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn sends(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &CompletionRequest) -> ParleyResult<EventStream> {
        self.requests.lock().unwrap().push(request.clone());
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ParleyError::transport("no scripted turn left"))?;
        Ok(Box::pin(futures::stream::iter(turn)))
    }
}

pub fn text_turn(parts: &[&str]) -> Turn {
    parts
        .iter()
        .map(|p| Ok(StreamEvent::Text(p.to_string())))
        .collect()
}

pub fn call_turn(name: &str, arguments: &str) -> Turn {
    vec![Ok(StreamEvent::FunctionCall {
        name: Some(name.to_string()),
        arguments: arguments.to_string(),
    })]
}

pub type Stack = ChatSession<CachedCompletion<FunctionCallOrchestrator<ScriptedTransport>>>;

/// Session over cache over orchestrator over the scripted transport
pub struct Harness {
    pub dir: TempDir,
    pub transport: Arc<ScriptedTransport>,
    pub cache: Arc<DiskCache>,
    pub store: Arc<ConversationStore>,
    pub stack: Stack,
}

impl Harness {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self::build(turns, None, OrchestratorOptions::default(), 100)
    }

    pub fn build(
        turns: Vec<Turn>,
        registry: Option<Arc<dyn FunctionRegistry>>,
        options: OrchestratorOptions,
        max_messages: usize,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(turns);
        let cache = Arc::new(DiskCache::new(dir.path().join("cache"), 10));
        let store = Arc::new(ConversationStore::new(dir.path().join("chats"), max_messages));

        let mut orchestrator = FunctionCallOrchestrator::new(Arc::clone(&transport), options);
        if let Some(registry) = registry {
            orchestrator = orchestrator.with_registry(registry);
        }
        let cached = CachedCompletion::new(Arc::new(orchestrator), Arc::clone(&cache));
        let stack = ChatSession::new(Arc::new(cached), Arc::clone(&store));

        Self {
            dir,
            transport,
            cache,
            store,
            stack,
        }
    }

    pub async fn run(&self, request: CompletionRequest) -> Vec<ParleyResult<Fragment>> {
        self.stack.complete(request).await.unwrap().collect().await
    }

    pub async fn run_ok(&self, request: CompletionRequest) -> Vec<Fragment> {
        self.run(request)
            .await
            .into_iter()
            .map(|f| f.unwrap())
            .collect()
    }
}

/// Concatenated text of the printable fragments
pub fn printed(fragments: &[Fragment]) -> String {
    fragments.iter().filter_map(|f| f.display_text()).collect()
}
