//! Function call loop
//!
//! ```text
//! AwaitingModelTurn --text--> Done
//! AwaitingModelTurn --function call--> Executing --> AwaitingModelTurn
//! ```
//!
//! Each executed call extends the request's messages with the assistant's call
//! descriptor and the function's result, then the request is sent again.

use super::registry::{FunctionArguments, FunctionRegistry};
use crate::completion::{Completion, Fragment, FragmentStream};
use crate::error::{ParleyError, ParleyResult};
use crate::llm::{ChatTransport, CompletionRequest, EventStream, Message, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// Orchestrator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Max function calls answered within one completion
    pub max_depth: usize,
    /// Emit each function's raw output as a fenced block
    pub show_output: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_depth: 8,
            show_output: false,
        }
    }
}

/// Innermost completion layer: talks to the transport and answers function
/// calls through the registry
pub struct FunctionCallOrchestrator<T> {
    transport: Arc<T>,
    registry: Option<Arc<dyn FunctionRegistry>>,
    options: OrchestratorOptions,
}

impl<T> FunctionCallOrchestrator<T> {
    pub fn new(transport: Arc<T>, options: OrchestratorOptions) -> Self {
        Self {
            transport,
            registry: None,
            options,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn FunctionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

#[async_trait]
impl<T: ChatTransport + 'static> Completion for FunctionCallOrchestrator<T> {
    async fn complete(&self, request: CompletionRequest) -> ParleyResult<FragmentStream> {
        let events = self.transport.send(&request).await?;
        let state = LoopState {
            transport: Arc::clone(&self.transport),
            registry: self.registry.clone(),
            options: self.options,
            request,
            events: Some(events),
            call: None,
            pending: VecDeque::new(),
            depth: 0,
            finished: false,
        };
        Ok(drive(state))
    }
}

#[derive(Debug, Default)]
struct PendingCall {
    name: String,
    arguments: String,
}

struct LoopState<T> {
    transport: Arc<T>,
    registry: Option<Arc<dyn FunctionRegistry>>,
    options: OrchestratorOptions,
    request: CompletionRequest,
    /// Events of the current model turn; `None` between turns
    events: Option<EventStream>,
    call: Option<PendingCall>,
    pending: VecDeque<Fragment>,
    depth: usize,
    finished: bool,
}

fn drive<T: ChatTransport + 'static>(state: LoopState<T>) -> FragmentStream {
    Box::pin(futures::stream::unfold(state, |mut state| async move {
        state.step().await.map(|item| (item, state))
    }))
}

impl<T: ChatTransport> LoopState<T> {
    async fn step(&mut self) -> Option<ParleyResult<Fragment>> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Some(Ok(fragment));
            }
            if self.finished {
                return None;
            }

            let event = match self.events.as_mut() {
                Some(events) => events.next().await,
                None => match self.transport.send(&self.request).await {
                    Ok(events) => {
                        self.events = Some(events);
                        continue;
                    }
                    Err(e) => return Some(self.fail(e)),
                },
            };

            match event {
                Some(Ok(StreamEvent::Text(text))) => return Some(Ok(Fragment::Text(text))),
                Some(Ok(StreamEvent::FunctionCall { name, arguments })) => {
                    let call = self.call.get_or_insert_with(PendingCall::default);
                    if let Some(name) = name {
                        call.name.push_str(&name);
                    }
                    call.arguments.push_str(&arguments);
                }
                Some(Err(e)) => return Some(self.fail(e)),
                None => {
                    self.events = None;
                    let Some(call) = self.call.take() else {
                        self.finished = true;
                        continue;
                    };
                    if let Err(e) = self.execute(call).await {
                        return Some(self.fail(e));
                    }
                }
            }
        }
    }

    fn fail(&mut self, error: ParleyError) -> ParleyResult<Fragment> {
        self.finished = true;
        self.events = None;
        self.pending.clear();
        Err(error)
    }

    async fn execute(&mut self, call: PendingCall) -> ParleyResult<()> {
        if call.name.is_empty() {
            return Err(ParleyError::function(
                "<unnamed>",
                "model requested a function call without a name",
            ));
        }
        if self.depth >= self.options.max_depth {
            return Err(ParleyError::function(
                &call.name,
                format!(
                    "exceeded the limit of {} function calls in one completion",
                    self.options.max_depth
                ),
            ));
        }
        self.depth += 1;

        let registry = self
            .registry
            .clone()
            .ok_or_else(|| ParleyError::function(&call.name, "no functions are registered"))?;
        let arguments = parse_arguments(&call.name, &call.arguments)?;

        let descriptor = Message::function_call(&call.name, &call.arguments);
        self.request.messages.push(descriptor.clone());
        self.pending.push_back(Fragment::Message(descriptor));
        self.pending.push_back(Fragment::Notice("\n".to_string()));
        self.pending.push_back(Fragment::Notice(format!(
            "> @FunctionCall `{}` \n\n",
            render_call(&call.name, &arguments)
        )));

        tracing::debug!("Invoking function {} (depth {})", call.name, self.depth);
        let output = registry
            .invoke(&call.name, &arguments)
            .await
            .map_err(|e| ParleyError::function(&call.name, e.to_string()))?;

        if self.options.show_output {
            self.pending
                .push_back(Fragment::Notice(format!("```text\n{}\n```\n", output)));
        }

        let result = Message::function_result(&call.name, output);
        self.request.messages.push(result.clone());
        self.pending.push_back(Fragment::Message(result));
        Ok(())
    }
}

fn parse_arguments(name: &str, raw: &str) -> ParleyResult<FunctionArguments> {
    if raw.trim().is_empty() {
        return Ok(FunctionArguments::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ParleyError::function(
            name,
            format!("arguments must be a JSON object, got {}", other),
        )),
        Err(e) => Err(ParleyError::function(
            name,
            format!("malformed arguments {:?}: {}", raw, e),
        )),
    }
}

/// Render a call as `name(key="value", ...)`
pub fn render_call(name: &str, arguments: &FunctionArguments) -> String {
    let rendered: Vec<String> = arguments
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}=\"{}\"", key, s),
            other => format!("{}=\"{}\"", key, other),
        })
        .collect();
    format!("{}({})", name, rendered.join(", "))
}

#[cfg(test)]
mod tests;
