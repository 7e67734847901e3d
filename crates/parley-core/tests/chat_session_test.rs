//! Chat persistence and function calls through the composed layers

mod common;

use async_trait::async_trait;
use common::{Harness, call_turn, printed, text_turn};
use parley_core::{
    CompletionRequest, Function, FunctionArguments, FunctionError, FunctionRegistry, FunctionSchema, FunctionSet,
    Message, MessageRole, OrchestratorOptions, ParleyError, StreamEvent,
};
use serde_json::json;
use std::sync::Arc;

struct Lookup;

#[async_trait]
impl Function for Lookup {
    fn schema(&self) -> FunctionSchema {
        FunctionSchema {
            name: "lookup".to_string(),
            description: "Current weather for a city".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"],
            }),
        }
    }

    async fn call(&self, arguments: &FunctionArguments) -> Result<String, FunctionError> {
        match arguments.get("city").and_then(|v| v.as_str()) {
            Some("Paris") => Ok("18C, cloudy".to_string()),
            Some(other) => Err(FunctionError::ExecutionFailed(format!("no data for {}", other))),
            None => Err(FunctionError::InvalidArguments("city is required".to_string())),
        }
    }
}

fn chat_request(chat_id: &str, prompt: &str) -> CompletionRequest {
    CompletionRequest::new("llama", vec![Message::user(prompt)]).with_chat_id(chat_id)
}

fn with_lookup(turns: Vec<common::Turn>) -> Harness {
    let registry: Arc<dyn FunctionRegistry> = Arc::new(FunctionSet::new().with(Arc::new(Lookup)));
    Harness::build(turns, Some(registry), OrchestratorOptions::default(), 100)
}

#[tokio::test]
async fn test_turns_accumulate_in_chat() {
    let harness = Harness::new(vec![text_turn(&["Hi ", "Ann"]), text_turn(&["Ann"])]);

    let mut first = chat_request("intro", "My name is Ann");
    first.messages.insert(0, Message::system("You are Parley\nBe brief."));
    harness.run_ok(first).await;
    let reply = harness.run_ok(chat_request("intro", "What is my name?")).await;
    assert_eq!(printed(&reply), "Ann");

    // the second request carried the stored history
    let sent = &harness.transport.requests()[1].messages;
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[2].content, "Hi Ann");

    let history = harness.store.read("intro").await;
    let roles: Vec<MessageRole> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
        ]
    );
}

#[tokio::test]
async fn test_function_call_round_trip_is_persisted_in_order() {
    let harness = with_lookup(vec![
        call_turn("lookup", r#"{"city": "Paris"}"#),
        text_turn(&["Cloudy, 18C."]),
    ]);

    let fragments = harness.run_ok(chat_request("weather", "Weather in Paris?")).await;
    assert_eq!(
        printed(&fragments),
        "\n> @FunctionCall `lookup(city=\"Paris\")` \n\nCloudy, 18C."
    );

    let history = harness.store.read("weather").await;
    assert_eq!(history.len(), 4);
    assert_eq!(history[0], Message::user("Weather in Paris?"));
    assert_eq!(
        history[1],
        Message::function_call("lookup", r#"{"city": "Paris"}"#)
    );
    assert_eq!(history[2], Message::function_result("lookup", "18C, cloudy"));
    assert_eq!(history[3], Message::assistant("Cloudy, 18C."));
}

#[tokio::test]
async fn test_cached_replay_restores_function_messages() {
    let harness = with_lookup(vec![
        call_turn("lookup", r#"{"city": "Paris"}"#),
        text_turn(&["Cloudy."]),
    ]);

    // same inputs, two different chats: the second is served from the cache
    harness.run_ok(chat_request("one", "Weather in Paris?")).await;
    harness.run_ok(chat_request("two", "Weather in Paris?")).await;

    assert_eq!(harness.transport.sends(), 2);
    assert_eq!(
        harness.store.read("one").await,
        harness.store.read("two").await
    );
}

#[tokio::test]
async fn test_failed_invocation_persists_nothing() {
    let harness = with_lookup(vec![call_turn("lookup", r#"{"city": "Atlantis"}"#)]);

    let results = harness.run(chat_request("weather", "Weather in Atlantis?")).await;
    let err = results.last().unwrap().as_ref().unwrap_err();
    assert_eq!(err.error_code(), "PARLEY_FUNCTION");

    assert!(!harness.store.exists("weather").await);
    assert_eq!(harness.cache.statistics().await.unwrap().entries, 0);
}

#[tokio::test]
async fn test_transport_failure_persists_nothing() {
    let failing = vec![
        Ok(StreamEvent::Text("half a".to_string())),
        Err(ParleyError::transport("connection reset")),
    ];
    let harness = Harness::new(vec![failing]);

    let results = harness.run(chat_request("flaky", "Tell me a story")).await;
    assert!(results.last().unwrap().is_err());
    assert!(harness.store.read("flaky").await.is_empty());
}

#[tokio::test]
async fn test_no_chat_id_is_passthrough() {
    let harness = Harness::new(vec![text_turn(&["stateless"])]);

    let fragments = harness
        .run_ok(CompletionRequest::new("llama", vec![Message::user("hi")]))
        .await;
    assert_eq!(printed(&fragments), "stateless");
    assert!(harness.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_turn_yields_nothing() {
    let harness = Harness::new(vec![]);
    let request = CompletionRequest::new("llama", vec![]).with_chat_id("quiet");
    assert!(harness.run(request).await.is_empty());
    assert_eq!(harness.transport.sends(), 0);
}

#[tokio::test]
async fn test_retention_applies_after_each_turn() {
    let turns = (0..4)
        .map(|i| text_turn(&[format!("answer {}", i).as_str()]))
        .collect();
    let harness = Harness::build(turns, None, OrchestratorOptions::default(), 3);

    let mut first = chat_request("short", "question 0");
    first.messages.insert(0, Message::system("You are Parley\n"));
    harness.run_ok(first).await;
    for i in 1..4 {
        harness
            .run_ok(chat_request("short", &format!("question {}", i)))
            .await;
    }

    let contents: Vec<String> = harness
        .store
        .read("short")
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(
        contents,
        vec!["You are Parley\n", "answer 2", "question 3", "answer 3"]
    );
}
