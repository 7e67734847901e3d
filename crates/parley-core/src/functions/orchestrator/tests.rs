use super::*;
use crate::functions::{FunctionError, MockFunctionRegistry};
use crate::llm::MessageRole;
use futures::stream;
use serde_json::json;
use std::sync::Mutex;

struct ScriptedTransport {
    turns: Mutex<VecDeque<Vec<StreamEvent>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    fn new(turns: Vec<Vec<StreamEvent>>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
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
        Ok(Box::pin(stream::iter(turn.into_iter().map(Ok))))
    }
}

fn text(t: &str) -> StreamEvent {
    StreamEvent::Text(t.to_string())
}

fn call_piece(name: Option<&str>, arguments: &str) -> StreamEvent {
    StreamEvent::FunctionCall {
        name: name.map(str::to_string),
        arguments: arguments.to_string(),
    }
}

fn lookup_registry(times: usize) -> Arc<dyn FunctionRegistry> {
    let mut registry = MockFunctionRegistry::new();
    registry
        .expect_invoke()
        .withf(|name, args| name == "lookup" && args.get("city") == Some(&json!("Paris")))
        .times(times)
        .returning(|_, _| Ok("22C and sunny".to_string()));
    Arc::new(registry)
}

fn request() -> CompletionRequest {
    CompletionRequest::new("m", vec![Message::user("Weather in Paris?")])
}

async fn run(
    orchestrator: &FunctionCallOrchestrator<ScriptedTransport>,
) -> Vec<ParleyResult<Fragment>> {
    orchestrator
        .complete(request())
        .await
        .unwrap()
        .collect()
        .await
}

#[tokio::test]
async fn test_plain_text_passes_through() {
    let transport = ScriptedTransport::new(vec![vec![text("Hel"), text("lo")]]);
    let orchestrator =
        FunctionCallOrchestrator::new(Arc::clone(&transport), OrchestratorOptions::default());

    let fragments: Vec<Fragment> = run(&orchestrator)
        .await
        .into_iter()
        .map(|f| f.unwrap())
        .collect();
    assert_eq!(
        fragments,
        vec![
            Fragment::Text("Hel".to_string()),
            Fragment::Text("lo".to_string())
        ]
    );
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_function_call_round_trip() {
    let transport = ScriptedTransport::new(vec![
        vec![
            call_piece(Some("lookup"), "{\"city\""),
            call_piece(None, ": \"Paris\"}"),
        ],
        vec![text("It is 22C.")],
    ]);
    let orchestrator =
        FunctionCallOrchestrator::new(Arc::clone(&transport), OrchestratorOptions::default())
            .with_registry(lookup_registry(1));

    let fragments: Vec<Fragment> = run(&orchestrator)
        .await
        .into_iter()
        .map(|f| f.unwrap())
        .collect();

    assert_eq!(
        fragments,
        vec![
            Fragment::Message(Message::function_call("lookup", "{\"city\": \"Paris\"}")),
            Fragment::Notice("\n".to_string()),
            Fragment::Notice("> @FunctionCall `lookup(city=\"Paris\")` \n\n".to_string()),
            Fragment::Message(Message::function_result("lookup", "22C and sunny")),
            Fragment::Text("It is 22C.".to_string()),
        ]
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let resent = &requests[1].messages;
    assert_eq!(resent.len(), 3);
    assert_eq!(resent[1].role, MessageRole::Assistant);
    assert_eq!(resent[1].function_call.as_ref().unwrap().name, "lookup");
    assert_eq!(resent[2].role, MessageRole::Function);
    assert_eq!(resent[2].content, "22C and sunny");
}

#[tokio::test]
async fn test_show_output_emits_fenced_result() {
    let transport = ScriptedTransport::new(vec![
        vec![call_piece(Some("lookup"), r#"{"city": "Paris"}"#)],
        vec![text("done")],
    ]);
    let options = OrchestratorOptions {
        show_output: true,
        ..OrchestratorOptions::default()
    };
    let orchestrator = FunctionCallOrchestrator::new(transport, options)
        .with_registry(lookup_registry(1));

    let notices: Vec<String> = run(&orchestrator)
        .await
        .into_iter()
        .filter_map(|f| match f.unwrap() {
            Fragment::Notice(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(notices.last().unwrap(), "```text\n22C and sunny\n```\n");
}

#[tokio::test]
async fn test_invocation_failure_aborts() {
    let transport = ScriptedTransport::new(vec![
        vec![call_piece(Some("lookup"), r#"{"city": "Paris"}"#)],
        vec![text("never sent")],
    ]);
    let mut registry = MockFunctionRegistry::new();
    registry
        .expect_invoke()
        .returning(|_, _| Err(FunctionError::ExecutionFailed("service down".to_string())));
    let orchestrator =
        FunctionCallOrchestrator::new(Arc::clone(&transport), OrchestratorOptions::default())
            .with_registry(Arc::new(registry));

    let fragments = run(&orchestrator).await;
    assert_eq!(fragments.len(), 1);
    let err = fragments[0].as_ref().unwrap_err();
    assert_eq!(err.error_code(), "PARLEY_FUNCTION");
    assert!(err.to_string().contains("service down"));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_depth_limit_stops_runaway_calls() {
    let looping = || vec![call_piece(Some("lookup"), r#"{"city": "Paris"}"#)];
    let transport = ScriptedTransport::new(vec![looping(), looping(), looping()]);
    let options = OrchestratorOptions {
        max_depth: 2,
        show_output: false,
    };
    let orchestrator = FunctionCallOrchestrator::new(Arc::clone(&transport), options)
        .with_registry(lookup_registry(2));

    let fragments = run(&orchestrator).await;
    let err = fragments.last().unwrap().as_ref().unwrap_err();
    assert!(err.to_string().contains("limit of 2 function calls"));
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_call_without_registry_is_an_error() {
    let transport = ScriptedTransport::new(vec![vec![call_piece(Some("lookup"), "{}")]]);
    let orchestrator = FunctionCallOrchestrator::new(transport, OrchestratorOptions::default());

    let fragments = run(&orchestrator).await;
    assert_eq!(fragments.len(), 1);
    assert!(
        fragments[0]
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("no functions are registered")
    );
}

#[tokio::test]
async fn test_malformed_arguments_are_an_error() {
    let transport = ScriptedTransport::new(vec![vec![call_piece(Some("lookup"), "{\"city\":")]]);
    let orchestrator = FunctionCallOrchestrator::new(transport, OrchestratorOptions::default())
        .with_registry(lookup_registry(0));

    let fragments = run(&orchestrator).await;
    assert!(fragments[0].as_ref().unwrap_err().to_string().contains("malformed arguments"));
}

#[test]
fn test_render_call() {
    let mut args = FunctionArguments::new();
    args.insert("city".to_string(), json!("Paris"));
    args.insert("days".to_string(), json!(3));
    assert_eq!(render_call("lookup", &args), "lookup(city=\"Paris\", days=\"3\")");
    assert_eq!(render_call("now", &FunctionArguments::new()), "now()");
}
