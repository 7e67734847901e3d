//! Response cache behaviour through the composed layers

mod common;

use common::{Harness, printed, text_turn};
use futures::StreamExt;
use parley_core::{Completion, CompletionRequest, Message, ParleyError, StreamEvent};

fn request() -> CompletionRequest {
    CompletionRequest::new("llama", vec![Message::user("Say hello")]).with_temperature(0.5)
}

#[tokio::test]
async fn test_second_call_replays_without_transport() {
    let harness = Harness::new(vec![text_turn(&["Hel", "lo", "!"])]);

    let first = harness.run_ok(request()).await;
    let second = harness.run_ok(request()).await;

    assert_eq!(first, second);
    assert_eq!(printed(&second), "Hello!");
    assert_eq!(harness.transport.sends(), 1);
    assert_eq!(harness.cache.statistics().await.unwrap().entries, 1);
}

#[tokio::test]
async fn test_changed_parameter_misses_the_cache() {
    let harness = Harness::new(vec![text_turn(&["first"]), text_turn(&["second"])]);

    harness.run_ok(request()).await;
    let other = harness.run_ok(request().with_temperature(0.6)).await;

    assert_eq!(printed(&other), "second");
    assert_eq!(harness.transport.sends(), 2);
    assert_eq!(harness.cache.statistics().await.unwrap().entries, 2);
}

#[tokio::test]
async fn test_caching_disabled_always_calls_transport() {
    let harness = Harness::new(vec![text_turn(&["one"]), text_turn(&["two"])]);

    harness.run_ok(request().with_caching(false)).await;
    let again = harness.run_ok(request().with_caching(false)).await;

    assert_eq!(printed(&again), "two");
    assert_eq!(harness.transport.sends(), 2);
    assert_eq!(harness.cache.statistics().await.unwrap().entries, 0);
}

#[tokio::test]
async fn test_error_mid_stream_writes_nothing() {
    let failing = vec![
        Ok(StreamEvent::Text("partial".to_string())),
        Err(ParleyError::transport("connection reset")),
    ];
    let harness = Harness::new(vec![failing, text_turn(&["complete"])]);

    let results = harness.run(request()).await;
    assert!(results.last().unwrap().is_err());
    assert_eq!(harness.cache.statistics().await.unwrap().entries, 0);

    let retry = harness.run_ok(request()).await;
    assert_eq!(printed(&retry), "complete");
    assert_eq!(harness.transport.sends(), 2);
}

#[tokio::test]
async fn test_abandoned_stream_writes_nothing() {
    let harness = Harness::new(vec![text_turn(&["a", "b", "c"])]);

    let mut stream = harness.stack.complete(request()).await.unwrap();
    assert!(stream.next().await.is_some());
    drop(stream);

    assert_eq!(harness.cache.statistics().await.unwrap().entries, 0);
}

#[tokio::test]
async fn test_corrupt_entry_falls_back_to_transport() {
    let harness = Harness::new(vec![text_turn(&["fresh"])]);
    let key = parley_core::CacheKey::for_request(&request()).unwrap();
    let path = harness.cache.dir().join(format!("{}.json", key));
    tokio::fs::create_dir_all(harness.cache.dir()).await.unwrap();
    tokio::fs::write(&path, b"not a fragment list").await.unwrap();

    let fragments = harness.run_ok(request()).await;
    assert_eq!(printed(&fragments), "fresh");
    assert_eq!(harness.transport.sends(), 1);
}
