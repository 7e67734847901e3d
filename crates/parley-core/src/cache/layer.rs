//! Caching completion layer

use super::key::CacheKey;
use super::storage::DiskCache;
use crate::completion::{Completion, Fragment, FragmentStream};
use crate::error::ParleyResult;
use crate::llm::CompletionRequest;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

/// Wraps a completion and replays stored fragment sequences for repeated calls.
///
/// On a miss every fragment is copied into a buffer as it is yielded. The buffer
/// is persisted once the inner stream is exhausted; an error, or the consumer
/// dropping the stream early, discards it.
pub struct CachedCompletion<C> {
    inner: Arc<C>,
    storage: Arc<DiskCache>,
}

impl<C> CachedCompletion<C> {
    pub fn new(inner: Arc<C>, storage: Arc<DiskCache>) -> Self {
        Self { inner, storage }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn storage(&self) -> &DiskCache {
        &self.storage
    }
}

#[async_trait]
impl<C: Completion + 'static> Completion for CachedCompletion<C> {
    async fn complete(&self, request: CompletionRequest) -> ParleyResult<FragmentStream> {
        if !request.caching {
            return self.inner.complete(request).await;
        }

        let key = CacheKey::for_request(&request)?;
        if let Some(fragments) = self.storage.get(&key).await {
            tracing::debug!("Response cache hit: {}", key);
            return Ok(Box::pin(futures::stream::iter(
                fragments.into_iter().map(Ok),
            )));
        }

        tracing::debug!("Response cache miss: {}", key);
        let inner = self.inner.complete(request).await?;
        Ok(tee(inner, Arc::clone(&self.storage), key))
    }
}

struct TeeState {
    inner: FragmentStream,
    buffer: Vec<Fragment>,
    storage: Arc<DiskCache>,
    key: CacheKey,
    done: bool,
}

fn tee(inner: FragmentStream, storage: Arc<DiskCache>, key: CacheKey) -> FragmentStream {
    let state = TeeState {
        inner,
        buffer: Vec::new(),
        storage,
        key,
        done: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        match state.inner.next().await {
            Some(Ok(fragment)) => {
                state.buffer.push(fragment.clone());
                Some((Ok(fragment), state))
            }
            Some(Err(e)) => {
                state.buffer.clear();
                state.done = true;
                Some((Err(e), state))
            }
            None => {
                if let Err(e) = state.storage.put(&state.key, &state.buffer).await {
                    tracing::warn!("Failed to persist cached response: {}", e);
                }
                None
            }
        }
    }))
}
