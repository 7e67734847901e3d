//! Parley core library
//!
//! Building blocks of the `parley` command-line client:
//!
//! - [`llm`]: message types, response decoding and the HTTP transport
//! - [`functions`]: function registry and the function call loop
//! - [`cache`]: on-disk memoization of complete responses
//! - [`session`]: persistent chats with bounded history
//!
//! Layers compose explicitly, innermost first:
//!
//! ```ignore
//! let transport = Arc::new(HttpTransport::new(&config, &config_path)?);
//! let orchestrator = Arc::new(FunctionCallOrchestrator::new(transport, options));
//! let cached = Arc::new(CachedCompletion::new(orchestrator, Arc::new(disk_cache)));
//! let session = ChatSession::new(cached, Arc::new(conversation_store));
//! let stream = session.complete(request).await?;
//! ```

pub mod cache;
pub mod completion;
pub mod config;
pub mod error;
pub mod functions;
pub mod fs_util;
pub mod llm;
pub mod role;
pub mod session;

pub use cache::{CacheKey, CachedCompletion, DiskCache};
pub use completion::{Completion, Fragment, FragmentStream, collect_text};
pub use config::Config;
pub use error::{ParleyError, ParleyResult};
pub use functions::{
    Function, FunctionArguments, FunctionCallOrchestrator, FunctionError, FunctionRegistry,
    FunctionSet, OrchestratorOptions,
};
pub use llm::{
    ChatTransport, CompletionRequest, EventStream, FunctionSchema, HttpTransport, Message,
    MessageRole, StreamEvent, TransportMode,
};
pub use role::{DefaultRole, OutputStrategy, RoleStore, SystemRole};
pub use session::{ChatSession, ConversationStore};
