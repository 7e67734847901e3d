//! Completion API types, stream decoding and HTTP transport

pub mod messages;
pub mod request;
pub mod stream_decoder;
pub mod transport;

pub use messages::{FunctionCall, FunctionSchema, Message, MessageRole};
pub use request::CompletionRequest;
pub use stream_decoder::{
    EventStream, LineDecoder, StreamEvent, decode_buffered, decode_incremental,
};
pub use transport::{ChatTransport, HttpTransport, TransportMode};
