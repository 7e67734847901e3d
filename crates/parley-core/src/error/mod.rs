//! Error handling for Parley
//!
//! Every fallible operation in the core returns [`ParleyResult`]. Transport,
//! decode and function invocation failures are surfaced to the caller; corrupt
//! cache entries and chat files are absorbed where they are read.

mod constructors;
mod conversions;
mod types;

pub use types::{OptionExt, ParleyError, ParleyResult, ResultExt};
