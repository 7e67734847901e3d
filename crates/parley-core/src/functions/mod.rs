//! Callable functions and the function call loop

mod orchestrator;
mod registry;

pub use orchestrator::{FunctionCallOrchestrator, OrchestratorOptions, render_call};
pub use registry::{
    Function, FunctionArguments, FunctionError, FunctionRegistry, FunctionSet,
};

#[cfg(test)]
pub use registry::MockFunctionRegistry;
