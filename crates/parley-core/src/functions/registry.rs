//! Function registry contract

use crate::llm::FunctionSchema;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Arguments of a function call, as decoded from the model's JSON
pub type FunctionArguments = serde_json::Map<String, serde_json::Value>;

/// Error type for function invocations
#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    /// No function with this name is registered
    #[error("Function not found: {0}")]
    NotFound(String),

    /// The arguments do not match what the function expects
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The function ran and failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves and runs functions requested by the model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FunctionRegistry: Send + Sync {
    /// Schemas advertised to the model
    fn schemas(&self) -> Vec<FunctionSchema>;

    /// Run `name` with `arguments` and return its textual output
    async fn invoke(
        &self,
        name: &str,
        arguments: &FunctionArguments,
    ) -> Result<String, FunctionError>;
}

/// A single callable function
#[async_trait]
pub trait Function: Send + Sync {
    fn schema(&self) -> FunctionSchema;

    async fn call(&self, arguments: &FunctionArguments) -> Result<String, FunctionError>;
}

/// Registry backed by a name-ordered set of [`Function`]s
#[derive(Default, Clone)]
pub struct FunctionSet {
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl FunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function, replacing any previous one with the same name
    pub fn register(&mut self, function: Arc<dyn Function>) {
        let name = function.schema().name;
        self.functions.insert(name, function);
    }

    pub fn with(mut self, function: Arc<dyn Function>) -> Self {
        self.register(function);
        self
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}

#[async_trait]
impl FunctionRegistry for FunctionSet {
    fn schemas(&self) -> Vec<FunctionSchema> {
        self.functions.values().map(|f| f.schema()).collect()
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &FunctionArguments,
    ) -> Result<String, FunctionError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionError::NotFound(name.to_string()))?;
        function.call(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Function for Echo {
        fn schema(&self) -> FunctionSchema {
            FunctionSchema {
                name: "echo".to_string(),
                description: "Echo the text argument".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"],
                }),
            }
        }

        async fn call(&self, arguments: &FunctionArguments) -> Result<String, FunctionError> {
            arguments
                .get("text")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| FunctionError::InvalidArguments("missing text".to_string()))
        }
    }

    #[tokio::test]
    async fn test_function_set_dispatch() {
        let set = FunctionSet::new().with(Arc::new(Echo));
        assert_eq!(set.len(), 1);
        assert_eq!(set.names(), vec!["echo"]);
        assert_eq!(set.schemas()[0].name, "echo");

        let mut args = FunctionArguments::new();
        args.insert("text".to_string(), json!("ping"));
        assert_eq!(set.invoke("echo", &args).await.unwrap(), "ping");

        let err = set.invoke("echo", &FunctionArguments::new()).await.unwrap_err();
        assert!(matches!(err, FunctionError::InvalidArguments(_)));

        let err = set.invoke("missing", &args).await.unwrap_err();
        assert!(matches!(err, FunctionError::NotFound(_)));
    }
}
