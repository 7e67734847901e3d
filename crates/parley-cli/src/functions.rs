//! Functions the model may call when function calling is enabled

use async_trait::async_trait;
use parley_core::{Function, FunctionArguments, FunctionError, FunctionSchema, FunctionSet};
use serde_json::json;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Registry of the built-in functions
pub fn builtin_functions() -> FunctionSet {
    FunctionSet::new().with(Arc::new(ExecuteShellCommand))
}

/// Runs a shell command and reports its exit code and combined output
pub struct ExecuteShellCommand;

#[async_trait]
impl Function for ExecuteShellCommand {
    fn schema(&self) -> FunctionSchema {
        FunctionSchema {
            name: "execute_shell_command".to_string(),
            description: "Executes a shell command and returns the output (result).".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "shell_command": {
                        "type": "string",
                        "description": "Shell command to execute."
                    }
                },
                "required": ["shell_command"]
            }),
        }
    }

    async fn call(&self, arguments: &FunctionArguments) -> Result<String, FunctionError> {
        let command = arguments
            .get("shell_command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                FunctionError::InvalidArguments("shell_command must be a string".to_string())
            })?;

        let output = shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Ok(format!("Exit code: {}, Output:\n{}", code, text.trim_end()))
    }
}

/// `$SHELL -c command`, or the platform default shell
pub fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let program = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        let mut cmd = Command::new(program);
        cmd.arg("-c").arg(command);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::FunctionRegistry;

    fn args(command: &str) -> FunctionArguments {
        let mut arguments = FunctionArguments::new();
        arguments.insert("shell_command".to_string(), json!(command));
        arguments
    }

    #[test]
    fn test_builtin_schemas() {
        let functions = builtin_functions();
        assert_eq!(functions.names(), vec!["execute_shell_command"]);
        let schema = &functions.schemas()[0];
        assert_eq!(schema.parameters["required"][0], "shell_command");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_exit_code_and_output() {
        let output = ExecuteShellCommand.call(&args("echo hello")).await.unwrap();
        assert_eq!(output, "Exit code: 0, Output:\nhello");

        let output = ExecuteShellCommand
            .call(&args("echo oops >&2; exit 3"))
            .await
            .unwrap();
        assert_eq!(output, "Exit code: 3, Output:\noops");
    }

    #[tokio::test]
    async fn test_missing_command_is_invalid() {
        let err = ExecuteShellCommand
            .call(&FunctionArguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionError::InvalidArguments(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_registry_dispatches_by_name() {
        let functions = builtin_functions();
        let output = functions
            .invoke("execute_shell_command", &args("printf ok"))
            .await
            .unwrap();
        assert!(output.ends_with("ok"));
        assert!(matches!(
            functions.invoke("rm_everything", &args("true")).await,
            Err(FunctionError::NotFound(_))
        ));
    }
}
