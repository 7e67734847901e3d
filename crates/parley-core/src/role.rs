//! System roles and output strategies

use crate::error::{ParleyError, ParleyResult};
use crate::fs_util::write_atomic;
use crate::llm::{Message, MessageRole};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

static ROLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^You are (.+)").expect("valid role name regex"));

/// How a completion's output is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStrategy {
    Default,
    DescribeShell,
    ShellCommand,
    Code,
}

impl OutputStrategy {
    /// Markdown strategies get styled rendering, the others are printed as is
    pub fn is_markdown(self) -> bool {
        matches!(self, OutputStrategy::Default | OutputStrategy::DescribeShell)
    }
}

/// A persona: the system message that opens every chat using it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRole {
    pub name: String,
    pub role: String,
}

impl SystemRole {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }

    /// Content of the system message for this role
    pub fn system_text(&self) -> String {
        format!("You are {}\n{}", self.name, self.role)
    }

    pub fn system_message(&self) -> Message {
        Message::system(self.system_text())
    }

    /// Whether `message` is the opening message of a chat with this role
    pub fn matches(&self, message: &Message) -> bool {
        message.role == MessageRole::System
            && role_name(&message.content).as_deref() == Some(self.name.as_str())
    }

    pub fn strategy(&self) -> OutputStrategy {
        match self.name.as_str() {
            SHELL_ROLE => OutputStrategy::ShellCommand,
            DESCRIBE_SHELL_ROLE => OutputStrategy::DescribeShell,
            CODE_ROLE => OutputStrategy::Code,
            _ => OutputStrategy::Default,
        }
    }
}

/// Name of the role that produced a system message, if recognizable
pub fn role_name(system_text: &str) -> Option<String> {
    let first_line = system_text.lines().next()?;
    ROLE_NAME
        .captures(first_line)
        .map(|c| c[1].trim().to_string())
}

pub const DEFAULT_ROLE: &str = "Parley";
pub const SHELL_ROLE: &str = "Shell Command Generator";
pub const DESCRIBE_SHELL_ROLE: &str = "Shell Command Descriptor";
pub const CODE_ROLE: &str = "Code Generator";

/// Built-in roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRole {
    Default,
    Shell,
    DescribeShell,
    Code,
}

impl DefaultRole {
    pub fn all() -> [DefaultRole; 4] {
        [
            DefaultRole::Default,
            DefaultRole::Shell,
            DefaultRole::DescribeShell,
            DefaultRole::Code,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            DefaultRole::Default => DEFAULT_ROLE,
            DefaultRole::Shell => SHELL_ROLE,
            DefaultRole::DescribeShell => DESCRIBE_SHELL_ROLE,
            DefaultRole::Code => CODE_ROLE,
        }
    }

    /// Pick the built-in role for the selected mode flags
    pub fn from_flags(shell: bool, describe_shell: bool, code: bool) -> Self {
        if shell {
            DefaultRole::Shell
        } else if describe_shell {
            DefaultRole::DescribeShell
        } else if code {
            DefaultRole::Code
        } else {
            DefaultRole::Default
        }
    }

    pub fn role(self, os: &str, shell: &str) -> SystemRole {
        let text = match self {
            DefaultRole::Default => format!(
                "A programming and system administration assistant for {os} with {shell}.\n\
                 Answer concisely, in under 100 words unless asked for detail.\n\
                 Store what the user tells you and use it later in the chat.\n\
                 APPLY MARKDOWN formatting when possible."
            ),
            DefaultRole::Shell => format!(
                "Provide only {shell} commands for {os} without any description.\n\
                 If details are missing, pick the most logical solution.\n\
                 The output must be a valid shell command.\n\
                 Chain multiple steps with && where needed.\n\
                 Output plain text only, without Markdown."
            ),
            DefaultRole::DescribeShell => "Explain the given shell command.\n\
                 Describe each argument and option in a short sentence.\n\
                 Keep the whole description under 80 words.\n\
                 APPLY MARKDOWN formatting when possible."
                .to_string(),
            DefaultRole::Code => "Provide only code as output, without any description.\n\
                 Output plain text only, without Markdown fences.\n\
                 If details are missing, pick the most logical solution.\n\
                 Never ask for more details."
                .to_string(),
        };
        SystemRole::new(self.name(), text)
    }
}

/// Directory of user-defined roles, one JSON file per role
#[derive(Debug, Clone)]
pub struct RoleStore {
    dir: PathBuf,
    os: String,
    shell: String,
}

impl RoleStore {
    pub fn new(dir: impl Into<PathBuf>, os: impl Into<String>, shell: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            os: os.into(),
            shell: shell.into(),
        }
    }

    fn role_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    pub fn default_role(&self, kind: DefaultRole) -> SystemRole {
        kind.role(&self.os, &self.shell)
    }

    /// Look a role up by name: stored roles first, then built-ins
    pub async fn get(&self, name: &str) -> ParleyResult<SystemRole> {
        let path = self.role_path(name);
        match tokio::fs::read(&path).await {
            Ok(content) => serde_json::from_slice(&content).map_err(|e| {
                ParleyError::storage_with_context(
                    format!("Malformed role file: {}", e),
                    path.display().to_string(),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DefaultRole::all()
                .into_iter()
                .find(|kind| kind.name() == name)
                .map(|kind| self.default_role(kind))
                .ok_or_else(|| ParleyError::usage(format!("Role \"{}\" not found", name))),
            Err(e) => Err(ParleyError::io_at(&path, e.to_string())),
        }
    }

    pub async fn create(&self, role: &SystemRole) -> ParleyResult<PathBuf> {
        if role.name.trim().is_empty() || role.name.contains('/') {
            return Err(ParleyError::invalid_field("name", "invalid role name"));
        }
        let path = self.role_path(&role.name);
        write_atomic(&path, &serde_json::to_vec_pretty(role)?).await?;
        Ok(path)
    }

    /// Paths of stored role files
    pub async fn list(&self) -> ParleyResult<Vec<PathBuf>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ParleyError::io_at(&self.dir, e.to_string())),
        };
        let mut paths = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
