//! CLI argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "parley")]
#[command(about = "Parley - ask a hosted LLM from the command line")]
#[command(
    long_about = r#"Parley - ask a hosted LLM from the command line

USAGE:
  parley "question"                 # one-shot answer
  echo "logs" | parley "summarize"  # piped input is prepended to the prompt
  parley --chat <id> "question"     # persistent chat (ids: auto, last, temp, or any name)
  parley --resume "follow-up"       # continue the most recently modified chat
  parley --repl <id>                # interactive chat loop
  parley -s "task"                  # shell command, then [E]xecute/[M]odify/[D]escribe/[A]bort"#
)]
#[command(version)]
pub struct Cli {
    /// The prompt to generate a completion for
    pub prompt: Option<String>,

    /// Model to use
    #[arg(long)]
    pub model: Option<String>,

    /// Randomness of the output (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling probability mass (0.0 - 1.0)
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Max tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Path to the configuration file
    #[arg(long, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print output without markdown styling
    #[arg(long)]
    pub no_md: bool,

    /// Generate and optionally execute a shell command
    #[arg(short = 's', long, conflicts_with_all = ["describe_shell", "code"])]
    pub shell: bool,

    /// Describe a shell command
    #[arg(short = 'd', long, conflicts_with = "code")]
    pub describe_shell: bool,

    /// Generate only code
    #[arg(short = 'c', long)]
    pub code: bool,

    /// Skip the execute prompt after a shell command
    #[arg(long)]
    pub no_interaction: bool,

    /// Let the model call registered functions
    #[arg(long, conflicts_with = "no_functions")]
    pub functions: bool,

    /// Never let the model call functions
    #[arg(long)]
    pub no_functions: bool,

    /// Write the prompt in $EDITOR
    #[arg(long)]
    pub editor: bool,

    /// Bypass the response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Follow conversation with this chat id
    #[arg(long, value_name = "ID", conflicts_with_all = ["resume", "repl"])]
    pub chat: Option<String>,

    /// Continue the most recently modified chat
    #[arg(short = 'r', long, conflicts_with = "repl")]
    pub resume: bool,

    /// Start an interactive loop over this chat id
    #[arg(long, value_name = "ID")]
    pub repl: Option<String>,

    /// Print all messages of a chat
    #[arg(long, value_name = "ID")]
    pub show_chat: Option<String>,

    /// List stored chats
    #[arg(short = 'l', long)]
    pub list_chats: bool,

    /// System role to use
    #[arg(long, conflicts_with_all = ["shell", "describe_shell", "code"])]
    pub role: Option<String>,

    /// Create a role with this name
    #[arg(long, value_name = "NAME")]
    pub create_role: Option<String>,

    /// Print a role
    #[arg(long, value_name = "NAME")]
    pub show_role: Option<String>,

    /// List stored roles
    #[arg(long)]
    pub list_roles: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Whether any mode flag or explicit role was given
    pub fn explicit_role(&self) -> bool {
        self.shell || self.describe_shell || self.code || self.role.is_some()
    }

    /// Whether a single-shot mode (shell, describe, code) was requested
    pub fn single_shot_mode(&self) -> bool {
        self.shell || self.describe_shell || self.code
    }
}
