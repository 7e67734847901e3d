//! Application context: configuration and the composed completion layers

use crate::args::Cli;
use crate::console::CliConsole;
use crate::functions::builtin_functions;
use parley_core::config::{default_config_path, load_config};
use parley_core::role::RoleStore;
use parley_core::{
    CachedCompletion, ChatSession, Completion, CompletionRequest, Config, ConversationStore,
    DiskCache, FunctionCallOrchestrator, FunctionRegistry, FunctionSchema, HttpTransport,
    Message, OrchestratorOptions, ParleyResult, TransportMode,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a handler needs, constructed once per invocation
pub struct App {
    pub config: Config,
    pub config_path: PathBuf,
    pub console: CliConsole,
    pub store: Arc<ConversationStore>,
    pub roles: RoleStore,
    pub completion: Arc<dyn Completion>,
    pub functions: Option<Vec<FunctionSchema>>,
    pub streaming: bool,
    pub caching: bool,
}

/// Load the config file and environment, then apply command-line overrides
pub fn load(cli: &Cli) -> ParleyResult<(Config, PathBuf)> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path)?.expanded();

    if let Some(model) = &cli.model {
        config.default_model = model.clone();
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = temperature;
    }
    if let Some(top_p) = cli.top_p {
        config.top_p = top_p;
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.max_tokens = max_tokens;
    }
    if cli.no_md {
        config.prettify_markdown = false;
    }
    if cli.functions {
        config.use_functions = true;
    }
    if cli.no_functions {
        config.use_functions = false;
    }
    config.validate()?;
    Ok((config, config_path))
}

/// Role store for the current platform
pub fn role_store(config: &Config) -> RoleStore {
    RoleStore::new(&config.role_storage_path, os_name(), shell_name())
}

impl App {
    pub fn build(cli: &Cli, config: Config, config_path: PathBuf) -> ParleyResult<Self> {
        let transport = Arc::new(HttpTransport::new(&config, &config_path)?);
        let streaming = transport.mode() == TransportMode::Incremental;

        let options = OrchestratorOptions {
            max_depth: config.max_function_depth,
            show_output: config.show_functions_output,
        };
        let mut orchestrator = FunctionCallOrchestrator::new(transport, options);
        let mut functions = None;
        if config.use_functions {
            let registry = builtin_functions();
            functions = Some(registry.schemas());
            orchestrator = orchestrator.with_registry(Arc::new(registry));
        }

        let cache = Arc::new(DiskCache::new(&config.cache_path, config.cache_length));
        let store = Arc::new(ConversationStore::new(
            &config.chat_cache_path,
            config.chat_cache_length,
        ));
        let cached = CachedCompletion::new(Arc::new(orchestrator), cache);
        let completion: Arc<dyn Completion> =
            Arc::new(ChatSession::new(Arc::new(cached), Arc::clone(&store)));

        Ok(Self {
            roles: role_store(&config),
            console: CliConsole::new(cli.verbose),
            store,
            completion,
            functions,
            streaming,
            caching: !cli.no_cache,
            config,
            config_path,
        })
    }

    /// Request with the configured sampling parameters
    pub fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        let mut request = CompletionRequest::new(&self.config.default_model, messages)
            .with_temperature(self.config.temperature)
            .with_top_p(self.config.top_p)
            .with_max_tokens(self.config.max_tokens)
            .with_caching(self.caching);
        if let Some(functions) = &self.functions {
            request = request.with_functions(functions.clone());
        }
        request
    }
}

pub fn os_name() -> String {
    match std::env::consts::OS {
        "linux" => "Linux".to_string(),
        "macos" => "macOS".to_string(),
        "windows" => "Windows".to_string(),
        other => other.to_string(),
    }
}

pub fn shell_name() -> String {
    std::env::var("SHELL")
        .ok()
        .and_then(|shell| {
            std::path::Path::new(&shell)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| {
            if cfg!(windows) {
                "powershell".to_string()
            } else {
                "sh".to_string()
            }
        })
}
