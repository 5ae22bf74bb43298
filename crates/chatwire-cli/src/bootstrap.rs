//! CLI bootstrap - the composition root.
//!
//! The only place where the HTTP client, the store and the engine services
//! are wired together. Handlers receive the composed `CliContext`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chatwire_core::settings::SessionSettings;
use chatwire_core::{
    ConversationApi, ConversationService, ErrorNotifier, GenerationApi, SessionController, Store,
};
use chatwire_http::{ClientConfig, DefaultChatClient};

use crate::notifier::TerminalNotifier;
use crate::parser::Cli;

/// Bootstrap configuration, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub settings: SessionSettings,
}

impl CliConfig {
    /// Resolve and validate configuration from parsed arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let settings = SessionSettings {
            throttle_ms: cli.throttle_ms,
            ..SessionSettings::with_defaults()
        };
        settings.validate().context("invalid session settings")?;

        Ok(Self {
            base_url: cli.base_url.clone(),
            token: cli.token.clone().filter(|t| !t.trim().is_empty()),
            timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            settings,
        })
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_base_url(&self.base_url)
            .with_optional_token(self.token.clone())
            .with_timeout(self.timeout)
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub store: Arc<Store>,
    pub conversations: ConversationService,
    pub sessions: SessionController,
}

/// Wire the HTTP client into the engine services.
pub fn bootstrap(config: &CliConfig) -> Result<CliContext> {
    let client = DefaultChatClient::new(&config.client_config())
        .with_context(|| format!("cannot build client for {}", config.base_url))?;
    let client = Arc::new(client);
    tracing::debug!(base_url = %config.base_url, "chat client ready");

    let notifier: Arc<dyn ErrorNotifier> = Arc::new(TerminalNotifier);
    Ok(compose(client.clone(), client, notifier, &config.settings))
}

/// Build the context over arbitrary port implementations.
pub fn compose(
    api: Arc<dyn ConversationApi>,
    generation: Arc<dyn GenerationApi>,
    notifier: Arc<dyn ErrorNotifier>,
    settings: &SessionSettings,
) -> CliContext {
    let store = Arc::new(Store::new());
    CliContext {
        conversations: ConversationService::new(
            Arc::clone(&store),
            api,
            Arc::clone(&notifier),
            settings,
        ),
        sessions: SessionController::new(Arc::clone(&store), generation, notifier, settings),
        store,
    }
}
