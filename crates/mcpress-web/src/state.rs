//! Application State
//!
//! Wires the provider registry, tool registry, and orchestrator into one
//! shared handle. [`AppState::from_env`] does the full production wiring;
//! tests assemble the same struct around stub providers.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use mcpress_chat::{ChatOrchestrator, SitePromptSource};
use mcpress_core::access::{AccessGate, AllowAll};
use mcpress_core::config::get_config_opt;
use mcpress_core::options::{FileOptionStore, MemoryOptionStore, OptionStore};
use mcpress_llm::provider::BoxedChatProvider;
use mcpress_llm::registry::ProviderRegistry;
use mcpress_llm::{GeminiProvider, OpenAiProvider, OpenRouterProvider};
use mcpress_tools::registry::ToolRegistry;
use mcpress_tools::site::{CreatePostTool, GetSiteInfoTool, ListPostsTool, SiteConfig, SiteState};

/// Application state shared across all handlers.
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub providers: Arc<ProviderRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub site: Arc<SiteState>,
    pub gate: Arc<dyn AccessGate>,
    pub start_time: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Assemble state around already-built registries.
    pub fn new(
        providers: Arc<ProviderRegistry>,
        tools: Arc<ToolRegistry>,
        site: Arc<SiteState>,
        gate: Arc<dyn AccessGate>,
    ) -> Self {
        let prompt = Arc::new(SitePromptSource::new(site.clone(), tools.clone()));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            providers.clone(),
            tools.clone(),
            prompt,
        ));
        Self {
            orchestrator,
            providers,
            tools,
            site,
            gate,
            start_time: Instant::now(),
        }
    }

    /// Full production wiring from the environment: site identity, the
    /// builtin site tools, the three provider adapters, and an option
    /// store seeded with per-provider credentials.
    pub async fn from_env() -> Self {
        let site = Arc::new(SiteState::new(SiteConfig::from_env()));

        let tools = Arc::new(ToolRegistry::new());
        tools.register(Arc::new(GetSiteInfoTool::new(site.clone()))).await;
        tools.register(Arc::new(ListPostsTool::new(site.clone()))).await;
        tools.register(Arc::new(CreatePostTool::new(site.clone()))).await;
        info!("{} tools registered", tools.len().await);

        let store: Arc<dyn OptionStore> = match get_config_opt("MCPRESS_STATE_DIR") {
            Some(dir) => {
                info!("persisting provider options under {}", dir);
                Arc::new(FileOptionStore::new(dir))
            }
            None => Arc::new(MemoryOptionStore::new()),
        };

        let adapters: Vec<BoxedChatProvider> = vec![
            Arc::new(OpenAiProvider::new()),
            Arc::new(OpenRouterProvider::new()),
            Arc::new(GeminiProvider::new()),
        ];
        seed_provider_options(store.as_ref(), &adapters).await;

        let persisted = store.current_provider().await;
        let providers = Arc::new(ProviderRegistry::new(store));
        for adapter in adapters {
            providers.register(adapter).await;
        }

        // An env selection applies only until an admin picks one through
        // the API; the persisted choice wins on later boots.
        if persisted.is_none() {
            if let Some(choice) = get_config_opt("MCPRESS_PROVIDER") {
                if let Err(err) = providers.set_current_provider(&choice).await {
                    warn!("ignoring MCPRESS_PROVIDER '{}': {}", choice, err);
                }
            }
        }
        info!("current provider: {}", providers.current_provider_id().await);

        Self::new(providers, tools, site, Arc::new(AllowAll))
    }

    /// Seconds since this process started serving.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Copy per-provider credentials from the environment into the store.
///
/// The variable for a field is `<PROVIDER>_<KEY>` uppercased, e.g.
/// `OPENAI_API_KEY` or `OPENROUTER_SITE_URL`. Values already persisted
/// in the store are left alone so admin edits survive restarts.
async fn seed_provider_options(store: &dyn OptionStore, adapters: &[BoxedChatProvider]) {
    for adapter in adapters {
        for field in adapter.option_fields() {
            let var = format!(
                "{}_{}",
                adapter.id().to_uppercase(),
                field.key.to_uppercase()
            );
            let Some(value) = get_config_opt(&var) else {
                continue;
            };
            if store.get(adapter.id(), field.key).await.is_some() {
                continue;
            }
            if let Err(err) = store.set(adapter.id(), field.key, &value).await {
                warn!("could not seed {} for {}: {}", field.key, adapter.id(), err);
            }
        }
    }
}
