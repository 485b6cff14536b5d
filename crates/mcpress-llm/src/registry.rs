//! Provider Registry
//!
//! Routes chat traffic to whichever registered adapter is currently
//! selected, merges option layers for each call, and normalizes results
//! before anything downstream sees them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use mcpress_core::error::{ChatError, Result};
use mcpress_core::message::{ChatMessage, CompletionResult, ToolChoice, ToolSchema};
use mcpress_core::options::{OptionStore, ProviderOptions};

use crate::provider::{BoxedChatProvider, ChatProvider, ChatRequest, ProviderInfo, ToolResultMode};
use crate::stream::StreamEvent;

/// Selection used when nothing valid is persisted.
pub const DEFAULT_PROVIDER_ID: &str = "openai";

/// Ordered collection of chat providers plus the persisted selection and
/// per-provider options behind them.
pub struct ProviderRegistry {
    providers: RwLock<Vec<BoxedChatProvider>>,
    store: Arc<dyn OptionStore>,
}

impl ProviderRegistry {
    pub fn new(store: Arc<dyn OptionStore>) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            store,
        }
    }

    /// Register an adapter. Registration order is preserved for listings;
    /// a duplicate id is dropped and the first registration wins.
    pub async fn register(&self, provider: BoxedChatProvider) {
        let mut providers = self.providers.write().await;
        if providers.iter().any(|existing| existing.id() == provider.id()) {
            warn!(provider = provider.id(), "duplicate provider registration ignored");
            return;
        }
        debug!(provider = provider.id(), "registered chat provider");
        providers.push(provider);
    }

    /// All registered providers in registration order, with the current
    /// selection marked.
    pub async fn available_providers(&self) -> Vec<ProviderInfo> {
        let current = self.current_provider_id().await;
        self.providers
            .read()
            .await
            .iter()
            .map(|provider| ProviderInfo {
                id: provider.id().to_string(),
                label: provider.label().to_string(),
                current: provider.id() == current,
                option_fields: provider.option_fields(),
            })
            .collect()
    }

    /// The current selection. Falls back from the persisted choice to the
    /// fixed default to the first registered provider, and to the empty
    /// string only when nothing is registered at all; lookups reject that
    /// empty id, so every caller gets a clean error rather than a panic.
    pub async fn current_provider_id(&self) -> String {
        let providers = self.providers.read().await;
        if let Some(persisted) = self.store.current_provider().await {
            if providers.iter().any(|p| p.id() == persisted) {
                return persisted;
            }
            if !persisted.is_empty() {
                warn!(provider = %persisted, "persisted provider is not registered, falling back");
            }
        }
        if providers.iter().any(|p| p.id() == DEFAULT_PROVIDER_ID) {
            return DEFAULT_PROVIDER_ID.to_string();
        }
        providers
            .first()
            .map(|p| p.id().to_string())
            .unwrap_or_default()
    }

    /// Persist a new selection. The id must belong to a registered
    /// provider.
    pub async fn set_current_provider(&self, id: &str) -> Result<()> {
        if self.find(id).await.is_none() {
            return Err(ChatError::invalid_provider(format!("unknown provider '{}'", id)));
        }
        self.store
            .set_current_provider(id)
            .await
            .map_err(|e| ChatError::internal(format!("could not persist provider selection: {}", e)))?;
        debug!(provider = id, "switched current provider");
        Ok(())
    }

    /// Persist option values for a registered provider.
    pub async fn set_options(
        &self,
        provider_id: &str,
        values: &HashMap<String, String>,
    ) -> Result<()> {
        if self.find(provider_id).await.is_none() {
            return Err(ChatError::invalid_provider(format!(
                "unknown provider '{}'",
                provider_id
            )));
        }
        for (key, value) in values {
            self.store
                .set(provider_id, key, value)
                .await
                .map_err(|e| {
                    ChatError::internal(format!("could not persist option '{}': {}", key, e))
                })?;
        }
        debug!(provider = provider_id, count = values.len(), "stored provider options");
        Ok(())
    }

    /// How the current provider wants tool results fed back.
    pub async fn tool_result_mode(&self) -> ToolResultMode {
        let id = self.current_provider_id().await;
        match self.find(&id).await {
            Some(provider) => provider.tool_result_mode(),
            None => ToolResultMode::default(),
        }
    }

    /// Buffered completion via the current provider.
    pub async fn send_chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        tool_choice: ToolChoice,
        overrides: &HashMap<String, String>,
    ) -> Result<CompletionResult> {
        let id = self.current_provider_id().await;
        self.send_chat_via(&id, messages, tools, tool_choice, overrides).await
    }

    /// Buffered completion via a specific provider, whether or not it is
    /// the current selection.
    pub async fn send_chat_via(
        &self,
        id: &str,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        tool_choice: ToolChoice,
        overrides: &HashMap<String, String>,
    ) -> Result<CompletionResult> {
        let provider = self.require(id).await?;
        let request = self.build_request(provider.as_ref(), messages, tools, tool_choice, overrides).await;
        let result = provider.send_chat(&request).await?;
        Ok(normalize(result))
    }

    /// Streaming completion via the current provider. Providers without a
    /// streaming side fall back to one buffered call whose content is
    /// replayed as a single delta, so callers always observe the same
    /// event contract.
    pub async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        tool_choice: ToolChoice,
        overrides: &HashMap<String, String>,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<CompletionResult> {
        let id = self.current_provider_id().await;
        let provider = self.require(&id).await?;
        let request = self.build_request(provider.as_ref(), messages, tools, tool_choice, overrides).await;
        let result = match provider.as_streaming() {
            Some(streaming) => streaming.stream_chat(&request, tx).await?,
            None => {
                debug!(provider = %id, "provider cannot stream, replaying a buffered completion");
                let result = provider.send_chat(&request).await?;
                if let Some(content) = result.content.as_deref() {
                    if !content.is_empty() {
                        let _ = tx.send(StreamEvent::Delta(content.to_string())).await;
                    }
                }
                result
            }
        };
        Ok(normalize(result))
    }

    /// The option view one call runs with: declared field defaults,
    /// overlaid with persisted values, overlaid with per-call overrides.
    pub async fn options_for(
        &self,
        provider: &dyn ChatProvider,
        overrides: &HashMap<String, String>,
    ) -> ProviderOptions {
        let mut options = ProviderOptions::new();
        for field in provider.option_fields() {
            if let Some(default) = field.default {
                options.insert(field.key, default);
            }
            if let Some(value) = self.store.get(provider.id(), field.key).await {
                options.insert(field.key, value);
            }
        }
        options.merge(overrides);
        options
    }

    async fn find(&self, id: &str) -> Option<BoxedChatProvider> {
        self.providers
            .read()
            .await
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    async fn require(&self, id: &str) -> Result<BoxedChatProvider> {
        if id.is_empty() {
            return Err(ChatError::invalid_provider("no chat provider is registered"));
        }
        self.find(id)
            .await
            .ok_or_else(|| ChatError::invalid_provider(format!("unknown provider '{}'", id)))
    }

    async fn build_request(
        &self,
        provider: &dyn ChatProvider,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSchema>,
        tool_choice: ToolChoice,
        overrides: &HashMap<String, String>,
    ) -> ChatRequest {
        let options = self.options_for(provider, overrides).await;
        ChatRequest::new(messages)
            .with_tools(tools)
            .with_tool_choice(tool_choice)
            .with_options(options)
    }
}

/// Results leave the registry with content always present and tool calls
/// always an array, whatever the adapter produced.
fn normalize(mut result: CompletionResult) -> CompletionResult {
    if result.content.is_none() {
        result.content = Some(String::new());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcpress_core::options::MemoryOptionStore;
    use crate::provider::OptionField;

    struct StubProvider {
        id: &'static str,
        label: &'static str,
        reply: CompletionResult,
        mode: ToolResultMode,
    }

    impl StubProvider {
        fn new(id: &'static str, reply: &str) -> Self {
            Self {
                id,
                label: "Stub",
                reply: CompletionResult::text(reply),
                mode: ToolResultMode::ToolRole,
            }
        }

        fn with_reply(mut self, reply: CompletionResult) -> Self {
            self.reply = reply;
            self
        }
    }

    #[async_trait]
    impl ChatProvider for StubProvider {
        fn id(&self) -> &str {
            self.id
        }

        fn label(&self) -> &str {
            self.label
        }

        fn option_fields(&self) -> Vec<OptionField> {
            vec![
                OptionField::new("model", "Model").with_default("stub-1"),
                OptionField::new("api_key", "API key").secret(),
            ]
        }

        fn tool_result_mode(&self) -> ToolResultMode {
            self.mode
        }

        async fn send_chat(&self, _request: &ChatRequest) -> Result<CompletionResult> {
            Ok(self.reply.clone())
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(MemoryOptionStore::new()))
    }

    #[tokio::test]
    async fn empty_registry_rejects_sends_with_clean_error() {
        let registry = registry();
        assert_eq!(registry.current_provider_id().await, "");
        let err = registry
            .send_chat(vec![ChatMessage::user("hi")], Vec::new(), ToolChoice::Auto, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidProvider(_)));
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_the_first() {
        let registry = registry();
        registry.register(Arc::new(StubProvider::new("openai", "first"))).await;
        registry
            .register(Arc::new(StubProvider {
                label: "Second",
                ..StubProvider::new("openai", "second")
            }))
            .await;
        let listed = registry.available_providers().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, "Stub");
    }

    #[tokio::test]
    async fn selection_falls_back_to_default_then_first() {
        let registry = registry();
        registry.register(Arc::new(StubProvider::new("gemini", "hi"))).await;
        assert_eq!(registry.current_provider_id().await, "gemini");

        registry.register(Arc::new(StubProvider::new("openai", "hi"))).await;
        assert_eq!(registry.current_provider_id().await, "openai");
    }

    #[tokio::test]
    async fn persisted_selection_wins_when_registered() {
        let store = Arc::new(MemoryOptionStore::new());
        let registry = ProviderRegistry::new(store.clone());
        registry.register(Arc::new(StubProvider::new("openai", "hi"))).await;
        registry.register(Arc::new(StubProvider::new("openrouter", "hi"))).await;

        registry.set_current_provider("openrouter").await.unwrap();
        assert_eq!(registry.current_provider_id().await, "openrouter");
        assert_eq!(store.current_provider().await.as_deref(), Some("openrouter"));
    }

    #[tokio::test]
    async fn stale_persisted_selection_falls_back() {
        let store = Arc::new(MemoryOptionStore::new());
        store.set_current_provider("long-gone").await.unwrap();
        let registry = ProviderRegistry::new(store);
        registry.register(Arc::new(StubProvider::new("openai", "hi"))).await;
        assert_eq!(registry.current_provider_id().await, "openai");
    }

    #[tokio::test]
    async fn switching_to_unknown_provider_is_rejected() {
        let registry = registry();
        registry.register(Arc::new(StubProvider::new("openai", "hi"))).await;
        let err = registry.set_current_provider("nope").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidProvider(_)));
    }

    #[tokio::test]
    async fn set_options_persists_through_the_store() {
        let store = Arc::new(MemoryOptionStore::new());
        let registry = ProviderRegistry::new(store.clone());
        registry.register(Arc::new(StubProvider::new("openai", "hi"))).await;

        let mut values = HashMap::new();
        values.insert("model".to_string(), "gpt-4o".to_string());
        registry.set_options("openai", &values).await.unwrap();
        assert_eq!(store.get("openai", "model").await.as_deref(), Some("gpt-4o"));

        let err = registry.set_options("nope", &values).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidProvider(_)));
    }

    #[tokio::test]
    async fn options_layer_defaults_persisted_and_overrides() {
        let store = Arc::new(MemoryOptionStore::new());
        store.set("openai", "api_key", "persisted-key").await.unwrap();
        store.set("openai", "model", "persisted-model").await.unwrap();
        let registry = ProviderRegistry::new(store);
        let provider = StubProvider::new("openai", "hi");

        let mut overrides = HashMap::new();
        overrides.insert("model".to_string(), "override-model".to_string());
        let options = registry.options_for(&provider, &overrides).await;
        assert_eq!(options.get("model").as_deref(), Some("override-model"));
        assert_eq!(options.get("api_key").as_deref(), Some("persisted-key"));

        let options = registry.options_for(&provider, &HashMap::new()).await;
        assert_eq!(options.get("model").as_deref(), Some("persisted-model"));
    }

    #[tokio::test]
    async fn send_chat_via_addresses_a_non_current_provider() {
        let registry = registry();
        registry.register(Arc::new(StubProvider::new("openai", "from openai"))).await;
        registry.register(Arc::new(StubProvider::new("gemini", "from gemini"))).await;
        assert_eq!(registry.current_provider_id().await, "openai");

        let result = registry
            .send_chat_via("gemini", vec![ChatMessage::user("hi")], Vec::new(), ToolChoice::Auto, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some("from gemini"));

        let err = registry
            .send_chat_via("nope", vec![ChatMessage::user("hi")], Vec::new(), ToolChoice::Auto, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidProvider(_)));
    }

    #[tokio::test]
    async fn null_content_is_normalized_to_empty() {
        let registry = registry();
        registry
            .register(Arc::new(StubProvider::new("openai", "ignored").with_reply(
                CompletionResult {
                    content: None,
                    tool_calls: Vec::new(),
                    raw: None,
                },
            )))
            .await;
        let result = registry
            .send_chat(vec![ChatMessage::user("hi")], Vec::new(), ToolChoice::Auto, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn buffered_fallback_replays_content_as_one_delta() {
        let registry = registry();
        registry.register(Arc::new(StubProvider::new("openai", "whole reply"))).await;

        let (tx, mut rx) = mpsc::channel(8);
        let result = registry
            .stream_chat(vec![ChatMessage::user("hi")], Vec::new(), ToolChoice::Auto, &HashMap::new(), tx)
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some("whole reply"));
        assert_eq!(rx.recv().await, Some(StreamEvent::Delta("whole reply".to_string())));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn tool_result_mode_tracks_current_provider() {
        let registry = registry();
        registry
            .register(Arc::new(StubProvider {
                mode: ToolResultMode::UserSummary,
                ..StubProvider::new("openai", "hi")
            }))
            .await;
        assert_eq!(registry.tool_result_mode().await, ToolResultMode::UserSummary);
    }
}
