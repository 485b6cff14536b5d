//! Provider option storage.
//!
//! Option values (endpoint, api_key, model, ...) are persisted per provider
//! by an [`OptionStore`] implementation and merged with caller overrides
//! into a [`ProviderOptions`] view for one adapter invocation. The store
//! also persists which provider is currently selected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{ChatError, Result};

/// Merged option values handed to a provider adapter for one call.
///
/// Empty-string values count as unset: a blank `api_key` field is a
/// configuration error, not a credential.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    values: HashMap<String, String>,
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Fetch a required option, failing with `ConfigMissing` naming the
    /// field so the error is user-fixable.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ChatError::config_missing(format!("provider option '{}' is not set", key)))
    }

    /// Overlay `other` on top of the current values; `other` wins.
    pub fn merge(&mut self, other: &HashMap<String, String>) {
        for (key, value) in other {
            self.values.insert(key.clone(), value.clone());
        }
    }
}

/// Persistence seam for provider options and the current-provider selection.
///
/// The persistence mechanism is a deployment concern; the core only needs
/// get/set semantics.
#[async_trait]
pub trait OptionStore: Send + Sync {
    async fn get(&self, provider_id: &str, key: &str) -> Option<String>;

    async fn set(&self, provider_id: &str, key: &str, value: &str) -> anyhow::Result<()>;

    async fn current_provider(&self) -> Option<String>;

    async fn set_current_provider(&self, provider_id: &str) -> anyhow::Result<()>;
}

/// In-memory store. The default for tests and for deployments that
/// configure everything through the environment.
#[derive(Default)]
pub struct MemoryOptionStore {
    values: RwLock<HashMap<String, HashMap<String, String>>>,
    current: RwLock<Option<String>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OptionStore for MemoryOptionStore {
    async fn get(&self, provider_id: &str, key: &str) -> Option<String> {
        self.values
            .read()
            .await
            .get(provider_id)
            .and_then(|fields| fields.get(key))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    async fn set(&self, provider_id: &str, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .write()
            .await
            .entry(provider_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn current_provider(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    async fn set_current_provider(&self, provider_id: &str) -> anyhow::Result<()> {
        *self.current.write().await = Some(provider_id.to_string());
        Ok(())
    }
}

/// File-backed store: one file per `<root>/<provider>/<key>`, the current
/// selection at `<root>/current-provider`.
pub struct FileOptionStore {
    root: PathBuf,
}

impl FileOptionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn value_path(&self, provider_id: &str, key: &str) -> Option<PathBuf> {
        if !safe_component(provider_id) || !safe_component(key) {
            warn!(provider_id, key, "rejecting unsafe option path component");
            return None;
        }
        Some(self.root.join(provider_id).join(key))
    }

    fn current_path(&self) -> PathBuf {
        self.root.join("current-provider")
    }

    async fn read_value(path: &Path) -> Option<String> {
        let raw = tokio::fs::read_to_string(path).await.ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Option keys and provider ids become path components; anything outside
/// [a-zA-Z0-9_-] could escape the store root.
fn safe_component(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[async_trait]
impl OptionStore for FileOptionStore {
    async fn get(&self, provider_id: &str, key: &str) -> Option<String> {
        let path = self.value_path(provider_id, key)?;
        Self::read_value(&path).await
    }

    async fn set(&self, provider_id: &str, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self
            .value_path(provider_id, key)
            .ok_or_else(|| anyhow::anyhow!("invalid option key '{}/{}'", provider_id, key))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, value).await?;
        Ok(())
    }

    async fn current_provider(&self) -> Option<String> {
        Self::read_value(&self.current_path()).await
    }

    async fn set_current_provider(&self, provider_id: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.current_path(), provider_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_the_missing_field() {
        let opts = ProviderOptions::new();
        let err = opts.require("api_key").unwrap_err();
        assert!(matches!(err, ChatError::ConfigMissing(_)));
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let mut opts = ProviderOptions::new();
        opts.insert("api_key", "");
        assert!(opts.get("api_key").is_none());
        assert!(opts.require("api_key").is_err());
        assert_eq!(opts.get_or("model", "gpt-4o-mini"), "gpt-4o-mini");
    }

    #[test]
    fn merge_prefers_the_overlay() {
        let mut opts = ProviderOptions::new();
        opts.insert("model", "stored-model");
        opts.insert("endpoint", "https://stored.example");

        let mut overrides = HashMap::new();
        overrides.insert("model".to_string(), "override-model".to_string());
        opts.merge(&overrides);

        assert_eq!(opts.get("model"), Some("override-model"));
        assert_eq!(opts.get("endpoint"), Some("https://stored.example"));
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryOptionStore::new();
        assert!(store.get("openai", "api_key").await.is_none());

        store.set("openai", "api_key", "sk-test").await.unwrap();
        assert_eq!(store.get("openai", "api_key").await.as_deref(), Some("sk-test"));

        assert!(store.current_provider().await.is_none());
        store.set_current_provider("gemini").await.unwrap();
        assert_eq!(store.current_provider().await.as_deref(), Some("gemini"));
    }

    #[tokio::test]
    async fn file_store_persists_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileOptionStore::new(dir.path());

        store.set("openrouter", "model", "openrouter/auto").await.unwrap();
        assert_eq!(
            store.get("openrouter", "model").await.as_deref(),
            Some("openrouter/auto")
        );

        store.set_current_provider("openrouter").await.unwrap();
        assert_eq!(store.current_provider().await.as_deref(), Some("openrouter"));

        // A second store over the same root sees the persisted values.
        let reopened = FileOptionStore::new(dir.path());
        assert_eq!(
            reopened.get("openrouter", "model").await.as_deref(),
            Some("openrouter/auto")
        );
    }

    #[tokio::test]
    async fn file_store_rejects_path_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileOptionStore::new(dir.path());

        assert!(store.set("../evil", "key", "v").await.is_err());
        assert!(store.get("openai", "../../etc/passwd").await.is_none());
    }
}
