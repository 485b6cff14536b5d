//! System Prompt Generation
//!
//! Builds the system prompt the model starts every conversation with.
//! The prompt carries the site's identity and the current tool inventory
//! so the model neither invents capabilities nor denies the ones it has.

use std::sync::Arc;

use async_trait::async_trait;

use mcpress_tools::registry::ToolRegistry;
use mcpress_tools::site::SiteState;

/// Where the system prompt and the UI's opening message come from.
#[async_trait]
pub trait SystemPromptSource: Send + Sync {
    async fn system_prompt(&self) -> String;

    /// Greeting the UI shows before any model call happens.
    async fn initial_greeting(&self) -> String;
}

/// Prompt source rendering the site identity and tool inventory.
pub struct SitePromptSource {
    site: Arc<SiteState>,
    tools: Arc<ToolRegistry>,
}

impl SitePromptSource {
    pub fn new(site: Arc<SiteState>, tools: Arc<ToolRegistry>) -> Self {
        Self { site, tools }
    }
}

#[async_trait]
impl SystemPromptSource for SitePromptSource {
    async fn system_prompt(&self) -> String {
        let config = self.site.config();
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "You are the built-in assistant for the site \"{}\" ({}).\n",
            config.name, config.url
        ));
        if !config.tagline.is_empty() {
            prompt.push_str(&format!("Site tagline: \"{}\".\n", config.tagline));
        }
        prompt.push_str("\n");
        prompt.push_str(
            "You help visitors and editors with questions about the site and its content. \
             When a task needs live data or a content change, call the matching tool instead \
             of guessing. Tool calls always require the user's confirmation before they run, \
             so never claim an action happened until its result comes back. Report exactly \
             what the tools returned, including failures.\n",
        );

        let schemas = self.tools.schemas().await;
        if !schemas.is_empty() {
            prompt.push_str("\nAvailable tools:\n");
            for schema in schemas {
                prompt.push_str(&format!("- {}: {}\n", schema.name, schema.description));
            }
        }

        prompt
    }

    async fn initial_greeting(&self) -> String {
        format!(
            "Hi! I'm the assistant for {}. I can answer questions about the site, list recent posts, or draft a new one. What can I do for you?",
            self.site.config().name
        )
    }
}
