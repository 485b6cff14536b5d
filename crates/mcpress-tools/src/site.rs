//! Builtin Site Tools
//!
//! The capabilities the assistant gets over the site's content: basic
//! site facts, the recent posts, and drafting new ones. All three tools
//! share one [`SiteState`], so a post created mid-conversation shows up
//! in the next listing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::info;

use mcpress_core::config::get_config;

use crate::tool::Tool;

const DEFAULT_LIST_COUNT: u64 = 5;
const MAX_LIST_COUNT: u64 = 20;
const EXCERPT_CHARS: usize = 120;

/// Identity of the site the assistant works on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub tagline: String,
    pub url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "My Site".to_string(),
            tagline: "Just another site".to_string(),
            url: "http://localhost".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: get_config("MCPRESS_SITE_NAME", &defaults.name),
            tagline: get_config("MCPRESS_SITE_TAGLINE", &defaults.tagline),
            url: get_config("MCPRESS_SITE_URL", &defaults.url),
        }
    }
}

/// One piece of site content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Shared content store behind the builtin tools.
pub struct SiteState {
    config: SiteConfig,
    posts: RwLock<Vec<Post>>,
    next_id: AtomicU64,
}

impl SiteState {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            posts: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub async fn create_post(&self, title: &str, content: &str, status: &str) -> Post {
        let post = Post {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            title: title.to_string(),
            content: content.to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
        };
        info!(id = post.id, status = %post.status, "created post");
        self.posts.write().await.push(post.clone());
        post
    }

    /// The newest posts first, at most `count`.
    pub async fn recent_posts(&self, count: usize) -> Vec<Post> {
        let posts = self.posts.read().await;
        posts.iter().rev().take(count).cloned().collect()
    }

    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }
}

fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    match args.get(key).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("missing required field: {}", key),
    }
}

fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// Reports the site name, tagline, URL, and content counts.
pub struct GetSiteInfoTool {
    state: Arc<SiteState>,
}

impl GetSiteInfoTool {
    pub fn new(state: Arc<SiteState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for GetSiteInfoTool {
    fn name(&self) -> &str {
        "get_site_info"
    }

    fn description(&self) -> &str {
        "Get basic facts about this site: name, tagline, URL, and how many posts it has."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        let config = self.state.config();
        Ok(json!({
            "name": config.name,
            "tagline": config.tagline,
            "url": config.url,
            "post_count": self.state.post_count().await,
        }))
    }
}

/// Lists the most recent posts, newest first.
pub struct ListPostsTool {
    state: Arc<SiteState>,
}

impl ListPostsTool {
    pub fn new(state: Arc<SiteState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for ListPostsTool {
    fn name(&self) -> &str {
        "list_posts"
    }

    fn description(&self) -> &str {
        "List the most recent posts with their id, title, status, and an excerpt."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "description": "How many posts to return (default: 5, max: 20)",
                    "default": DEFAULT_LIST_COUNT
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let count = args
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_LIST_COUNT)
            .clamp(1, MAX_LIST_COUNT) as usize;
        let posts: Vec<Value> = self
            .state
            .recent_posts(count)
            .await
            .into_iter()
            .map(|post| {
                json!({
                    "id": post.id,
                    "title": post.title,
                    "status": post.status,
                    "created_at": post.created_at.to_rfc3339(),
                    "excerpt": excerpt(&post.content),
                })
            })
            .collect();
        Ok(json!({"posts": posts}))
    }
}

/// Creates a new post, as a draft unless told otherwise.
pub struct CreatePostTool {
    state: Arc<SiteState>,
}

impl CreatePostTool {
    pub fn new(state: Arc<SiteState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for CreatePostTool {
    fn name(&self) -> &str {
        "create_post"
    }

    fn description(&self) -> &str {
        "Create a new post. Drafts by default; pass status \"publish\" to publish immediately."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Post title"
                },
                "content": {
                    "type": "string",
                    "description": "Post body"
                },
                "status": {
                    "type": "string",
                    "enum": ["draft", "publish"],
                    "description": "Publication status (default: draft)"
                }
            },
            "required": ["title", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let title = require_str(&args, "title")?;
        let content = require_str(&args, "content")?;
        let status = args
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("draft");
        if status != "draft" && status != "publish" {
            bail!("status must be \"draft\" or \"publish\", got \"{}\"", status);
        }
        let post = self.state.create_post(title, content, status).await;
        Ok(json!({
            "message": format!("Created {} post \"{}\" (id {})", post.status, post.title, post.id),
            "id": post.id,
            "title": post.title,
            "status": post.status,
            "created_at": post.created_at.to_rfc3339(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<SiteState> {
        Arc::new(SiteState::new(SiteConfig {
            name: "Demo Site".to_string(),
            tagline: "Testing grounds".to_string(),
            url: "https://demo.test".to_string(),
        }))
    }

    #[tokio::test]
    async fn site_info_reports_identity_and_counts() {
        let state = state();
        state.create_post("First", "Hello", "publish").await;
        let info = GetSiteInfoTool::new(state).execute(json!({})).await.unwrap();
        assert_eq!(info["name"], "Demo Site");
        assert_eq!(info["url"], "https://demo.test");
        assert_eq!(info["post_count"], 1);
    }

    #[tokio::test]
    async fn created_posts_show_up_newest_first() {
        let state = state();
        let create = CreatePostTool::new(state.clone());
        create
            .execute(json!({"title": "Older", "content": "one"}))
            .await
            .unwrap();
        create
            .execute(json!({"title": "Newer", "content": "two"}))
            .await
            .unwrap();

        let listed = ListPostsTool::new(state)
            .execute(json!({}))
            .await
            .unwrap();
        let posts = listed["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["title"], "Newer");
        assert_eq!(posts[1]["title"], "Older");
    }

    #[tokio::test]
    async fn list_count_is_clamped() {
        let state = state();
        for i in 0..4 {
            state.create_post(&format!("p{}", i), "body", "draft").await;
        }
        let tool = ListPostsTool::new(state);
        let listed = tool.execute(json!({"count": 2})).await.unwrap();
        assert_eq!(listed["posts"].as_array().unwrap().len(), 2);
        let listed = tool.execute(json!({"count": 0})).await.unwrap();
        assert_eq!(listed["posts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_post_defaults_to_draft_and_increments_ids() {
        let tool = CreatePostTool::new(state());
        let first = tool
            .execute(json!({"title": "A", "content": "a"}))
            .await
            .unwrap();
        let second = tool
            .execute(json!({"title": "B", "content": "b", "status": "publish"}))
            .await
            .unwrap();
        assert_eq!(first["status"], "draft");
        assert_eq!(first["id"], 1);
        assert_eq!(second["status"], "publish");
        assert_eq!(second["id"], 2);
    }

    #[tokio::test]
    async fn create_post_rejects_missing_title_and_bad_status() {
        let tool = CreatePostTool::new(state());
        let err = tool.execute(json!({"content": "no title"})).await.unwrap_err();
        assert!(err.to_string().contains("title"));

        let err = tool
            .execute(json!({"title": "T", "content": "c", "status": "pending"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn excerpts_trim_long_content() {
        let long = "word ".repeat(60);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= EXCERPT_CHARS + 3);
        assert_eq!(excerpt("short"), "short");
    }
}
