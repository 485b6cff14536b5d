//! Tool Layer
//!
//! The executable counterpart of the tool schemas providers advertise.
//! A [`Tool`] wraps one capability behind a JSON-argument interface; the
//! [`ToolRegistry`] keeps them in registration order and dispatches
//! model-requested calls to them. The builtin site tools give the
//! assistant read and write access to the content store.

pub mod registry;
pub mod site;
pub mod tool;

pub use registry::ToolRegistry;
pub use site::{Post, SiteConfig, SiteState, CreatePostTool, GetSiteInfoTool, ListPostsTool};
pub use tool::{BoxedTool, SimpleTool, Tool};
