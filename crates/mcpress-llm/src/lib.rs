//! LLM Provider Layer
//!
//! Vendor adapters behind one provider-agnostic interface, plus the
//! registry that routes chat traffic to whichever adapter is currently
//! selected.
//!
//! Supported providers:
//!
//! | Provider   | Wire protocol                  | Auth                      |
//! |------------|--------------------------------|---------------------------|
//! | openai     | OpenAI chat completions        | `Authorization: Bearer`   |
//! | openrouter | OpenAI chat completions        | `Authorization: Bearer`   |
//! | gemini     | Google `generateContent`       | `key` query parameter     |
//!
//! Any server speaking the OpenAI chat-completions protocol (Groq,
//! Together, vLLM, llama.cpp, ...) works through the `openai` adapter by
//! pointing its `endpoint` option at the compatible URL.
//!
//! Streaming uses SSE on every provider. Adapters reassemble vendor
//! streams into normalized [`stream::StreamEvent`]s while they forward
//! them, so a streamed completion finishes with the same consolidated
//! [`mcpress_core::CompletionResult`] a buffered call would have
//! produced.

pub mod gemini;
pub mod openai;
pub mod openrouter;
pub mod provider;
pub mod registry;
pub mod sse;
pub mod stream;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;
pub use provider::{
    BoxedChatProvider, ChatProvider, ChatRequest, OptionField, ProviderInfo,
    StreamingChatProvider, ToolResultMode,
};
pub use registry::{ProviderRegistry, DEFAULT_PROVIDER_ID};
pub use sse::FrameDecoder;
pub use stream::{StreamDialect, StreamEvent, StreamReassembler, ToolCallAccumulator};

pub mod prelude {
    //! Convenience imports for provider consumers.
    pub use crate::provider::{ChatProvider, ChatRequest, StreamingChatProvider};
    pub use crate::registry::ProviderRegistry;
    pub use crate::stream::StreamEvent;
    pub use mcpress_core::error::{ChatError, Result};
    pub use mcpress_core::message::{ChatMessage, CompletionResult, ToolChoice, ToolSchema};
}
