//! Retrieval-augmented answering on top of hybrid search
//!
//! - [`ContextAssembler`] turns ranked results into a bounded prompt context
//! - [`LlmClient`] generates the answer; [`ChatCompletionsClient`] talks to
//!   any OpenAI-compatible endpoint
//! - [`RagPipeline`] ties search, context and generation together

mod client;
mod context;
mod pipeline;

pub use client::{extract_content, ChatCompletionsClient, LlmClient, LlmError};
pub use context::{AssembledContext, ContextAssembler, Source};
pub use pipeline::{RagAnswer, RagPipeline};
