//! OpenAI Chat Completions reflection generator.
//!
//! Requests a JSON object response (`response_format: json_object`) under the
//! empathetic-listener system prompt and parses the message content as a
//! [`Reflection`](super::Reflection).

mod client;
mod messages;

pub use client::{OPENAI_API_URL, OpenAIReflection};
pub use messages::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, OpenAIErrorResponse};
