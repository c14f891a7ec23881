//! Reflection generation: turning recent caller speech into a short reply.

mod base;
pub mod openai;
pub mod prompt;

pub use base::{Reflection, ReflectionConfig, ReflectionError, ReflectionGenerator, ReflectionIntent};
pub use openai::{OPENAI_API_URL, OpenAIReflection};
