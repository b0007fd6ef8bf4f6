//! Storyteller backend client.
//!
//! The story service (`/story/process`) and the chat service (`/start`,
//! `/chat`, `/generate-image`, `/tts`, `/explain-word`) are separate
//! deployments; `HttpStoryBackend` talks to both.

pub mod client;
pub mod dto;
pub mod error;

pub use client::{HttpStoryBackend, StoryBackend};
pub use error::BackendError;
