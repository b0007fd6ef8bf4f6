//! Storyteller: console front end.
//!
//! Drives the pages from the terminal: log-only audio, stdin lines standing
//! in for speech, and the chatbot as a line-based conversation.

pub mod config;
pub mod console;
pub mod error;
pub mod shell;
