//! Storyteller: pages.
//!
//! Each page owns a sequencer stage (state, audio bank, dispatcher, runner
//! and transition controller). Dropping a page tears all of it down.

pub mod chat;
pub mod context;
pub mod conversation;
pub mod landing;
pub mod narration;
pub mod style_choose;
pub mod voice_input;

pub use context::PageContext;
