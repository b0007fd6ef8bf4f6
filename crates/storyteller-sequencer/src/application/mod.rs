//! Runtime components that execute timelines and transitions.

pub mod audio_bank;
pub mod dispatcher;
pub mod music;
pub mod runner;
pub mod scope;
pub mod settings;
pub mod transition;
