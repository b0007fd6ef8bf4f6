//! Storyteller Core: shared sequencing abstractions.
//!
//! This crate defines the cue vocabulary, the capability traits pages talk to
//! (audio, navigation, speech recognition, clock) and the shared error type.
//! It contains no scheduling or infrastructure code.

pub mod audio;
pub mod clock;
pub mod cue;
pub mod error;
pub mod navigation;
pub mod speech;
