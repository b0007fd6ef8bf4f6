//! Storyteller: narrative sequencer.
//!
//! Responsible for timed cue timelines, cue dispatch into page state and
//! audio, one-shot page transitions, and ownership of the shared background
//! track.

pub mod application;
pub mod domain;
