//! Timeline and page-state types.

pub mod page_state;
pub mod timeline;
