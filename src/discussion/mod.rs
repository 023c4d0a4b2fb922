//! Per-entry discussion threads.

mod relative_time;
mod thread;

pub use relative_time::format_relative;
pub use thread::{DiscussionThread, PostOutcome, ThreadComment, ANONYMOUS_AUTHOR};
