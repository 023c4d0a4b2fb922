//! Debounced title search.

mod debounce;
mod engine;

pub use debounce::Debouncer;
pub use engine::{SearchEngine, SearchState};
