//! Document key search.

pub mod matcher;
pub mod worker;

pub use matcher::rank;
pub use worker::{SearchResults, SearchWorker};
