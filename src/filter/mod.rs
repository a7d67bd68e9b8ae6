//! Filter levels and the incrementally maintained filtered child index.

mod index;
mod level;

pub use index::{FilterChange, FilteredIndex};
pub use level::FilterLevel;
