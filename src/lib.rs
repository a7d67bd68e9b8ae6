pub mod config;
pub mod cursor;
pub mod documents;
pub mod error;
pub mod events;
pub mod filter;
pub mod history;
pub mod mru;
pub mod overlay;
pub mod search;
pub mod session;
pub mod store;

pub use error::{EditorError, EditorResult};
pub use session::Session;
