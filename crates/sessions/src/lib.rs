//! Conversation sessions and the per-session dataset upload.

pub mod assets;
pub mod store;

pub use assets::{AssetOutcome, SessionAssetManager};
pub use store::{ConversationSession, SessionStore};
