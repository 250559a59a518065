//! File hub core library.
//! JSON-backed user/catalog store, Deepseek chat client, and the menu router.
//! Transport-agnostic: the bot binary feeds [`Event`]s in and executes [`Reply`]s.

pub mod callback;
pub mod chat;
pub mod command;
pub mod config;
pub mod error;
pub mod render;
pub mod router;
pub mod session;
pub mod store;

pub use callback::Callback;
pub use chat::{ChatClient, ChatMessage, DeepseekClient};
pub use command::Command;
pub use crate::config::HubConfig;
pub use error::{HubError, Result};
pub use render::{Button, ButtonAction, Keyboard, Markup, View};
pub use router::{Event, Input, Outbox, Reply, Router, RouterSettings, Sender, Upload};
pub use session::{Session, SessionTable};
pub use store::{ChatMode, FileEntry, Font, ProfileField, Store, UserProfile};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
