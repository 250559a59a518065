//! Navigation router: turns inbound events into screens, store changes, and chat calls.
//!
//! The router never talks to the transport directly. Everything it wants shown
//! goes out as a [`Reply`] through an [`Outbox`], in order.

use crate::callback::Callback;
use crate::chat::{ChatClient, ChatMessage};
use crate::command::Command;
use crate::error::Result;
use crate::render::{self, View, MESSAGE_LIMIT};
use crate::session::{Session, SessionTable, TextRoute};
use crate::store::{FileEntry, ProfileField, Store};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_PHOTO_PROMPT: &str = "Describe this image.";
pub const CHAT_UNAVAILABLE: &str = "Deepseek is unavailable right now. Please try again later.";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Who sent an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    /// Username when set, otherwise the full name.
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_ref: String,
    pub file_name: Option<String>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Text(String),
    Photo { file_ref: String, caption: Option<String> },
    Document(Upload),
    Button(Callback),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub chat_id: i64,
    pub sender: Sender,
    pub input: Input,
}

/// Outbound effect, executed by the transport adapter in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Replace the screen the button was pressed on; for messages, send it as new.
    Screen(View),
    /// New message in the originating chat.
    Message(View),
    /// Acknowledge a button press, optionally with a short notice.
    Toast(Option<String>),
    /// Re-send a stored file reference as a document.
    Document { file_ref: String, caption: String },
    /// Plain text to another chat.
    Forward { chat_id: i64, text: String },
    /// "typing…" indicator in the originating chat.
    Typing,
}

#[async_trait]
pub trait Outbox: Send + Sync {
    async fn deliver(&self, reply: Reply) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct RouterSettings {
    pub admin_ids: HashSet<i64>,
    pub feedback_chat_id: Option<i64>,
    pub max_doc_size_mb: u64,
}

impl RouterSettings {
    pub fn from_config(cfg: &crate::HubConfig) -> Self {
        Self {
            admin_ids: cfg.admin_ids.iter().copied().collect(),
            feedback_chat_id: cfg.feedback_chat_id,
            max_doc_size_mb: cfg.max_doc_size_mb,
        }
    }
}

pub struct Router {
    store: Arc<Store>,
    chat: Arc<dyn ChatClient>,
    sessions: SessionTable,
    settings: RouterSettings,
}

impl Router {
    pub fn new(store: Arc<Store>, chat: Arc<dyn ChatClient>, settings: RouterSettings) -> Self {
        Self {
            store,
            chat,
            sessions: SessionTable::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn session(&self, user_id: i64) -> Session {
        self.sessions.get(user_id)
    }

    /// True while the user's next text will be forwarded as feedback.
    pub fn awaiting_feedback(&self, user_id: i64) -> bool {
        self.sessions.is_awaiting_feedback(user_id)
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.settings.admin_ids.contains(&user_id)
    }

    pub async fn handle(&self, event: Event, out: &dyn Outbox) -> Result<()> {
        let Event { chat_id, sender, input } = event;
        match input {
            Input::Command(cmd) => self.on_command(&sender, cmd, out).await,
            Input::Button(cb) => self.on_button(&sender, cb, out).await,
            Input::Text(text) => self.on_text(&sender, text, out).await,
            Input::Photo { file_ref, caption } => {
                let prompt = caption
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PHOTO_PROMPT.to_string());
                let content = format!("User prompt: {}\nImage file_id: {}", prompt, file_ref);
                self.ask_deepseek(&sender, content, out).await
            }
            Input::Document(upload) => self.on_upload(chat_id, &sender, upload, out).await,
        }
    }

    async fn on_command(&self, sender: &Sender, cmd: Command, out: &dyn Outbox) -> Result<()> {
        match cmd {
            Command::Start => self.show_home(sender, out).await,
            Command::Help => out.deliver(Reply::Message(render::help())).await,
            Command::Data => self.show_data(sender, 0, out).await,
            Command::Deepseek => self.show_deepseek_menu(sender, out).await,
            Command::Settings => self.show_settings(sender, out).await,
            Command::SetDesc(args) => self.set_description(sender, &args, out).await,
        }
    }

    async fn on_button(&self, sender: &Sender, cb: Callback, out: &dyn Outbox) -> Result<()> {
        match cb {
            Callback::NavHome => ack_then(out, self.show_home(sender, out)).await,
            Callback::NavDeepseek => ack_then(out, self.show_deepseek_menu(sender, out)).await,
            Callback::NavSettings => ack_then(out, self.show_settings(sender, out)).await,
            Callback::TopData => ack_then(out, self.show_data(sender, 0, out)).await,
            Callback::DataPage(page) => ack_then(out, self.show_data(sender, page, out)).await,
            Callback::AiLinks => {
                out.deliver(Reply::Toast(None)).await?;
                self.sessions.enter(sender.id, Session::AiLinks);
                out.deliver(Reply::Screen(render::ai_links())).await
            }
            Callback::File(index) => {
                let Some(entry) = self.entry_or_notice(index, out).await? else {
                    return Ok(());
                };
                out.deliver(Reply::Toast(None)).await?;
                self.sessions.enter(sender.id, Session::FileActions { index });
                out.deliver(Reply::Screen(render::file_actions(index, &entry))).await
            }
            Callback::Download(index) => {
                let Some(entry) = self.entry_or_notice(index, out).await? else {
                    return Ok(());
                };
                out.deliver(Reply::Toast(Some("Sending file...".to_string()))).await?;
                tracing::info!(user_id = sender.id, index, "sending catalog file");
                out.deliver(Reply::Document {
                    caption: entry.display_title(index),
                    file_ref: entry.file_id,
                })
                .await
            }
            Callback::Details(index) => {
                let Some(entry) = self.entry_or_notice(index, out).await? else {
                    return Ok(());
                };
                out.deliver(Reply::Toast(None)).await?;
                self.sessions.enter(sender.id, Session::FileDetails { index });
                out.deliver(Reply::Screen(render::file_details(index, &entry))).await
            }
            Callback::DeepseekMode(mode) => {
                self.store.set_user(sender.id, ProfileField::DeepseekMode(mode)).await?;
                tracing::info!(user_id = sender.id, mode = %mode, "deepseek mode selected");
                out.deliver(Reply::Toast(Some(format!("Mode set: {}", mode)))).await?;
                self.sessions.enter(sender.id, Session::DeepseekActive { mode });
                out.deliver(Reply::Screen(render::deepseek_ready(mode))).await
            }
            Callback::Font(font) => {
                self.store.set_user(sender.id, ProfileField::Font(font)).await?;
                ack_then(out, self.show_settings(sender, out)).await
            }
            Callback::FeedbackOpen => {
                out.deliver(Reply::Toast(None)).await?;
                self.sessions.await_feedback(sender.id);
                self.sessions.enter(sender.id, Session::FeedbackPrompt);
                out.deliver(Reply::Screen(render::feedback_prompt())).await
            }
            Callback::PopupDisable => {
                self.store.set_user(sender.id, ProfileField::FeedbackPopup(false)).await?;
                out.deliver(Reply::Toast(Some("Popup disabled.".to_string()))).await
            }
        }
    }

    async fn entry_or_notice(&self, index: usize, out: &dyn Outbox) -> Result<Option<FileEntry>> {
        let entry = self.store.file(index).await?;
        if entry.is_none() {
            out.deliver(Reply::Toast(Some("Invalid file.".to_string()))).await?;
        }
        Ok(entry)
    }

    async fn on_text(&self, sender: &Sender, text: String, out: &dyn Outbox) -> Result<()> {
        match self.sessions.route_text(sender.id) {
            TextRoute::Feedback => self.forward_feedback(sender, &text, out).await,
            TextRoute::Chat => self.ask_deepseek(sender, text, out).await,
        }
    }

    async fn forward_feedback(&self, sender: &Sender, text: &str, out: &dyn Outbox) -> Result<()> {
        self.sessions.enter(sender.id, Session::Home);
        let Some(group) = self.settings.feedback_chat_id else {
            tracing::warn!(user_id = sender.id, "feedback received but no feedback chat configured");
            return out
                .deliver(Reply::Message(View::plain("Feedback channel is not configured.")))
                .await;
        };
        out.deliver(Reply::Forward {
            chat_id: group,
            text: format!("Feedback from @{} (ID:{}):\n{}", sender.handle, sender.id, text),
        })
        .await?;
        tracing::info!(user_id = sender.id, "feedback forwarded");
        out.deliver(Reply::Message(View::plain("Thanks! Feedback sent."))).await
    }

    async fn ask_deepseek(&self, sender: &Sender, prompt: String, out: &dyn Outbox) -> Result<()> {
        let profile = self.store.get_user(sender.id).await?;
        let mode = profile.deepseek_mode;
        self.sessions.enter(sender.id, Session::DeepseekActive { mode });

        out.deliver(Reply::Typing).await?;
        let history = [ChatMessage::user(prompt)];
        let content = match self.chat.chat(&history, mode).await {
            Ok(content) => content,
            Err(e) if e.is_external() => {
                tracing::warn!(user_id = sender.id, mode = %mode, error = %e, "deepseek request failed");
                return out.deliver(Reply::Message(View::plain(CHAT_UNAVAILABLE))).await;
            }
            Err(e) => return Err(e),
        };

        for chunk in render::split_message(&content, MESSAGE_LIMIT) {
            out.deliver(Reply::Message(View::plain(chunk))).await?;
        }
        if profile.feedback_popup {
            out.deliver(Reply::Message(render::feedback_popup())).await?;
        }
        Ok(())
    }

    async fn on_upload(&self, chat_id: i64, sender: &Sender, upload: Upload, out: &dyn Outbox) -> Result<()> {
        if !self.is_admin(sender.id) {
            tracing::debug!(user_id = sender.id, chat_id, "ignoring document from non-admin");
            return Ok(());
        }
        let size_mb = upload.size_bytes as f64 / BYTES_PER_MB;
        let max = self.settings.max_doc_size_mb;
        if size_mb > max as f64 {
            return out
                .deliver(Reply::Message(View::plain(format!(
                    "File too large ({:.1} MB). Max {} MB.",
                    size_mb, max
                ))))
                .await;
        }

        let title = upload.file_name.filter(|n| !n.trim().is_empty()).unwrap_or_default();
        let entry = FileEntry::uploaded(title, upload.file_ref);
        let index = self.store.add_file(entry.clone()).await?;
        let shown = entry.display_title(index);
        tracing::info!(user_id = sender.id, index, title = %shown, "catalog file added");
        out.deliver(Reply::Message(View::plain(format!(
            "Uploaded and indexed: {}\nUsers can find it in DATA.",
            shown
        ))))
        .await
    }

    async fn set_description(&self, sender: &Sender, args: &[String], out: &dyn Outbox) -> Result<()> {
        if !self.is_admin(sender.id) {
            tracing::debug!(user_id = sender.id, "ignoring /setdesc from non-admin");
            return Ok(());
        }
        let parsed = match args {
            [index, rest @ ..] if !rest.is_empty() => index.parse::<i64>().ok().map(|i| (i, rest.join(" "))),
            _ => None,
        };
        let Some((index, description)) = parsed else {
            return out
                .deliver(Reply::Message(View::plain("Usage: /setdesc <index> <description>")))
                .await;
        };
        let updated = match usize::try_from(index) {
            Ok(index) => self.store.set_description(index, &description).await?,
            Err(_) => false,
        };
        if !updated {
            return out.deliver(Reply::Message(View::plain("Invalid index."))).await;
        }
        tracing::info!(user_id = sender.id, index, "catalog description updated");
        out.deliver(Reply::Message(View::plain(format!(
            "Updated description for file {}.",
            index
        ))))
        .await
    }

    async fn show_home(&self, sender: &Sender, out: &dyn Outbox) -> Result<()> {
        let profile = self.store.get_user(sender.id).await?;
        self.sessions.enter(sender.id, Session::Home);
        out.deliver(Reply::Screen(render::home(profile.font))).await
    }

    async fn show_data(&self, sender: &Sender, page: usize, out: &dyn Outbox) -> Result<()> {
        let items = self.store.list_files().await?;
        let profile = self.store.get_user(sender.id).await?;
        self.sessions.enter(sender.id, Session::Data { page });
        out.deliver(Reply::Screen(render::data(&items, page, profile.font))).await
    }

    async fn show_deepseek_menu(&self, sender: &Sender, out: &dyn Outbox) -> Result<()> {
        self.sessions.enter(sender.id, Session::DeepseekMenu);
        out.deliver(Reply::Screen(render::deepseek_menu())).await
    }

    async fn show_settings(&self, sender: &Sender, out: &dyn Outbox) -> Result<()> {
        let profile = self.store.get_user(sender.id).await?;
        self.sessions.enter(sender.id, Session::Settings);
        out.deliver(Reply::Screen(render::settings(&profile))).await
    }
}

/// Acknowledge the button press, then render.
async fn ack_then<F>(out: &dyn Outbox, screen: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    out.deliver(Reply::Toast(None)).await?;
    screen.await
}
