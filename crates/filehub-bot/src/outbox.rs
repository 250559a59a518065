//! Telegram side of the router: executes [`Reply`]s with the Bot API.

use async_trait::async_trait;
use filehub_core::{ButtonAction, HubError, Keyboard, Markup, Outbox, Reply, View};
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode,
};
use teloxide::{ApiError, RequestError};

/// Where the update came from; decides whether a screen edits or sends.
pub enum Origin {
    Message,
    Callback {
        query_id: String,
        message_id: Option<MessageId>,
    },
}

pub struct TelegramOutbox {
    bot: Bot,
    chat_id: ChatId,
    origin: Origin,
}

impl TelegramOutbox {
    pub fn new(bot: Bot, chat_id: ChatId, origin: Origin) -> Self {
        Self { bot, chat_id, origin }
    }

    async fn send_view(&self, view: View) -> Result<(), RequestError> {
        let mut req = self.bot.send_message(self.chat_id, view.text);
        if view.markup == Markup::Html {
            req = req.parse_mode(ParseMode::Html);
        }
        if let Some(kb) = view.keyboard.as_ref() {
            req = req.reply_markup(keyboard(kb));
        }
        req.await?;
        Ok(())
    }

    async fn edit_view(&self, message_id: MessageId, view: View) -> Result<(), RequestError> {
        let mut req = self.bot.edit_message_text(self.chat_id, message_id, view.text);
        if view.markup == Markup::Html {
            req = req.parse_mode(ParseMode::Html);
        }
        if let Some(kb) = view.keyboard.as_ref() {
            req = req.reply_markup(keyboard(kb));
        }
        match req.await {
            Ok(_) => Ok(()),
            // Re-rendering an unchanged screen (e.g. picking the current font).
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn execute(&self, reply: Reply) -> Result<(), RequestError> {
        match reply {
            Reply::Screen(view) => match &self.origin {
                Origin::Callback { message_id: Some(id), .. } => self.edit_view(*id, view).await,
                _ => self.send_view(view).await,
            },
            Reply::Message(view) => self.send_view(view).await,
            Reply::Toast(text) => match &self.origin {
                Origin::Callback { query_id, .. } => {
                    let mut req = self.bot.answer_callback_query(query_id.clone());
                    if let Some(text) = text {
                        req = req.text(text);
                    }
                    req.await?;
                    Ok(())
                }
                Origin::Message => match text {
                    Some(text) => self.send_view(View::plain(text)).await,
                    None => Ok(()),
                },
            },
            Reply::Document { file_ref, caption } => {
                self.bot
                    .send_document(self.chat_id, InputFile::file_id(file_ref))
                    .caption(caption)
                    .await?;
                Ok(())
            }
            Reply::Forward { chat_id, text } => {
                self.bot.send_message(ChatId(chat_id), text).await?;
                Ok(())
            }
            Reply::Typing => {
                self.bot.send_chat_action(self.chat_id, ChatAction::Typing).await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Outbox for TelegramOutbox {
    async fn deliver(&self, reply: Reply) -> filehub_core::Result<()> {
        self.execute(reply)
            .await
            .map_err(|e| HubError::Transport(e.to_string()))
    }
}

fn keyboard(rows: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .filter_map(|b| match &b.action {
                ButtonAction::Callback(cb) => {
                    Some(InlineKeyboardButton::callback(b.label.clone(), cb.to_string()))
                }
                ButtonAction::Url(url) => match reqwest::Url::parse(url) {
                    Ok(url) => Some(InlineKeyboardButton::url(b.label.clone(), url)),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "dropping button with bad URL");
                        None
                    }
                },
            })
            .collect::<Vec<_>>()
    }))
}
