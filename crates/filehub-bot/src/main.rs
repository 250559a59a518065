//! File hub bot: Telegram long polling in front of the filehub core router.
//! Menu: Home | Deepseek | Setting. Admins upload documents into the DATA catalog.

mod outbox;

use filehub_core::{
    Callback, Command, DeepseekClient, Event, HubConfig, HubError, Input, Router, RouterSettings,
    Sender, Store, Upload,
};
use outbox::{Origin, TelegramOutbox};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::User;
use teloxide::update_listeners::Polling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[filehub-bot] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "filehub-bot stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), HubError> {
    let config = HubConfig::load()?;
    if config.bot_token.is_empty() {
        return Err(config::ConfigError::Message("BOT_TOKEN is not set".to_string()).into());
    }

    let store = Arc::new(Store::open(&config.data_dir).await?);
    let chat = Arc::new(DeepseekClient::from_config(&config)?);
    let router = Arc::new(Router::new(store, chat, RouterSettings::from_config(&config)));

    tracing::info!(
        version = filehub_core::version(),
        data_dir = %config.data_dir.display(),
        admins = config.admin_ids.len(),
        feedback_chat = ?config.feedback_chat_id,
        "filehub-bot started"
    );

    let bot = Bot::new(config.bot_token.clone());
    let listener = Polling::builder(bot.clone())
        .timeout(poll_timeout(config.polling_interval))
        .build();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    Ok(())
}

/// Long-poll wait per getUpdates call; Telegram takes whole seconds.
fn poll_timeout(interval: Duration) -> Duration {
    Duration::from_secs(interval.as_secs_f64().ceil().max(1.0) as u64)
}

fn sender_of(user: &User) -> Sender {
    Sender {
        id: user.id.0 as i64,
        handle: user.username.clone().unwrap_or_else(|| user.full_name()),
    }
}

fn message_input(msg: &Message) -> Option<Input> {
    if let Some(doc) = msg.document() {
        return Some(Input::Document(Upload {
            file_ref: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
            size_bytes: u64::from(doc.file.size),
        }));
    }
    if let Some(photos) = msg.photo() {
        // Telegram lists sizes smallest first.
        let best = photos.last()?;
        return Some(Input::Photo {
            file_ref: best.file.id.clone(),
            caption: msg.caption().map(str::to_string),
        });
    }
    let text = msg.text()?;
    if Command::is_command(text) {
        return Command::parse(text).map(Input::Command);
    }
    Some(Input::Text(text.to_string()))
}

async fn handle_message(bot: Bot, msg: Message, router: Arc<Router>) -> Result<(), HubError> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(input) = message_input(&msg) else {
        tracing::debug!(chat_id = msg.chat.id.0, "ignoring unsupported message");
        return Ok(());
    };

    let event = Event {
        chat_id: msg.chat.id.0,
        sender: sender_of(user),
        input,
    };
    let out = TelegramOutbox::new(bot, msg.chat.id, Origin::Message);
    router.handle(event, &out).await
}

async fn handle_callback(bot: Bot, q: CallbackQuery, router: Arc<Router>) -> Result<(), HubError> {
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let origin = Origin::Callback {
        query_id: q.id.clone(),
        message_id: Some(message.id),
    };

    let parsed = q.data.as_deref().map(str::parse::<Callback>);
    let cb = match parsed {
        Some(Ok(cb)) => cb,
        other => {
            tracing::debug!(token = ?q.data, error = ?other.and_then(Result::err), "ignoring callback");
            bot.answer_callback_query(q.id.clone())
                .await
                .map_err(|e| HubError::Transport(e.to_string()))?;
            return Ok(());
        }
    };

    let event = Event {
        chat_id: chat_id.0,
        sender: sender_of(&q.from),
        input: Input::Button(cb),
    };
    let out = TelegramOutbox::new(bot, chat_id, origin);
    router.handle(event, &out).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_timeout_rounds_up_to_whole_seconds() {
        assert_eq!(poll_timeout(Duration::from_millis(500)), Duration::from_secs(1));
        assert_eq!(poll_timeout(Duration::from_millis(2500)), Duration::from_secs(3));
        assert_eq!(poll_timeout(Duration::from_secs(10)), Duration::from_secs(10));
    }
}
