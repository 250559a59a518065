//! Hub configuration loaded from the environment.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | BOT_TOKEN | "" | Telegram bot credential. |
//! | ADMIN_IDS | "" | Comma-separated user ids allowed to upload and `/setdesc`. |
//! | GROUP_CHAT_ID | 0 | Chat that receives feedback. 0 = not configured. |
//! | DEEPSEEK_API_KEY | "" | Bearer token for the chat endpoint. |
//! | DEEPSEEK_API_URL | api.deepseek.com | Chat completions endpoint. |
//! | DEEPSEEK_MODEL | deepseek-chat | Model name sent with every request. |
//! | MAX_DOC_SIZE_MB | 50 | Largest accepted admin upload. |
//! | DATA_DIR | data | Directory holding `files.json` and `users.json`. |
//! | POLLING_INTERVAL | 0.5 | Seconds between update polls. |
//!
//! An optional TOML file (path in `FILEHUB_CONFIG`, default `config/filehub`) is
//! layered underneath the environment.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    pub bot_token: String,
    pub admin_ids: Vec<i64>,
    /// Where feedback is forwarded. `None` when GROUP_CHAT_ID is unset or 0.
    pub feedback_chat_id: Option<i64>,
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub max_doc_size_mb: u64,
    pub data_dir: PathBuf,
    pub polling_interval: Duration,
}

/// Flat shape of the layered sources before normalization.
#[derive(Debug, Deserialize)]
struct RawConfig {
    bot_token: String,
    admin_ids: String,
    group_chat_id: i64,
    deepseek_api_key: String,
    deepseek_api_url: String,
    deepseek_model: String,
    max_doc_size_mb: u64,
    data_dir: String,
    polling_interval: f64,
}

impl HubConfig {
    /// Load from `FILEHUB_CONFIG` (if present) and the process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_sources(None)
    }

    /// Same as [`HubConfig::load`] but reads variables from `env` instead of the
    /// process environment when given.
    pub fn from_sources(env: Option<HashMap<String, String>>) -> Result<Self, config::ConfigError> {
        let file = std::env::var("FILEHUB_CONFIG").unwrap_or_else(|_| "config/filehub".to_string());
        let builder = config::Config::builder()
            .set_default("bot_token", "")?
            .set_default("admin_ids", "")?
            .set_default("group_chat_id", 0_i64)?
            .set_default("deepseek_api_key", "")?
            .set_default("deepseek_api_url", DEFAULT_API_URL)?
            .set_default("deepseek_model", DEFAULT_MODEL)?
            .set_default("max_doc_size_mb", 50_i64)?
            .set_default("data_dir", "data")?
            .set_default("polling_interval", 0.5_f64)?
            .add_source(config::File::with_name(&file).required(false))
            .add_source(config::Environment::default().try_parsing(true).source(env));

        let raw: RawConfig = builder.build()?.try_deserialize()?;
        Ok(raw.into())
    }

}

impl From<RawConfig> for HubConfig {
    fn from(raw: RawConfig) -> Self {
        let polling = if raw.polling_interval.is_finite() && raw.polling_interval > 0.0 {
            raw.polling_interval
        } else {
            0.5
        };
        Self {
            bot_token: raw.bot_token.trim().to_string(),
            admin_ids: parse_admin_ids(&raw.admin_ids),
            feedback_chat_id: Some(raw.group_chat_id).filter(|id| *id != 0),
            api_key: raw.deepseek_api_key.trim().to_string(),
            api_url: raw.deepseek_api_url.trim().to_string(),
            model: raw.deepseek_model.trim().to_string(),
            max_doc_size_mb: raw.max_doc_size_mb,
            data_dir: Path::new(raw.data_dir.trim()).to_path_buf(),
            polling_interval: Duration::from_secs_f64(polling),
        }
    }
}

/// Comma-separated ids; entries that are not plain digits are dropped.
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|s| s.parse().ok())
        .collect()
}
