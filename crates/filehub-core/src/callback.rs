//! Button tokens. Parsed once at the boundary; everything past that matches on [`Callback`].

use crate::store::{ChatMode, Font};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    NavHome,
    NavDeepseek,
    NavSettings,
    TopData,
    DataPage(usize),
    File(usize),
    Download(usize),
    Details(usize),
    AiLinks,
    DeepseekMode(ChatMode),
    Font(Font),
    FeedbackOpen,
    PopupDisable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCallback(pub String);

impl fmt::Display for UnknownCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown callback token: {}", self.0)
    }
}

impl std::error::Error for UnknownCallback {}

impl FromStr for Callback {
    type Err = UnknownCallback;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let fixed = match token {
            "nav_home" => Some(Callback::NavHome),
            "nav_deepseek" => Some(Callback::NavDeepseek),
            "nav_settings" => Some(Callback::NavSettings),
            "top_data" => Some(Callback::TopData),
            "ai_links" => Some(Callback::AiLinks),
            "ds_mode_normal" => Some(Callback::DeepseekMode(ChatMode::Normal)),
            "ds_mode_coder" => Some(Callback::DeepseekMode(ChatMode::Coder)),
            "font_small" => Some(Callback::Font(Font::Small)),
            "font_normal" => Some(Callback::Font(Font::Normal)),
            "font_big" => Some(Callback::Font(Font::Big)),
            "font_code" => Some(Callback::Font(Font::Code)),
            "feedback_open" => Some(Callback::FeedbackOpen),
            "popup_disable" => Some(Callback::PopupDisable),
            _ => None,
        };
        if let Some(cb) = fixed {
            return Ok(cb);
        }

        let indexed: [(&str, fn(usize) -> Callback); 4] = [
            ("data_page_", Callback::DataPage),
            ("file_", Callback::File),
            ("download_", Callback::Download),
            ("details_", Callback::Details),
        ];
        indexed
            .iter()
            .find_map(|(prefix, make)| {
                let digits = token.strip_prefix(prefix)?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse::<usize>().ok().map(make)
            })
            .ok_or_else(|| UnknownCallback(token.to_string()))
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::NavHome => f.write_str("nav_home"),
            Callback::NavDeepseek => f.write_str("nav_deepseek"),
            Callback::NavSettings => f.write_str("nav_settings"),
            Callback::TopData => f.write_str("top_data"),
            Callback::DataPage(n) => write!(f, "data_page_{}", n),
            Callback::File(n) => write!(f, "file_{}", n),
            Callback::Download(n) => write!(f, "download_{}", n),
            Callback::Details(n) => write!(f, "details_{}", n),
            Callback::AiLinks => f.write_str("ai_links"),
            Callback::DeepseekMode(mode) => write!(f, "ds_mode_{}", mode),
            Callback::Font(font) => write!(f, "font_{}", font),
            Callback::FeedbackOpen => f.write_str("feedback_open"),
            Callback::PopupDisable => f.write_str("popup_disable"),
        }
    }
}
