//! Screens: text plus inline keyboard, independent of the chat transport.

use crate::callback::Callback;
use crate::store::{ChatMode, FileEntry, Font, UserProfile};

pub const PAGE_SIZE: usize = 6;
/// Longest single message the transport accepts, in characters.
pub const MESSAGE_LIMIT: usize = 4096;

pub const NAV_HOME: &str = "Home";
pub const NAV_DEEPSEEK: &str = "Deepseek";
pub const NAV_SETTINGS: &str = "Setting";
pub const TOP_DATA: &str = "DATA";
pub const AI_LINKS: &str = "AI Links";

const AI_SITES: [(&str, &str); 4] = [
    ("ChatGPT", "https://chat.openai.com/"),
    ("Gemini", "https://gemini.google.com/"),
    ("Meta AI", "https://www.meta.ai/"),
    ("Grok", "https://x.ai/"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(Callback),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: impl Into<String>, cb: Callback) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(cb),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub text: String,
    pub markup: Markup,
    pub keyboard: Option<Keyboard>,
}

impl View {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::Plain,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Every callback carried by the keyboard, row by row.
    pub fn callbacks(&self) -> Vec<Callback> {
        self.keyboard
            .iter()
            .flatten()
            .flatten()
            .filter_map(|b| match b.action {
                ButtonAction::Callback(cb) => Some(cb),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap `text` in the user's font. Always HTML so escaping stays uniform.
pub fn apply_font(text: &str, font: Font) -> View {
    let escaped = html_escape(text);
    let text = match font {
        Font::Small | Font::Normal => escaped,
        Font::Big => format!("<b>{}</b>", escaped),
        Font::Code => format!("<code>{}</code>", escaped),
    };
    View {
        text,
        markup: Markup::Html,
        keyboard: None,
    }
}

fn bottom_nav() -> Vec<Button> {
    vec![
        Button::callback(NAV_HOME, Callback::NavHome),
        Button::callback(NAV_DEEPSEEK, Callback::NavDeepseek),
        Button::callback(NAV_SETTINGS, Callback::NavSettings),
    ]
}

fn back(to: Callback) -> Vec<Button> {
    vec![Button::callback("Back", to)]
}

pub fn home(font: Font) -> View {
    apply_font("Welcome to your hub.\nHome | Deepseek | Setting", font).with_keyboard(vec![
        vec![Button::callback(TOP_DATA, Callback::TopData)],
        vec![Button::callback(AI_LINKS, Callback::AiLinks)],
        bottom_nav(),
    ])
}

/// Visible slice of the catalog for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub start: usize,
    pub end: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

pub fn paginate(total: usize, page: usize, page_size: usize) -> PageWindow {
    let start = page.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    PageWindow {
        page,
        start,
        end,
        has_prev: page > 0,
        has_next: end < total,
    }
}

pub fn data(items: &[FileEntry], page: usize, font: Font) -> View {
    let total = items.len();
    let window = paginate(total, page, PAGE_SIZE);
    let text = format!("DATA: {} files\nSelect a file to Download or see Details.", total);

    let mut rows = vec![
        vec![Button::callback(TOP_DATA, Callback::TopData)],
        back(Callback::NavHome),
    ];
    for (idx, item) in items[window.start..window.end].iter().enumerate() {
        let idx = window.start + idx;
        rows.push(vec![Button::callback(item.display_title(idx), Callback::File(idx))]);
    }

    let mut nav = Vec::new();
    if window.has_prev {
        nav.push(Button::callback("◀ Prev", Callback::DataPage(page - 1)));
    }
    if window.has_next {
        nav.push(Button::callback("Next ▶", Callback::DataPage(page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    rows.push(bottom_nav());

    apply_font(&text, font).with_keyboard(rows)
}

pub fn file_actions(index: usize, entry: &FileEntry) -> View {
    View::plain(format!("{}\nChoose: Download or Details.", entry.display_title(index))).with_keyboard(vec![
        vec![Button::callback("Download", Callback::Download(index))],
        vec![Button::callback("Details", Callback::Details(index))],
        back(Callback::TopData),
        bottom_nav(),
    ])
}

pub fn file_details(index: usize, entry: &FileEntry) -> View {
    View::plain(format!(
        "{}\n\nDetails:\n{}",
        entry.display_title(index),
        entry.description
    ))
    .with_keyboard(vec![back(Callback::File(index)), bottom_nav()])
}

pub fn ai_links() -> View {
    let mut rows: Keyboard = AI_SITES
        .iter()
        .map(|(label, url)| vec![Button::url(*label, *url)])
        .collect();
    rows.push(back(Callback::NavHome));
    rows.push(bottom_nav());
    View::plain("AI Links:").with_keyboard(rows)
}

pub fn deepseek_menu() -> View {
    View::plain("Deepseek mode:\nChoose Normal or Coder.").with_keyboard(vec![
        vec![
            Button::callback("Normal", Callback::DeepseekMode(ChatMode::Normal)),
            Button::callback("Coder", Callback::DeepseekMode(ChatMode::Coder)),
        ],
        back(Callback::NavHome),
        bottom_nav(),
    ])
}

pub fn deepseek_ready(mode: ChatMode) -> View {
    View::plain(format!("Deepseek mode is now {}. Send a message.", mode)).with_keyboard(vec![bottom_nav()])
}

pub fn settings(profile: &UserProfile) -> View {
    let text = format!(
        "Settings\nFont: {}\nFeedback popup: {}",
        profile.font,
        if profile.feedback_popup { "on" } else { "off" }
    );
    let fonts = Font::ALL
        .iter()
        .map(|f| {
            let label = match f {
                Font::Small => "Font: Small",
                Font::Normal => "Normal",
                Font::Big => "Big",
                Font::Code => "Code",
            };
            Button::callback(label, Callback::Font(*f))
        })
        .collect();
    View::plain(text).with_keyboard(vec![
        fonts,
        vec![Button::callback("Feedback", Callback::FeedbackOpen)],
        back(Callback::NavHome),
        bottom_nav(),
    ])
}

pub fn feedback_prompt() -> View {
    View::plain("Send your feedback message now. It will be forwarded to the group.")
}

pub fn feedback_popup() -> View {
    View::plain("How do you feel with this bot?").with_keyboard(vec![
        vec![Button::callback("Don’t show again", Callback::PopupDisable)],
        vec![Button::callback("Feedback", Callback::FeedbackOpen)],
    ])
}

pub fn help() -> View {
    View::plain(
        "Commands:\n\
         /start - Home\n\
         /data - DATA\n\
         /deepseek - Deepseek\n\
         /settings - Settings\n\
         Admin:\n\
         Upload file by sending as document.\n\
         /setdesc <index> <text> - set file description.",
    )
}

/// Split `text` into chunks of at most `limit` characters, preferring line breaks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(limit) {
            if piece.len() == limit {
                chunks.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
