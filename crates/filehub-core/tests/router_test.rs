//! Integration test: router behavior against a temporary store, a scripted chat
//! client, and an outbox that records every reply.

use async_trait::async_trait;
use filehub_core::router::CHAT_UNAVAILABLE;
use filehub_core::{
    ButtonAction, Callback, ChatClient, ChatMessage, ChatMode, Command, Event, FileEntry, Font,
    HubError, Input, Markup, Outbox, Reply, Router, RouterSettings, Sender, Session, Store, Upload,
    View,
};
use std::sync::{Arc, Mutex};

const ADMIN: i64 = 1;
const USER: i64 = 2;
const GROUP: i64 = -500;

#[derive(Default)]
struct RecordingOutbox {
    replies: Mutex<Vec<Reply>>,
}

impl RecordingOutbox {
    fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.replies.lock().unwrap())
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn deliver(&self, reply: Reply) -> filehub_core::Result<()> {
        self.replies.lock().unwrap().push(reply);
        Ok(())
    }
}

enum Script {
    Answer(String),
    Fail(fn() -> HubError),
}

/// Replies with a fixed answer (or fails) and remembers every call.
struct ScriptedChat {
    script: Script,
    calls: Mutex<Vec<(Vec<ChatMessage>, ChatMode)>>,
}

impl ScriptedChat {
    fn with(script: Script) -> Self {
        Self { script, calls: Mutex::new(Vec::new()) }
    }

    fn answering(text: &str) -> Self {
        Self::with(Script::Answer(text.to_string()))
    }

    fn failing() -> Self {
        Self::with(Script::Fail(|| HubError::ChatApi { status: 503, body: "overloaded".to_string() }))
    }

    /// A 2xx whose body is not JSON, e.g. a proxy error page.
    fn garbled() -> Self {
        Self::with(Script::Fail(|| {
            HubError::ChatReply(serde_json::from_str::<serde_json::Value>("<html>gateway</html>").unwrap_err())
        }))
    }

    fn calls(&self) -> Vec<(Vec<ChatMessage>, ChatMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn chat(&self, history: &[ChatMessage], mode: ChatMode) -> filehub_core::Result<String> {
        self.calls.lock().unwrap().push((history.to_vec(), mode));
        match &self.script {
            Script::Answer(a) => Ok(a.clone()),
            Script::Fail(make) => Err(make()),
        }
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    router: Router,
    chat: Arc<ScriptedChat>,
    out: RecordingOutbox,
}

impl Harness {
    async fn new(chat: ScriptedChat) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).await.unwrap());
        let chat = Arc::new(chat);
        let settings = RouterSettings {
            admin_ids: [ADMIN].into_iter().collect(),
            feedback_chat_id: Some(GROUP),
            max_doc_size_mb: 50,
        };
        let router = Router::new(store, chat.clone(), settings);
        Self { _dir: dir, router, chat, out: RecordingOutbox::default() }
    }

    async fn send(&self, user: i64, input: Input) -> Vec<Reply> {
        let event = Event {
            chat_id: user,
            sender: Sender { id: user, handle: format!("user{}", user) },
            input,
        };
        self.router.handle(event, &self.out).await.unwrap();
        self.out.take()
    }

    async fn seed(&self, n: usize) {
        for i in 0..n {
            self.router
                .store()
                .add_file(FileEntry::uploaded(format!("doc{}.pdf", i), format!("ref{}", i)))
                .await
                .unwrap();
        }
    }
}

fn upload(name: &str, size_bytes: u64) -> Input {
    Input::Document(Upload {
        file_ref: format!("ref-{}", name),
        file_name: Some(name.to_string()),
        size_bytes,
    })
}

fn message_texts(replies: &[Reply]) -> Vec<String> {
    replies
        .iter()
        .filter_map(|r| match r {
            Reply::Message(v) => Some(v.text.clone()),
            _ => None,
        })
        .collect()
}

fn only_screen(replies: &[Reply]) -> View {
    let screens: Vec<&View> = replies
        .iter()
        .filter_map(|r| match r {
            Reply::Screen(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(screens.len(), 1, "expected one screen in {:?}", replies);
    screens[0].clone()
}

#[tokio::test]
async fn start_renders_home_in_user_font() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    h.router.store().set_user(USER, filehub_core::ProfileField::Font(Font::Big)).await.unwrap();

    let replies = h.send(USER, Input::Command(Command::Start)).await;
    let home = only_screen(&replies);
    assert_eq!(home.markup, Markup::Html);
    assert!(home.text.starts_with("<b>Welcome to your hub."));
    assert!(home.callbacks().contains(&Callback::TopData));
    assert_eq!(h.router.session(USER), Session::Home);
}

#[tokio::test]
async fn buttons_are_acknowledged_before_the_screen() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    let replies = h.send(USER, Input::Button(Callback::NavSettings)).await;
    assert_eq!(replies[0], Reply::Toast(None));
    assert!(matches!(replies[1], Reply::Screen(_)));
    assert_eq!(h.router.session(USER), Session::Settings);
}

#[tokio::test]
async fn data_pages_track_session() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    h.seed(14).await;

    let replies = h.send(USER, Input::Button(Callback::DataPage(2))).await;
    let screen = only_screen(&replies);
    assert!(screen.text.contains("DATA: 14 files"));
    assert!(screen.callbacks().contains(&Callback::File(13)));
    assert!(!screen.callbacks().contains(&Callback::File(11)));
    assert_eq!(h.router.session(USER), Session::Data { page: 2 });
}

#[tokio::test]
async fn invalid_file_index_only_notifies() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    h.seed(2).await;
    h.send(USER, Input::Button(Callback::TopData)).await;

    for cb in [Callback::File(5), Callback::Download(5), Callback::Details(2)] {
        let replies = h.send(USER, Input::Button(cb)).await;
        assert_eq!(replies, vec![Reply::Toast(Some("Invalid file.".to_string()))]);
    }
    assert_eq!(h.router.session(USER), Session::Data { page: 0 });
}

#[tokio::test]
async fn file_actions_details_and_download() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    h.seed(3).await;

    let actions = only_screen(&h.send(USER, Input::Button(Callback::File(1))).await);
    assert_eq!(actions.text, "doc1.pdf\nChoose: Download or Details.");
    assert_eq!(h.router.session(USER), Session::FileActions { index: 1 });

    let details = only_screen(&h.send(USER, Input::Button(Callback::Details(1))).await);
    assert!(details.text.starts_with("doc1.pdf\n\nDetails:\nDescription pending."));
    assert_eq!(h.router.session(USER), Session::FileDetails { index: 1 });

    let replies = h.send(USER, Input::Button(Callback::Download(1))).await;
    assert_eq!(
        replies,
        vec![
            Reply::Toast(Some("Sending file...".to_string())),
            Reply::Document { file_ref: "ref1".to_string(), caption: "doc1.pdf".to_string() },
        ]
    );
}

#[tokio::test]
async fn mode_selection_persists_and_drives_chat() {
    let h = Harness::new(ScriptedChat::answering("fn main() {}")).await;

    let replies = h.send(USER, Input::Button(Callback::DeepseekMode(ChatMode::Coder))).await;
    assert_eq!(replies[0], Reply::Toast(Some("Mode set: coder".to_string())));
    assert_eq!(h.router.session(USER), Session::DeepseekActive { mode: ChatMode::Coder });

    let replies = h.send(USER, Input::Text("write hello world".to_string())).await;
    assert_eq!(replies[0], Reply::Typing);
    assert_eq!(message_texts(&replies)[0], "fn main() {}");

    let calls = h.chat.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, ChatMode::Coder);
    assert_eq!(calls[0].0, vec![ChatMessage::user("write hello world")]);
}

#[tokio::test]
async fn free_text_goes_to_chat_from_any_screen() {
    let h = Harness::new(ScriptedChat::answering("answer")).await;
    h.send(USER, Input::Button(Callback::NavSettings)).await;

    let replies = h.send(USER, Input::Text("question".to_string())).await;
    let texts = message_texts(&replies);
    assert_eq!(texts[0], "answer");
    assert_eq!(h.chat.calls()[0].1, ChatMode::Normal);
    assert_eq!(h.router.session(USER), Session::DeepseekActive { mode: ChatMode::Normal });
}

#[tokio::test]
async fn popup_follows_reply_until_disabled() {
    let h = Harness::new(ScriptedChat::answering("answer")).await;

    let replies = h.send(USER, Input::Text("q".to_string())).await;
    let popup = match replies.last() {
        Some(Reply::Message(v)) => v.clone(),
        other => panic!("expected popup, got {:?}", other),
    };
    assert_eq!(popup.text, "How do you feel with this bot?");
    assert_eq!(popup.callbacks(), vec![Callback::PopupDisable, Callback::FeedbackOpen]);

    let replies = h.send(USER, Input::Button(Callback::PopupDisable)).await;
    assert_eq!(replies, vec![Reply::Toast(Some("Popup disabled.".to_string()))]);
    assert!(!h.router.store().get_user(USER).await.unwrap().feedback_popup);

    let replies = h.send(USER, Input::Text("q".to_string())).await;
    assert_eq!(message_texts(&replies), vec!["answer".to_string()]);
}

#[tokio::test]
async fn feedback_capture_preempts_chat() {
    let h = Harness::new(ScriptedChat::answering("answer")).await;

    h.send(USER, Input::Button(Callback::FeedbackOpen)).await;
    assert_eq!(h.router.session(USER), Session::FeedbackPrompt);
    assert!(h.router.awaiting_feedback(USER));

    let replies = h.send(USER, Input::Text("great bot".to_string())).await;
    assert_eq!(
        replies,
        vec![
            Reply::Forward {
                chat_id: GROUP,
                text: format!("Feedback from @user{} (ID:{}):\ngreat bot", USER, USER),
            },
            Reply::Message(View::plain("Thanks! Feedback sent.")),
        ]
    );
    assert!(h.chat.calls().is_empty());

    // Capture is one-shot: the next text goes to chat again.
    assert!(!h.router.awaiting_feedback(USER));
    h.send(USER, Input::Text("next".to_string())).await;
    assert_eq!(h.chat.calls().len(), 1);
}

#[tokio::test]
async fn pending_feedback_survives_navigation() {
    let h = Harness::new(ScriptedChat::answering("answer")).await;

    h.send(USER, Input::Button(Callback::FeedbackOpen)).await;
    h.send(USER, Input::Button(Callback::NavHome)).await;
    h.send(USER, Input::Button(Callback::TopData)).await;
    h.send(USER, Input::Photo { file_ref: "photo-1".to_string(), caption: None }).await;
    assert_eq!(h.chat.calls().len(), 1);
    assert!(h.router.awaiting_feedback(USER));

    let replies = h.send(USER, Input::Text("my feedback".to_string())).await;
    assert_eq!(
        replies[0],
        Reply::Forward {
            chat_id: GROUP,
            text: format!("Feedback from @user{} (ID:{}):\nmy feedback", USER, USER),
        }
    );
    assert_eq!(h.chat.calls().len(), 1);
    assert_eq!(h.router.session(USER), Session::Home);
}

#[tokio::test]
async fn photo_sends_reference_with_default_prompt() {
    let h = Harness::new(ScriptedChat::answering("a cat")).await;
    h.send(USER, Input::Photo { file_ref: "photo-123".to_string(), caption: None }).await;
    h.send(
        USER,
        Input::Photo { file_ref: "photo-456".to_string(), caption: Some("what breed?".to_string()) },
    )
    .await;

    let calls = h.chat.calls();
    assert_eq!(calls[0].0[0].content, "User prompt: Describe this image.\nImage file_id: photo-123");
    assert_eq!(calls[1].0[0].content, "User prompt: what breed?\nImage file_id: photo-456");
}

#[tokio::test]
async fn chat_failure_becomes_try_again_message() {
    let h = Harness::new(ScriptedChat::failing()).await;
    let replies = h.send(USER, Input::Text("hello".to_string())).await;
    assert_eq!(replies, vec![Reply::Typing, Reply::Message(View::plain(CHAT_UNAVAILABLE))]);
}

#[tokio::test]
async fn unreadable_chat_reply_becomes_try_again_message() {
    let h = Harness::new(ScriptedChat::garbled()).await;
    let replies = h.send(USER, Input::Text("hi".to_string())).await;
    assert_eq!(replies, vec![Reply::Typing, Reply::Message(View::plain(CHAT_UNAVAILABLE))]);
}

#[tokio::test]
async fn non_admin_upload_is_silent() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    let replies = h.send(USER, upload("notes.pdf", 1024)).await;
    assert!(replies.is_empty());
    assert!(h.router.store().list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_upload_checks_size_then_indexes() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;

    let replies = h.send(ADMIN, upload("huge.iso", 60 * 1024 * 1024)).await;
    assert_eq!(message_texts(&replies), vec!["File too large (60.0 MB). Max 50 MB.".to_string()]);
    assert!(h.router.store().list_files().await.unwrap().is_empty());

    let replies = h.send(ADMIN, upload("notes.pdf", 2048)).await;
    assert_eq!(
        message_texts(&replies),
        vec!["Uploaded and indexed: notes.pdf\nUsers can find it in DATA.".to_string()]
    );
    let items = h.router.store().list_files().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].file_id, "ref-notes.pdf");
}

#[tokio::test]
async fn upload_at_exact_limit_is_accepted() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;

    let replies = h.send(ADMIN, upload("edge.bin", 50 * 1024 * 1024)).await;
    assert_eq!(
        message_texts(&replies),
        vec!["Uploaded and indexed: edge.bin\nUsers can find it in DATA.".to_string()]
    );

    let replies = h.send(ADMIN, upload("over.bin", 50 * 1024 * 1024 + 1)).await;
    assert_eq!(message_texts(&replies), vec!["File too large (50.0 MB). Max 50 MB.".to_string()]);
    assert_eq!(h.router.store().list_files().await.unwrap().len(), 1);
}

#[tokio::test]
async fn setdesc_validates_and_updates() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    h.seed(1).await;
    fn setdesc(args: &[&str]) -> Input {
        Input::Command(Command::SetDesc(args.iter().map(|s| s.to_string()).collect()))
    }

    let replies = h.send(ADMIN, setdesc(&["0", "hello"])).await;
    assert_eq!(message_texts(&replies), vec!["Updated description for file 0.".to_string()]);
    assert_eq!(h.router.store().list_files().await.unwrap()[0].description, "hello");

    for out_of_range in ["99", "-1"] {
        let replies = h.send(ADMIN, setdesc(&[out_of_range, "x"])).await;
        assert_eq!(message_texts(&replies), vec!["Invalid index.".to_string()]);
    }
    assert_eq!(h.router.store().list_files().await.unwrap()[0].description, "hello");

    for bad in [&["0"][..], &["zero", "text"][..], &[][..]] {
        let replies = h.send(ADMIN, setdesc(bad)).await;
        assert_eq!(message_texts(&replies), vec!["Usage: /setdesc <index> <description>".to_string()]);
    }

    let replies = h.send(USER, setdesc(&["0", "hijack"])).await;
    assert!(replies.is_empty());
    assert_eq!(h.router.store().list_files().await.unwrap()[0].description, "hello");
}

#[tokio::test]
async fn font_button_persists_and_rerenders_settings() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    let replies = h.send(USER, Input::Button(Callback::Font(Font::Code))).await;
    let screen = only_screen(&replies);
    assert!(screen.text.contains("Font: code"));
    assert_eq!(screen.markup, Markup::Plain);
    assert_eq!(h.router.store().get_user(USER).await.unwrap().font, Font::Code);
}

#[tokio::test]
async fn help_lists_commands() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    let replies = h.send(USER, Input::Command(Command::Help)).await;
    let texts = message_texts(&replies);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Commands:\n/start - Home"));
    assert!(texts[0].contains("/setdesc <index> <text>"));
    assert_eq!(h.router.session(USER), Session::Home);
}

#[tokio::test]
async fn ai_links_screen_offers_sites_and_way_back() {
    let h = Harness::new(ScriptedChat::answering("hi")).await;
    let replies = h.send(USER, Input::Button(Callback::AiLinks)).await;
    assert_eq!(replies[0], Reply::Toast(None));

    let screen = only_screen(&replies);
    assert_eq!(screen.text, "AI Links:");
    let urls: Vec<String> = screen
        .keyboard
        .iter()
        .flatten()
        .flatten()
        .filter_map(|b| match &b.action {
            ButtonAction::Url(url) => Some(url.clone()),
            ButtonAction::Callback(_) => None,
        })
        .collect();
    assert_eq!(urls.len(), 4);
    assert!(urls.contains(&"https://chat.openai.com/".to_string()));
    assert!(screen.callbacks().contains(&Callback::NavHome));
    assert_eq!(h.router.session(USER), Session::AiLinks);
}
