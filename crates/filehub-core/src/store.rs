//! Whole-document JSON store for user profiles and the file catalog.
//!
//! Every read parses the entire file and every mutation rewrites it. Each
//! document has its own lock; all operations on one document are serialized.
//! Writes overwrite in place, so a crash mid-write can leave a truncated file.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const UPLOAD_DESCRIPTION: &str = "Description pending. Use /setdesc <index> <text> to update.";
const MISSING_DESCRIPTION: &str = "No details provided.";

/// Presentation style applied to Home and Data screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Font {
    Small,
    #[default]
    Normal,
    Big,
    Code,
}

impl Font {
    pub const ALL: [Font; 4] = [Font::Small, Font::Normal, Font::Big, Font::Code];

    pub fn as_str(&self) -> &'static str {
        match self {
            Font::Small => "small",
            Font::Normal => "normal",
            Font::Big => "big",
            Font::Code => "code",
        }
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deepseek response style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Normal,
    Coder,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Normal => "normal",
            ChatMode::Coder => "coder",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub font: Font,
    #[serde(default = "default_true")]
    pub feedback_popup: bool,
    #[serde(default)]
    pub deepseek_mode: ChatMode,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            font: Font::Normal,
            feedback_popup: true,
            deepseek_mode: ChatMode::Normal,
        }
    }
}

/// A single-field profile change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Font(Font),
    FeedbackPopup(bool),
    DeepseekMode(ChatMode),
}

impl ProfileField {
    fn apply(self, profile: &mut UserProfile) {
        match self {
            ProfileField::Font(font) => profile.font = font,
            ProfileField::FeedbackPopup(on) => profile.feedback_popup = on,
            ProfileField::DeepseekMode(mode) => profile.deepseek_mode = mode,
        }
    }
}

fn default_description() -> String {
    MISSING_DESCRIPTION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    pub file_id: String,
}

impl FileEntry {
    /// Entry for a fresh admin upload.
    pub fn uploaded(title: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: UPLOAD_DESCRIPTION.to_string(),
            file_id: file_id.into(),
        }
    }

    /// Title for display; untitled entries fall back to `File <n>` (1-based).
    pub fn display_title(&self, index: usize) -> String {
        if self.title.trim().is_empty() {
            format!("File {}", index + 1)
        } else {
            self.title.clone()
        }
    }
}

/// `{ "items": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<FileEntry>,
}

/// `{ "<user_id>": {...} }`
pub type UsersDocument = BTreeMap<String, UserProfile>;

/// Create the parent directory and write `default` at `path` if the file does not exist.
pub async fn ensure_document(path: &Path, default: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    let body = serde_json::to_string_pretty(default)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

/// One JSON document on disk with its own lock.
pub struct JsonFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ensure(&self, default: &Value) -> Result<()> {
        ensure_document(&self.path, default).await
    }

    /// Parse the whole document. A missing file is created as `{}` first.
    pub async fn read<T: DeserializeOwned>(&self) -> Result<T> {
        self.ensure(&Value::Object(Default::default())).await?;
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Serialize `doc` pretty-printed and overwrite the file.
    pub async fn write<T: Serialize>(&self, doc: &T) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store(doc).await
    }

    /// Read, apply `f`, and write back while holding the lock for the whole cycle.
    /// The document is only rewritten when `f` reports a change.
    pub async fn update<T, R, F>(&self, f: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T) -> (R, bool),
    {
        self.ensure(&Value::Object(Default::default())).await?;
        let _guard = self.lock.lock().await;
        let mut doc: T = self.load().await?;
        let (out, changed) = f(&mut doc);
        if changed {
            self.store(&doc).await?;
        }
        Ok(out)
    }

    async fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn store<T: Serialize>(&self, doc: &T) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }
}

/// Users and catalog documents under one data directory.
pub struct Store {
    users: JsonFile,
    files: JsonFile,
}

impl Store {
    pub fn new(users_path: impl Into<PathBuf>, files_path: impl Into<PathBuf>) -> Self {
        Self {
            users: JsonFile::new(users_path),
            files: JsonFile::new(files_path),
        }
    }

    /// Store rooted at `data_dir` (`users.json`, `files.json`), creating both documents.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let store = Self::new(dir.join("users.json"), dir.join("files.json"));
        store.users.ensure(&serde_json::json!({})).await?;
        store.files.ensure(&serde_json::json!({ "items": [] })).await?;
        Ok(store)
    }

    /// Existing profile, or defaults persisted on first sight.
    pub async fn get_user(&self, user_id: i64) -> Result<UserProfile> {
        let key = user_id.to_string();
        self.users
            .update(|users: &mut UsersDocument| {
                if let Some(profile) = users.get(&key) {
                    return (profile.clone(), false);
                }
                let profile = UserProfile::default();
                users.insert(key.clone(), profile.clone());
                (profile, true)
            })
            .await
    }

    /// Overwrite one field. Last writer wins.
    pub async fn set_user(&self, user_id: i64, field: ProfileField) -> Result<UserProfile> {
        let key = user_id.to_string();
        self.users
            .update(|users: &mut UsersDocument| {
                let profile = users.entry(key.clone()).or_default();
                field.apply(profile);
                (profile.clone(), true)
            })
            .await
    }

    /// Append to the catalog and return the new entry's index.
    pub async fn add_file(&self, entry: FileEntry) -> Result<usize> {
        self.files
            .update(|catalog: &mut Catalog| {
                catalog.items.push(entry);
                (catalog.items.len() - 1, true)
            })
            .await
    }

    pub async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let catalog: Catalog = self.files.read().await?;
        Ok(catalog.items)
    }

    pub async fn file(&self, index: usize) -> Result<Option<FileEntry>> {
        let mut items = self.list_files().await?;
        if index < items.len() {
            Ok(Some(items.swap_remove(index)))
        } else {
            Ok(None)
        }
    }

    /// Replace the description at `index`. Returns false (document untouched) when out of bounds.
    pub async fn set_description(&self, index: usize, description: &str) -> Result<bool> {
        self.files
            .update(|catalog: &mut Catalog| match catalog.items.get_mut(index) {
                Some(entry) => {
                    entry.description = description.to_string();
                    (true, true)
                }
                None => (false, false),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        ensure_document(&path, &serde_json::json!({ "a": 1 })).await.unwrap();
        ensure_document(&path, &serde_json::json!({ "b": 2 })).await.unwrap();
        let doc: Value = JsonFile::new(&path).read().await.unwrap();
        assert_eq!(doc, serde_json::json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn read_missing_file_creates_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("fresh.json"));
        let doc: Value = file.read().await.unwrap();
        assert_eq!(doc, serde_json::json!({}));
        assert!(file.path().exists());
    }

    #[tokio::test]
    async fn write_replaces_document_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("data").join("files.json"));
        let catalog = Catalog {
            items: vec![
                FileEntry::uploaded("a.pdf", "ref-a"),
                FileEntry::uploaded("", "ref-b"),
            ],
        };
        file.write(&catalog).await.unwrap();

        let back: Catalog = file.read().await.unwrap();
        assert_eq!(back.items, catalog.items);
        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(raw.starts_with("{\n  \"items\": ["));
        assert!(raw.contains("\"file_id\": \"ref-b\""));
    }

    #[tokio::test]
    async fn corrupt_document_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = Store::new(&path, dir.path().join("files.json"));
        let err = store.get_user(1).await.unwrap_err();
        assert!(matches!(err, crate::HubError::Decode(_)));
    }

    #[tokio::test]
    async fn documents_are_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        store.get_user(5).await.unwrap();
        let raw = std::fs::read_to_string(dir.path().join("users.json")).unwrap();
        assert!(raw.contains("\n  \"5\": {"));
        assert!(raw.contains("\"deepseek_mode\": \"normal\""));
    }

    #[tokio::test]
    async fn partial_profile_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"{"9": {"font": "code"}}"#).unwrap();
        let store = Store::new(&path, dir.path().join("files.json"));
        let profile = store.get_user(9).await.unwrap();
        assert_eq!(profile.font, Font::Code);
        assert!(profile.feedback_popup);
        assert_eq!(profile.deepseek_mode, ChatMode::Normal);
    }

    #[test]
    fn untitled_entries_use_position() {
        let entry = FileEntry::uploaded("", "ref");
        assert_eq!(entry.display_title(2), "File 3");
        assert_eq!(FileEntry::uploaded("a.pdf", "ref").display_title(0), "a.pdf");
    }

    #[test]
    fn entry_without_description_gets_placeholder() {
        let entry: FileEntry = serde_json::from_str(r#"{"title": "t", "file_id": "x"}"#).unwrap();
        assert_eq!(entry.description, "No details provided.");
    }
}
