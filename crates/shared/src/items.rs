//! Session collection entries: prompt history, todos, and file snippets.
//!
//! All three lists live in `SessionState` and are mutated only through the
//! session manager's commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed prompt/response exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub prompt: String,
    /// Frozen snapshot of the output at completion time
    pub output: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(prompt: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            output: output.into(),
            created_at: Utc::now(),
        }
    }
}

/// A todo list item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoEntry {
    pub id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl TodoEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            is_completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Language/format of a file snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Html,
    Css,
    Javascript,
    Markdown,
    Plaintext,
}

impl FileKind {
    pub const ALL: [FileKind; 5] = [
        FileKind::Html,
        FileKind::Css,
        FileKind::Javascript,
        FileKind::Markdown,
        FileKind::Plaintext,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Html => "html",
            FileKind::Css => "css",
            FileKind::Javascript => "js",
            FileKind::Markdown => "md",
            FileKind::Plaintext => "txt",
        }
    }

    /// Glyph shown next to the file name in list views.
    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Html => "🌐",
            FileKind::Css => "🎨",
            FileKind::Javascript => "⚙",
            FileKind::Markdown => "📄",
            FileKind::Plaintext => "📝",
        }
    }

    /// Guess the kind from a file name's extension, defaulting to plaintext.
    pub fn from_name(name: &str) -> Self {
        match name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
            Some("html") | Some("htm") => FileKind::Html,
            Some("css") => FileKind::Css,
            Some("js") | Some("mjs") => FileKind::Javascript,
            Some("md") | Some("markdown") => FileKind::Markdown,
            _ => FileKind::Plaintext,
        }
    }
}

/// A scratch file kept in the session's file bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub kind: FileKind,
    pub created_at: DateTime<Utc>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>, kind: FileKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content: content.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}

/// The whole observable session: generation status plus the three lists.
///
/// Cloned out as a snapshot for presentation; only the session manager
/// mutates the live copy.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Accumulates streamed chunks for the generation in flight (or the
    /// last one, after it settles)
    pub current_output: String,
    pub is_generating: bool,
    pub history: Vec<HistoryEntry>,
    pub todos: Vec<TodoEntry>,
    pub files: Vec<FileEntry>,
    pub sidebar_visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_todo_starts_incomplete() {
        let todo = TodoEntry::new("water the plants");
        assert!(!todo.is_completed);
        assert_eq!(todo.title, "water the plants");
    }

    #[test]
    fn entry_ids_are_unique() {
        let a = TodoEntry::new("a");
        let b = TodoEntry::new("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn file_kind_from_name() {
        assert_eq!(FileKind::from_name("index.html"), FileKind::Html);
        assert_eq!(FileKind::from_name("app.mjs"), FileKind::Javascript);
        assert_eq!(FileKind::from_name("notes.MD"), FileKind::Markdown);
        assert_eq!(FileKind::from_name("Makefile"), FileKind::Plaintext);
    }

    #[test]
    fn file_kind_serializes_lowercase() {
        let json = serde_json::to_string(&FileKind::Javascript).unwrap();
        assert_eq!(json, "\"javascript\"");
    }

    #[test]
    fn default_state_is_idle_and_empty() {
        let state = SessionState::default();
        assert!(!state.is_generating);
        assert!(state.current_output.is_empty());
        assert!(state.history.is_empty());
    }
}
