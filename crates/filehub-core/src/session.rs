//! Per-user menu position and pending feedback, held in memory.
//!
//! The screen a user is on and whether their next text is feedback are kept
//! apart: opening the feedback prompt arms a marker that survives navigation
//! and is consumed by the next free-text message.

use crate::store::ChatMode;
use dashmap::{DashMap, DashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Home,
    Data { page: usize },
    FileActions { index: usize },
    FileDetails { index: usize },
    AiLinks,
    DeepseekMenu,
    DeepseekActive { mode: ChatMode },
    Settings,
    FeedbackPrompt,
}

/// Where a free-text message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRoute {
    Feedback,
    Chat,
}

#[derive(Debug, Default)]
pub struct SessionTable {
    screens: DashMap<i64, Session>,
    awaiting_feedback: DashSet<i64>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i64) -> Session {
        self.screens.get(&user_id).map(|s| *s).unwrap_or_default()
    }

    /// Record the new screen; returns the previous one. Pending feedback is untouched.
    pub fn enter(&self, user_id: i64, next: Session) -> Session {
        let prev = self.screens.insert(user_id, next).unwrap_or_default();
        if prev != next {
            tracing::trace!(user_id, ?prev, ?next, "session transition");
        }
        prev
    }

    /// Arm feedback capture for the user's next text.
    pub fn await_feedback(&self, user_id: i64) {
        self.awaiting_feedback.insert(user_id);
    }

    pub fn is_awaiting_feedback(&self, user_id: i64) -> bool {
        self.awaiting_feedback.contains(&user_id)
    }

    /// Route one free-text message, consuming the feedback marker if armed.
    pub fn route_text(&self, user_id: i64) -> TextRoute {
        if self.awaiting_feedback.remove(&user_id).is_some() {
            TextRoute::Feedback
        } else {
            TextRoute::Chat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_users_start_home() {
        let table = SessionTable::new();
        assert_eq!(table.get(42), Session::Home);
        assert_eq!(table.route_text(42), TextRoute::Chat);
    }

    #[test]
    fn enter_returns_previous() {
        let table = SessionTable::new();
        assert_eq!(table.enter(1, Session::Settings), Session::Home);
        assert_eq!(table.enter(1, Session::Data { page: 2 }), Session::Settings);
        assert_eq!(table.get(1), Session::Data { page: 2 });
        assert_eq!(table.get(2), Session::Home);
    }

    #[test]
    fn feedback_marker_survives_navigation_and_is_one_shot() {
        let table = SessionTable::new();
        table.await_feedback(1);
        table.enter(1, Session::Home);
        table.enter(1, Session::DeepseekActive { mode: ChatMode::Coder });
        assert!(table.is_awaiting_feedback(1));
        assert!(!table.is_awaiting_feedback(2));

        assert_eq!(table.route_text(1), TextRoute::Feedback);
        assert_eq!(table.route_text(1), TextRoute::Chat);
        assert!(!table.is_awaiting_feedback(1));
    }
}
