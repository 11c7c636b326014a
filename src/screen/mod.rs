//! Screen controllers: the state the display layer renders, plus its notifications.

pub mod auth;
pub mod list;

use serde::Serialize;

use crate::error::TodoError;

pub use auth::AuthScreen;
pub use list::{Draft, ListScreen, ScreenState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
    /// Machine code of the error behind an error notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: description.into(),
            code: None,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            description: description.into(),
            code: None,
        }
    }

    /// Error notice carrying the error's raw message and code.
    pub fn failure(title: impl Into<String>, err: &TodoError) -> Self {
        Self {
            code: Some(err.code()),
            ..Self::error(title, err.to_string())
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Pending notifications, drained by the display layer.
#[derive(Debug, Default)]
pub struct Notices {
    queue: Vec<Notice>,
}

impl Notices {
    pub fn push(&mut self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => tracing::debug!(title = %notice.title, "notice"),
            NoticeKind::Error => {
                tracing::debug!(title = %notice.title, description = %notice.description, "error notice")
            }
        }
        self.queue.push(notice);
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.queue)
    }
}
