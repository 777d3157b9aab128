//! The controller's view of the user interface.

use crate::view_model::{ProfileView, ResourceListView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Register,
    VerifyEmail { email: String },
    Login,
    Profile,
    Objects,
    ResetPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient, non-blocking message about the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait UiSurface: Send + Sync {
    fn navigate(&self, view: View);
    fn notify(&self, notice: Notice);
    /// Blocks until the user answers; `false` cancels the action.
    fn confirm(&self, prompt: &str) -> bool;
    fn render_profile(&self, profile: &ProfileView);
    fn render_resources(&self, list: &ResourceListView);
    fn reset_resource_form(&self);
}
