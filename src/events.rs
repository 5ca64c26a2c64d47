//! Screens, shared UI state, and user-visible notices.

use chrono::{DateTime, Local};

use crate::records::OperationKind;

/// Screen currently shown by the TUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// First-run gateway setup.
    InitialSetup,
    /// Sign in / sign up.
    Login,
    /// Navigation menu.
    Home,
    /// One of the work-record forms.
    Work(OperationKind),
    /// Profile editor.
    Profile,
}

impl Screen {
    /// Screens that need a signed-in session.
    pub fn is_protected(self) -> bool {
        matches!(self, Screen::Home | Screen::Work(_) | Screen::Profile)
    }

    pub fn name(self) -> &'static str {
        match self {
            Screen::InitialSetup => "Setup",
            Screen::Login => "Login",
            Screen::Home => "Home",
            Screen::Work(_) => "Work",
            Screen::Profile => "Profile",
        }
    }
}

/// Severity of a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A short message for the user, shown in the status bar and notice log.
#[derive(Clone, Debug)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: DateTime<Local>,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            at: Local::now(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }
}

/// UI state shared with the renderer.
#[derive(Clone, Debug)]
pub struct UiState {
    /// Current screen.
    pub screen: Screen,
    /// Selected row of the navigation menu.
    pub selected: usize,
    /// Focused field on form screens.
    pub focused_field: usize,
    /// Recent notices, oldest first, at most [`MAX_NOTICES`].
    pub notices: Vec<Notice>,
    /// Status bar text when no notice is pending.
    pub status: String,
}

/// Notices kept in memory; older ones only survive in the log file.
pub const MAX_NOTICES: usize = 100;

impl UiState {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            selected: 0,
            focused_field: 0,
            notices: vec![],
            status: "Ready".into(),
        }
    }

    /// Record a notice and log it.
    pub fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::warn!("notice: {}", notice.text),
            _ => tracing::info!("notice: {}", notice.text),
        }
        if self.notices.len() >= MAX_NOTICES {
            let excess = self.notices.len() + 1 - MAX_NOTICES;
            self.notices.drain(..excess);
        }
        self.notices.push(notice);
    }

    /// Most recent notice, if any.
    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }

    /// Switch screens and reset per-screen cursors.
    pub fn go_to(&mut self, screen: Screen) {
        self.screen = screen;
        self.focused_field = 0;
    }
}
