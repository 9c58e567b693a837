use chrono::Duration;

use cofound_db::queries::Window;

use crate::error::{MatchError, Result};

/// Rolling-window quotas. Counted from existing rows at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Introductions (invites and intro requests) per rolling 7 days.
    pub intro_weekly: u32,
    /// Chat messages per rolling 24 hours. Intro messages are not counted.
    pub message_daily: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            intro_weekly: 20,
            message_daily: 50,
        }
    }
}

pub fn intro_window() -> Duration {
    Duration::weeks(1)
}

pub fn message_window() -> Duration {
    Duration::days(1)
}

pub const INTRO_MESSAGE_MIN: usize = 100;
pub const INTRO_MESSAGE_MAX: usize = 500;
pub const INTRO_RESPONSE_MAX: usize = 500;
pub const CHAT_MESSAGE_MIN: usize = 1;
pub const CHAT_MESSAGE_MAX: usize = 5000;

/// Character count bounds, inclusive.
pub fn check_length(field: &str, text: &str, min: usize, max: usize) -> Result<()> {
    let len = text.chars().count();
    if len < min || len > max {
        return Err(MatchError::invalid_input(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct PageBounds {
    pub default_limit: u32,
    pub max_limit: u32,
}

/// Match, message and conversation listings.
pub const LIST_PAGE: PageBounds = PageBounds { default_limit: 50, max_limit: 100 };

/// Discover and recommendation feeds.
pub const BROWSE_PAGE: PageBounds = PageBounds { default_limit: 20, max_limit: 50 };

pub fn page(skip: Option<u32>, limit: Option<u32>, bounds: PageBounds) -> Result<Window> {
    let limit = limit.unwrap_or(bounds.default_limit);
    if limit == 0 || limit > bounds.max_limit {
        return Err(MatchError::invalid_input(format!(
            "limit must be between 1 and {}",
            bounds.max_limit
        )));
    }
    Ok(Window::new(skip.unwrap_or(0), limit))
}
