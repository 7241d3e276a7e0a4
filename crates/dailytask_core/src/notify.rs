//! User-facing alert delivery capability.
//!
//! Delivery is best-effort: callers log failures and carry on.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Delivery failure reported by a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    pub message: String,
}

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.message)
    }
}

impl Error for NotifyError {}

/// Delivers one alert with a title and a body.
pub trait Notifier: Send + Sync {
    fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}
