//! Session and pagination settings with validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default throttle window for streamed commits, in milliseconds.
pub const DEFAULT_THROTTLE_MS: u64 = 50;

/// Default page size of a conversation's message list.
pub const DEFAULT_MESSAGES_PER_PAGE: u32 = 20;

/// Default page size of the conversation list.
pub const DEFAULT_CONVERSATIONS_PER_PAGE: u32 = 30;

/// Tunables of the session controller and pagination.
///
/// Unset fields fall back to the defaults above.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    /// Minimum time between two commits of streamed text (1-1000 ms).
    pub throttle_ms: Option<u64>,

    /// Messages fetched per page (1-100).
    pub messages_per_page: Option<u32>,

    /// Conversations fetched per page (1-100).
    pub conversations_per_page: Option<u32>,
}

impl SessionSettings {
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            throttle_ms: Some(DEFAULT_THROTTLE_MS),
            messages_per_page: Some(DEFAULT_MESSAGES_PER_PAGE),
            conversations_per_page: Some(DEFAULT_CONVERSATIONS_PER_PAGE),
        }
    }

    #[must_use]
    pub const fn throttle_window(&self) -> Duration {
        match self.throttle_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_millis(DEFAULT_THROTTLE_MS),
        }
    }

    #[must_use]
    pub const fn effective_messages_per_page(&self) -> u32 {
        match self.messages_per_page {
            Some(n) => n,
            None => DEFAULT_MESSAGES_PER_PAGE,
        }
    }

    #[must_use]
    pub const fn effective_conversations_per_page(&self) -> u32 {
        match self.conversations_per_page {
            Some(n) => n,
            None => DEFAULT_CONVERSATIONS_PER_PAGE,
        }
    }

    /// Check every set field is within range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(ms) = self.throttle_ms {
            if !(1..=1000).contains(&ms) {
                return Err(SettingsError::InvalidThrottle(ms));
            }
        }
        for size in [self.messages_per_page, self.conversations_per_page]
            .into_iter()
            .flatten()
        {
            if !(1..=100).contains(&size) {
                return Err(SettingsError::InvalidPageSize(size));
            }
        }
        Ok(())
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Throttle window must be between 1 and 1000 ms, got {0}")]
    InvalidThrottle(u64),

    #[error("Page size must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SessionSettings::with_defaults();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.throttle_window(), Duration::from_millis(50));
        assert_eq!(settings.effective_messages_per_page(), 20);
        assert_eq!(settings.effective_conversations_per_page(), 30);
    }

    #[test]
    fn test_unset_fields_fall_back() {
        let settings = SessionSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.throttle_window(), Duration::from_millis(DEFAULT_THROTTLE_MS));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let settings = SessionSettings {
            throttle_ms: Some(0),
            ..SessionSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::InvalidThrottle(0)));

        let settings = SessionSettings {
            conversations_per_page: Some(500),
            ..SessionSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::InvalidPageSize(500)));
    }

    #[test]
    fn test_partial_json() {
        let settings: SessionSettings = serde_json::from_str(r#"{"throttle_ms": 16}"#).unwrap();
        assert_eq!(settings.throttle_window(), Duration::from_millis(16));
        assert!(settings.messages_per_page.is_none());
    }
}
