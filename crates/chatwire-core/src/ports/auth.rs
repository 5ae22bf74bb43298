//! Bearer credential accessor.

/// Supplies the credential attached to every API request.
///
/// Token issuance and refresh happen elsewhere; the core only reads the
/// current value.
pub trait TokenProvider: Send + Sync {
    /// The current bearer token, if signed in.
    fn current_token(&self) -> Option<String>;
}

/// A token fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// A provider that never has a token.
    pub const fn anonymous() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn current_token(&self) -> Option<String> {
        self.0.clone()
    }
}
