//! Caller-supplied overrides merged over a provider's built-in defaults.

/// Per-field overrides a caller may supply when building an [`crate::LlmClient`].
///
/// Every field is optional; unset fields keep the provider's built-in
/// default (see `floyd_config::provider::defaults_for`). Options are merged
/// per-field, never wholesale-replacing the default row.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Override the provider's default base URL.
    pub base_url: Option<String>,
    /// Override the provider's default model name.
    pub model: Option<String>,
    /// Override the provider's default max-tokens cap.
    pub max_tokens: Option<u32>,
}

impl ClientOptions {
    /// No overrides — use the provider's built-in defaults verbatim.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the max-tokens cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
