//! Build a concrete [`LlmClient`] for a provider tag.

use std::sync::Arc;

use floyd_config::provider::{defaults_for, ProviderTag, WireShape};

use crate::anthropic::AnthropicClient;
use crate::error::{LlmError, LlmResult};
use crate::openai::OpenAiCompatClient;
use crate::options::ClientOptions;
use crate::client::LlmClient;

/// Build the client for `tag`, merging `options` over the provider's
/// built-in defaults and authenticating with `api_key`.
///
/// Fails only if `api_key` is empty — a provider always requires a
/// credential, so an empty key is treated as "none supplied".
pub fn build_client(
    tag: ProviderTag,
    api_key: impl Into<String>,
    options: ClientOptions,
) -> LlmResult<Arc<dyn LlmClient>> {
    let api_key = api_key.into();
    if api_key.is_empty() {
        return Err(LlmError::MissingCredential(format!("{tag:?}")));
    }

    let defaults = defaults_for(tag).merged(options.base_url, options.model, options.max_tokens);

    Ok(match tag.wire_shape() {
        WireShape::OpenAiCompat => Arc::new(OpenAiCompatClient::new(
            defaults.base_url,
            defaults.model,
            defaults.max_tokens,
            api_key,
        )),
        WireShape::Anthropic => Arc::new(AnthropicClient::new(
            defaults.base_url,
            defaults.model,
            defaults.max_tokens,
            api_key,
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credential_is_rejected() {
        let result = build_client(ProviderTag::Openai, "", ClientOptions::none());
        assert!(matches!(result, Err(LlmError::MissingCredential(_))));
    }

    #[test]
    fn a_credentialed_request_builds_successfully() {
        let result = build_client(ProviderTag::Anthropic, "sk-test", ClientOptions::none());
        assert!(result.is_ok());
    }
}
