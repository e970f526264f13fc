//! The provider-default table: one row per supported LLM provider tag.
//!
//! A single central table maps a provider tag to `{base URL, model, max
//! tokens}`; adapters merge caller-supplied options over this row rather
//! than hard-coding defaults themselves.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// A supported LLM provider wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    /// Z.AI's GLM endpoint (OpenAI-shaped wire format).
    Glm,
    /// Anthropic's `messages` endpoint.
    Anthropic,
    /// OpenAI itself.
    Openai,
    /// `DeepSeek` (OpenAI-shaped wire format).
    Deepseek,
}

impl std::str::FromStr for ProviderTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "glm" => Ok(Self::Glm),
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::Openai),
            "deepseek" => Ok(Self::Deepseek),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Whether a provider tag's wire shape is OpenAI-compatible or Anthropic-shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    /// `POST /chat/completions` with OpenAI's schema.
    OpenAiCompat,
    /// Anthropic's `messages` endpoint.
    Anthropic,
}

impl ProviderTag {
    /// The wire shape this provider tag speaks.
    #[must_use]
    pub fn wire_shape(self) -> WireShape {
        match self {
            Self::Anthropic => WireShape::Anthropic,
            Self::Glm | Self::Openai | Self::Deepseek => WireShape::OpenAiCompat,
        }
    }
}

/// `{base URL, model, max tokens}` for one provider tag.
#[derive(Debug, Clone)]
pub struct ProviderDefaults {
    /// The tag this row describes.
    pub tag: ProviderTag,
    /// The API base URL.
    pub base_url: String,
    /// The default model name.
    pub model: String,
    /// The default max-tokens cap.
    pub max_tokens: u32,
}

impl ProviderDefaults {
    /// Merge caller-supplied per-field overrides over these defaults.
    /// Each `Some` field replaces the default; `None` fields keep it.
    #[must_use]
    pub fn merged(
        &self,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
    ) -> ProviderDefaults {
        ProviderDefaults {
            tag: self.tag,
            base_url: base_url.unwrap_or_else(|| self.base_url.clone()),
            model: model.unwrap_or_else(|| self.model.clone()),
            max_tokens: max_tokens.unwrap_or(self.max_tokens),
        }
    }
}

/// Look up the built-in defaults for `tag`.
#[must_use]
pub fn defaults_for(tag: ProviderTag) -> ProviderDefaults {
    match tag {
        ProviderTag::Openai => ProviderDefaults {
            tag,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
        },
        ProviderTag::Deepseek => ProviderDefaults {
            tag,
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            max_tokens: 4096,
        },
        ProviderTag::Glm => ProviderDefaults {
            tag,
            base_url: "https://api.z.ai/api/paas/v4".to_string(),
            model: "glm-4.6".to_string(),
            max_tokens: 4096,
        },
        ProviderTag::Anthropic => ProviderDefaults {
            tag,
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 8192,
        },
    }
}

/// Parse a provider tag from its wire name.
pub fn parse_tag(tag: &str) -> ConfigResult<ProviderTag> {
    tag.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_is_a_config_error() {
        assert!(matches!(
            parse_tag("bard"),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn merged_overrides_only_the_supplied_fields() {
        let defaults = defaults_for(ProviderTag::Openai);
        let merged = defaults.merged(None, Some("gpt-4o-mini".to_string()), None);
        assert_eq!(merged.base_url, defaults.base_url);
        assert_eq!(merged.model, "gpt-4o-mini");
        assert_eq!(merged.max_tokens, defaults.max_tokens);
    }

    #[test]
    fn anthropic_is_the_only_anthropic_shaped_tag() {
        assert_eq!(ProviderTag::Anthropic.wire_shape(), WireShape::Anthropic);
        for tag in [ProviderTag::Openai, ProviderTag::Deepseek, ProviderTag::Glm] {
            assert_eq!(tag.wire_shape(), WireShape::OpenAiCompat);
        }
    }
}
