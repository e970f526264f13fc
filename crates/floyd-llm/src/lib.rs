//! Floyd LLM — a provider-neutral streaming chat client.
//!
//! One trait, [`LlmClient`], normalizes OpenAI-shaped (OpenAI, `DeepSeek`,
//! Z.AI's GLM) and Anthropic-shaped providers into the same
//! [`floyd_core::StreamEvent`] sequence. Callers never match on a provider
//! tag after construction — [`factory::build_client`] is the only place
//! that branches on [`floyd_config::provider::ProviderTag`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod anthropic;
mod client;
mod error;
mod factory;
mod openai;
mod options;

pub use anthropic::AnthropicClient;
pub use client::{LlmClient, StreamBox};
pub use error::{LlmError, LlmResult};
pub use factory::build_client;
pub use openai::OpenAiCompatClient;
pub use options::ClientOptions;
