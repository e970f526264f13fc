//! The provider-neutral streaming chat contract.

use std::pin::Pin;

use async_trait::async_trait;
use floyd_core::{CancelToken, Message, StreamEvent, ToolDescriptor};
use futures::Stream;

/// A boxed, owned stream of normalized [`StreamEvent`]s.
///
/// The sequence is finite and always ends with exactly one
/// `StreamEvent::Stop` or one `StreamEvent::Error` — adapters never let the
/// stream end silently. See the crate docs for the full contract.
pub type StreamBox = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Provider-neutral streaming chat interface.
///
/// Implementors translate `history`/`tools` into their wire shape, open the
/// provider's streaming endpoint, and normalize the response into
/// [`StreamEvent`]s. The adapter never trims history — that is the Agent
/// Engine's job (see `floyd-runtime`) — and never drops messages silently.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Stream a chat completion for the given history and tool catalogue.
    ///
    /// Construction of the returned stream never fails: a failure to reach
    /// the provider, or a non-2xx response, surfaces as a single
    /// `StreamEvent::Error` yielded from the stream itself, so the contract
    /// ("ends with exactly one stop or one error") holds uniformly.
    async fn stream(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
        cancel: CancelToken,
    ) -> StreamBox;
}
