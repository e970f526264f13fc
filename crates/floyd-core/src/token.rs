//! A cheap, deterministic token-count estimate used for context trimming.

use crate::message::Message;

/// Roughly four characters per token — good enough for a trimming threshold,
/// not a billing calculation.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of one message (role overhead plus content).
#[must_use]
pub fn estimate_message_tokens(message: &Message) -> usize {
    let text_len = match &message.content {
        crate::message::MessageContent::Text(s) => s.len(),
        crate::message::MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|b| match b {
                crate::message::ContentBlock::Text { text } => text.len(),
                crate::message::ContentBlock::ToolUse { name, input, .. } => {
                    name.len() + input.to_string().len()
                }
                crate::message::ContentBlock::ToolResult { content, .. } => content.len(),
            })
            .sum(),
    };
    // +8 for per-message role/framing overhead, independent of content length.
    text_len.div_ceil(CHARS_PER_TOKEN) + 8
}

/// Estimate the total token count of a history slice.
#[must_use]
pub fn estimate_history_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn estimate_grows_with_content_length() {
        let short = estimate_message_tokens(&Message::user("hi"));
        let long = estimate_message_tokens(&Message::user("hi".repeat(100)));
        assert!(long > short);
    }
}
