//! Context trimming (§4.6.2): deterministic, threshold-driven, never removes
//! the system message, never drops below the minimum retained non-system
//! count.

use floyd_core::{token, Message, Role};

/// Remove the oldest non-system messages from `messages` while the
/// estimated token total exceeds `threshold`, stopping once only
/// `min_retained_non_system` non-system messages remain.
///
/// Deterministic for a given `messages`/`threshold`/`min_retained_non_system`
/// triple (I8): the same input always yields the same trimmed prefix.
pub fn trim_history(messages: &mut Vec<Message>, threshold: usize, min_retained_non_system: usize) {
    loop {
        if token::estimate_history_tokens(messages) <= threshold {
            return;
        }
        let non_system_count = messages.iter().filter(|m| m.role != Role::System).count();
        if non_system_count <= min_retained_non_system {
            return;
        }
        let Some(victim) = messages
            .iter()
            .position(|m| m.role != Role::System)
        else {
            return;
        };
        messages.remove(victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_message() -> Message {
        Message::user("x".repeat(4000))
    }

    #[test]
    fn system_message_is_never_removed() {
        let mut messages = vec![Message::system("be helpful")];
        for _ in 0..50 {
            messages.push(long_message());
        }
        trim_history(&mut messages, 1_000, 2);
        assert_eq!(messages[0].role, Role::System);
    }

    #[test]
    fn trimming_stops_at_the_minimum_retained_count() {
        let mut messages = vec![Message::system("be helpful")];
        for _ in 0..10 {
            messages.push(long_message());
        }
        trim_history(&mut messages, 1, 2);
        // system + 2 minimum retained
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn under_threshold_history_is_untouched() {
        let mut messages = vec![Message::system("be helpful"), Message::user("hi")];
        let before = messages.len();
        trim_history(&mut messages, 120_000, 2);
        assert_eq!(messages.len(), before);
    }

    #[test]
    fn trimming_removes_oldest_first() {
        let mut messages = vec![Message::system("sys")];
        messages.push(Message::user("oldest"));
        for _ in 0..20 {
            messages.push(long_message());
        }
        messages.push(Message::user("newest"));
        trim_history(&mut messages, 1, 2);
        assert!(!messages.iter().any(|m| m.content.as_text() == "oldest"));
        assert!(messages.iter().any(|m| m.content.as_text() == "newest"));
    }
}
