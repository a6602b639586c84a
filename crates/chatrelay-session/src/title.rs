//! Chat title derivation

use chatrelay_core::ChatMessage;

const MAX_TITLE_CHARS: usize = 80;
const FALLBACK_TITLE: &str = "New chat";

/// Derive a chat title from the first user message.
///
/// Whitespace collapses to single spaces; the result truncates at a
/// character boundary with an ellipsis.
pub fn derive_title(message: &ChatMessage) -> String {
    let collapsed = message
        .plain_text()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    if collapsed.chars().count() <= MAX_TITLE_CHARS {
        return collapsed;
    }

    let truncated: String = collapsed.chars().take(MAX_TITLE_CHARS).collect();
    format!("{}…", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_used_verbatim() {
        let message = ChatMessage::user("What is Rust?");
        assert_eq!(derive_title(&message), "What is Rust?");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let message = ChatMessage::user("  hello\n\n   world  ");
        assert_eq!(derive_title(&message), "hello world");
    }

    #[test]
    fn test_long_message_truncated_with_ellipsis() {
        let message = ChatMessage::user("x".repeat(200));
        let title = derive_title(&message);
        assert!(title.chars().count() <= MAX_TITLE_CHARS + 1);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_empty_message_falls_back() {
        let message = ChatMessage::user("   ");
        assert_eq!(derive_title(&message), FALLBACK_TITLE);
    }
}
