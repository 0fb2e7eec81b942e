//! Excerpts of long text for prompts and error messages.

/// Keep at most `max_chars` characters of `s`.
///
/// A clipped excerpt ends with a marker naming how many characters were
/// dropped, so a model reading it knows the value is incomplete. The marker
/// is not counted against `max_chars`.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((end, _)) => {
            let dropped = s[end..].chars().count();
            format!("{}... [{} more characters]", &s[..end], dropped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn test_clipped_text_names_the_remainder() {
        assert_eq!(truncate("hello world", 5), "hello... [6 more characters]");
        assert_eq!(truncate("abc", 0), "... [3 more characters]");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        assert_eq!(truncate("日本語テスト", 6), "日本語テスト");
        assert_eq!(truncate("日本語テスト文字列", 4), "日本語テ... [5 more characters]");
        assert_eq!(truncate("👋🌍🎉", 1), "👋... [2 more characters]");
    }
}
