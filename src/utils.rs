use unicode_width::UnicodeWidthChar;

/// Cut `s` to at most `max_width` display columns, ending in `...` when shortened.
///
/// Widths come from `unicode-width`, so CJK and emoji count as two columns and
/// characters are never split.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

/// Collapse runs of whitespace (including newlines and nbsp) into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("Hello, world!", 10), "Hello, ...");
        assert_eq!(truncate_str("你好，世界！", 8), "你好...");
        assert_eq!(truncate_str("Hi!", 10), "Hi!");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Great \n\t widget  "), "Great widget");
        assert_eq!(normalize_whitespace("a\u{a0}b"), "a b");
        assert_eq!(normalize_whitespace("   "), "");
    }
}
