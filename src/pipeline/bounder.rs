use tracing::debug;

/// Rough characters-per-token ratio used in place of a real tokenizer.
pub const CHARS_PER_TOKEN: usize = 4;

const KEPT_EDGE_LINES: usize = 3;

/// Truncates `text` to roughly `max_tokens` tokens, keeping its opening and closing lines.
///
/// The result never exceeds the character budget, so bounding an already
/// bounded text returns it unchanged.
pub fn bound(text: &str, max_tokens: usize) -> String {
    let limit = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }

    let truncated = keep_edge_lines(text, limit).unwrap_or_else(|| keep_head_and_tail(text, limit));
    debug!(
        original_chars = total,
        truncated_chars = truncated.chars().count(),
        "truncated email body"
    );
    truncated
}

fn keep_edge_lines(text: &str, limit: usize) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= KEPT_EDGE_LINES * 2 {
        return None;
    }

    let header = lines[..KEPT_EDGE_LINES].join("\n");
    let footer = lines[lines.len() - KEPT_EDGE_LINES..].join("\n");
    let middle = lines[KEPT_EDGE_LINES..lines.len() - KEPT_EDGE_LINES].join("\n");

    // two joining newlines
    let fixed = header.chars().count() + footer.chars().count() + 2;
    let budget = limit.checked_sub(fixed)?;
    let middle: String = middle.chars().take(budget).collect();

    Some(format!("{header}\n{middle}\n{footer}"))
}

fn keep_head_and_tail(text: &str, limit: usize) -> String {
    if limit == 0 {
        return String::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let head_len = limit / 2;
    let tail_len = limit - head_len - 1;
    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();
    format!("{head}\n{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_email(body_lines: usize) -> String {
        let mut lines = vec![
            "From: recruiting@acme.test".to_string(),
            "Subject: Interview".to_string(),
            "Hi Sam,".to_string(),
        ];
        lines.extend((0..body_lines).map(|i| format!("paragraph {i} of filler text")));
        lines.extend([
            "Best,".to_string(),
            "Acme Talent".to_string(),
            "Unsubscribe".to_string(),
        ]);
        lines.join("\n")
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(bound("hello", 10), "hello");
    }

    #[test]
    fn keeps_first_and_last_lines() {
        let text = long_email(500);
        let bounded = bound(&text, 50);
        assert!(bounded.chars().count() <= 200);
        assert!(bounded.starts_with("From: recruiting@acme.test\nSubject: Interview\nHi Sam,\n"));
        assert!(bounded.ends_with("\nBest,\nAcme Talent\nUnsubscribe"));
    }

    #[test]
    fn bounding_is_idempotent() {
        let samples = [
            long_email(500),
            "x".repeat(10_000),
            format!("{}\n{}", "a".repeat(300), "b".repeat(300)),
            "é".repeat(1_000),
        ];
        for text in samples {
            for budget in [0, 1, 10, 50] {
                let once = bound(&text, budget);
                assert_eq!(bound(&once, budget), once);
                assert!(once.chars().count() <= budget * CHARS_PER_TOKEN);
            }
        }
    }

    #[test]
    fn long_single_line_keeps_head_and_tail() {
        let text = format!("{}{}", "a".repeat(100), "z".repeat(100));
        let bounded = bound(&text, 10);
        assert_eq!(bounded.chars().count(), 40);
        assert!(bounded.starts_with("aaaa"));
        assert!(bounded.ends_with("zzzz"));
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "日本語".repeat(100);
        let bounded = bound(&text, 5);
        assert_eq!(bounded.chars().count(), 20);
    }
}
