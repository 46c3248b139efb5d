//! Output cleaning for model-generated text.

/// Characters that end a sentence.
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Bound `text` to `max_chars` characters without cutting mid-sentence.
///
/// Text that already fits is returned trimmed. Otherwise the first
/// `max_chars` characters are kept and cut just after the last `.`, `!`
/// or `?` that is followed by whitespace inside that window. With no such
/// boundary the raw window is returned, trimmed.
pub fn clean_truncate(text: &str, max_chars: usize) -> String {
    let window_end = match text.char_indices().nth(max_chars) {
        Some((idx, _)) => idx,
        None => return text.trim().to_string(),
    };
    let window = &text[..window_end];

    let mut following: Option<char> = None;
    for (idx, ch) in window.char_indices().rev() {
        if SENTENCE_TERMINATORS.contains(&ch) && following.is_some_and(char::is_whitespace) {
            return window[..idx + ch.len_utf8()].trim().to_string();
        }
        following = Some(ch);
    }

    window.trim().to_string()
}

/// Keep at most `max_chars` characters of `text`, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_returned_trimmed() {
        assert_eq!(clean_truncate("  A demo app.  \n", 100), "A demo app.");
    }

    #[test]
    fn cuts_at_last_sentence_boundary_in_window() {
        let text = "First sentence. Second one! Third is cut off here";
        // Window of 35 chars ends inside the third sentence.
        assert_eq!(clean_truncate(text, 35), "First sentence. Second one!");
    }

    #[test]
    fn terminator_at_window_edge_without_whitespace_is_not_a_boundary() {
        // Window is "Hi. Bye."; the final '.' has no whitespace after it
        // inside the window, so the cut falls after "Hi.".
        assert_eq!(clean_truncate("Hi. Bye. More text", 8), "Hi.");
    }

    #[test]
    fn no_boundary_returns_raw_window() {
        let text = "no punctuation anywhere in this long line of text";
        assert_eq!(clean_truncate(text, 14), "no punctuation");
    }

    #[test]
    fn decimal_points_are_not_boundaries() {
        assert_eq!(clean_truncate("Version 1.2.3 ships soon", 12), "Version 1.2.");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "Héllo wörld. Ünïcödé everywhere";
        assert_eq!(clean_truncate(text, 15), "Héllo wörld.");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "Short.",
            "One. Two. Three. Four. Five.",
            "no terminators at all in this sentence",
            "   padded text that is long enough to truncate.   More   ",
            "Question? Answer! Statement. trailing",
        ];
        for text in inputs {
            for cap in [0, 5, 10, 20, 100] {
                let once = clean_truncate(text, cap);
                assert_eq!(clean_truncate(&once, cap), once, "text={text:?} cap={cap}");
            }
        }
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("añb", 2), "añ");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
