//! Text helpers shared by the matcher, the audit logger and the generation client

use std::borrow::Cow;
use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref LONG_WORD_REGEX: Regex = Regex::new(r"\b\w{5,}\b").unwrap();
}

pub const REDACTION_MARKER: &str = "[REDACTED]";

pub struct TextUtils;

impl TextUtils {
    /// Edit-distance similarity on a 0-100 scale.
    ///
    /// Uses the indel distance (a substitution counts as a deletion plus an
    /// insertion), so the ratio is `2 * lcs / (len(a) + len(b))`. Rounds half
    /// to even. An empty side scores 0, even against another empty string.
    pub fn similarity_ratio(a: &str, b: &str) -> u8 {
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        if a == b {
            return 100;
        }

        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();
        let total = (a_chars.len() + b_chars.len()) as f64;
        let lcs = Self::lcs_len(&a_chars, &b_chars) as f64;

        (100.0 * 2.0 * lcs / total).round_ties_even() as u8
    }

    fn lcs_len(a: &[char], b: &[char]) -> usize {
        let mut prev = vec![0usize; b.len() + 1];
        let mut curr = vec![0usize; b.len() + 1];

        for &a_ch in a {
            for (j, &b_ch) in b.iter().enumerate() {
                curr[j + 1] = if a_ch == b_ch {
                    prev[j] + 1
                } else {
                    prev[j + 1].max(curr[j])
                };
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        prev[b.len()]
    }

    /// Masks every word of five or more word characters.
    ///
    /// Coarse: names of four letters or fewer pass through untouched, so the
    /// output is not guaranteed to be anonymous.
    pub fn redact_long_words(text: &str) -> Cow<'_, str> {
        LONG_WORD_REGEX.replace_all(text, REDACTION_MARKER)
    }

    /// Splits into pieces of at most `size` characters (not bytes).
    pub fn chunk_chars(text: &str, size: usize) -> Vec<String> {
        if size == 0 {
            return vec![text.to_string()];
        }

        let chars: Vec<char> = text.chars().collect();
        chars.chunks(size).map(|c| c.iter().collect()).collect()
    }

    /// Truncate text to max characters with ellipsis if needed
    pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
        if text.chars().count() <= max_chars {
            Cow::Borrowed(text)
        } else if max_chars <= 3 {
            Cow::Borrowed("...")
        } else {
            let mut result: String = text.chars().take(max_chars - 3).collect();
            result.push_str("...");
            Cow::Owned(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn similarity_of_identical_and_empty() {
        assert_eq!(TextUtils::similarity_ratio("angina", "angina"), 100);
        assert_eq!(TextUtils::similarity_ratio("", "angina"), 0);
        assert_eq!(TextUtils::similarity_ratio("angina", ""), 0);
        assert_eq!(TextUtils::similarity_ratio("", ""), 0);
    }

    #[test]
    fn similarity_counts_substitution_twice() {
        // lcs("abcd", "abce") = 3, ratio = 6 / 8
        assert_eq!(TextUtils::similarity_ratio("abcd", "abce"), 75);
    }

    #[test]
    fn similarity_boundary_values() {
        let key_61 = format!("{}{}", "a".repeat(61), "b".repeat(39));
        let question_61 = format!("{}{}", "a".repeat(61), "c".repeat(39));
        assert_eq!(TextUtils::similarity_ratio(&key_61, &question_61), 61);

        let key_60 = format!("{}{}", "a".repeat(60), "b".repeat(40));
        let question_60 = format!("{}{}", "a".repeat(60), "c".repeat(40));
        assert_eq!(TextUtils::similarity_ratio(&key_60, &question_60), 60);
    }

    #[test]
    fn similarity_rounds_half_to_even() {
        // 200 / 9 = 22.2; 200 / 16 = 12.5 rounds down to the even 12
        assert_eq!(TextUtils::similarity_ratio("abcdefgh", "a"), 22);
        assert_eq!(TextUtils::similarity_ratio("aaaaaaaaaaaaaaa", "a"), 12);
    }

    #[test]
    fn redaction_masks_words_of_five_or_more() {
        let redacted = TextUtils::redact_long_words("John Smith has severe chest pain");
        assert_eq!(redacted, "John [REDACTED] has [REDACTED] [REDACTED] pain");
    }

    #[test]
    fn redaction_boundary_is_five_characters() {
        assert_eq!(TextUtils::redact_long_words("four"), "four");
        assert_eq!(TextUtils::redact_long_words("fives"), "[REDACTED]");
        assert_eq!(TextUtils::redact_long_words("ECG 12345 ok"), "ECG [REDACTED] ok");
    }

    #[test]
    fn chunking_respects_multibyte_characters() {
        let text = "❤".repeat(5);
        let chunks = TextUtils::chunk_chars(&text, 2);
        assert_eq!(chunks, vec!["❤❤", "❤❤", "❤"]);
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(TextUtils::truncate_with_ellipsis("short", 10), "short");
        assert_eq!(TextUtils::truncate_with_ellipsis("palpitations", 8), "palpi...");
    }

    proptest! {
        #[test]
        fn chunks_reassemble_to_original(text in ".{0,700}", size in 1usize..300) {
            let chunks = TextUtils::chunk_chars(&text, size);
            prop_assert_eq!(chunks.concat(), text.clone());
            prop_assert!(chunks.iter().all(|c| c.chars().count() <= size));
        }

        #[test]
        fn similarity_is_symmetric_and_bounded(a in "[a-z ]{0,40}", b in "[a-z ]{0,40}") {
            let ab = TextUtils::similarity_ratio(&a, &b);
            prop_assert_eq!(ab, TextUtils::similarity_ratio(&b, &a));
            prop_assert!(ab <= 100);
        }
    }
}
