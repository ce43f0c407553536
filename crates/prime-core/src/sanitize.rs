//! Group name sanitization
//!
//! Group display names become inventory identifiers: every character that
//! is not a word character is replaced with `_`, and so is a leading digit.
//! The result is stable and `safe_group_name(safe_group_name(n)) ==
//! safe_group_name(n)`.

const REPLACEMENT: char = '_';

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Turn a group display name into a safe inventory group name
pub fn safe_group_name(name: &str) -> String {
    name.chars()
        .enumerate()
        .map(|(i, c)| {
            if !is_word_char(c) || (i == 0 && c.is_numeric()) {
                REPLACEMENT
            } else {
                c
            }
        })
        .collect()
}
