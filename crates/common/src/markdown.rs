//! MarkdownV2 escaping for untrusted strings injected into outgoing messages.
//!
//! Any external string (usernames, search queries, order ids, wallet
//! addresses) must be escaped before being spliced into a Markdown body —
//! otherwise stray `_*[]` etc. corrupt the rendered message or, on some
//! transports, are rejected outright.

/// The reserved MarkdownV2 character set.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape every reserved MarkdownV2 character in `s` with a backslash.
#[must_use]
pub fn escape_markdown_v2(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_reserved_chars() {
        let input = "a_b*c[d]e(f)g~h`i>j#k+l-m=n|o{p}q.r!s";
        let escaped = escape_markdown_v2(input);
        assert!(!escaped.chars().zip(escaped.chars().skip(1)).any(|(a, b)| {
            RESERVED.contains(&b) && a != '\\'
        }));
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_markdown_v2("hello world 123"), "hello world 123");
    }

    #[test]
    fn escapes_wallet_like_strings() {
        assert_eq!(escape_markdown_v2("0x1234_abcd"), "0x1234\\_abcd");
    }
}
