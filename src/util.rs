// src/util.rs — Shared utility functions

use minijinja::Environment;
use serde::Serialize;

use crate::infra::errors::Result;

/// Truncate a string for display/logging (UTF-8 safe).
///
/// Returns a substring of at most `max_len` bytes, ensuring the cut
/// point falls on a valid UTF-8 character boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

/// Render a one-off prompt template.
///
/// Templates are compiled per call; they are short and rendered at most a
/// few times per generation. Undefined variables are an error so a typo in a
/// template fails loudly instead of sending a half-empty prompt.
pub fn render_template<S: Serialize>(name: &str, source: &str, ctx: S) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
    env.add_template(name, source)?;
    let rendered = env.get_template(name)?.render(ctx)?;
    Ok(rendered)
}

/// Strip whitespace and one layer of matching quotes from a model reply.
pub fn unquote(s: &str) -> &str {
    let t = s.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('`', '`'), ('“', '”')] {
        if t.len() >= open.len_utf8() + close.len_utf8()
            && t.starts_with(open)
            && t.ends_with(close)
        {
            return t[open.len_utf8()..t.len() - close.len_utf8()].trim();
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "café" is 5 bytes (é = 2 bytes), truncating at 4 should not split é
        assert_eq!(truncate_str("café", 4), "caf");
    }

    #[test]
    fn test_truncate_zero_max() {
        assert_eq!(truncate_str("hello", 0), "");
    }

    #[test]
    fn test_render_template() {
        let out = render_template(
            "t",
            "LABELS: {{ labels }} / {{ n }}",
            minijinja::context! { labels => "[\"A\"]", n => 3 },
        )
        .unwrap();
        assert_eq!(out, "LABELS: [\"A\"] / 3");
    }

    #[test]
    fn test_render_template_strict_undefined() {
        let err = render_template("t", "{{ missing }}", minijinja::context! {});
        assert!(err.is_err());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("  \"Classify reviews.\" "), "Classify reviews.");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("“smart”"), "smart");
        assert_eq!(unquote("\"unbalanced"), "\"unbalanced");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("plain"), "plain");
    }
}
