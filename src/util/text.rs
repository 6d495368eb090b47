use std::borrow::Cow;

/// Converts a raw feed title into the canonical comparison string.
///
/// Removes markup tags, decodes HTML character entities, collapses every run
/// of whitespace into a single space and trims both ends. The transformation
/// is repeated until the output stops changing, so entity-escaped markup such
/// as `&lt;b&gt;` ends up in the same form it would reach on a second call.
///
/// # Examples
///
/// ```
/// use notion_feeder::util::normalize_title;
///
/// assert_eq!(normalize_title("<b>Hi</b> There"), "Hi There");
/// assert_eq!(normalize_title("  Rust &amp;\n Tokio  "), "Rust & Tokio");
/// assert_eq!(normalize_title("5 < 6"), "5 < 6");
/// assert_eq!(normalize_title(""), "");
/// ```
pub fn normalize_title(raw: &str) -> String {
    let mut current = strip_markup(raw);
    loop {
        let next = strip_markup(&current);
        // Each pass either shortens the text or only rewrites whitespace,
        // which is stable after one more pass.
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Single pass of tag removal, entity decoding and whitespace collapsing.
///
/// Used directly for item bodies, where idempotence is not needed.
pub fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '<' if chars.peek().is_some_and(|&c| opens_tag(c)) => {
                // Skip to the closing bracket; an unterminated tag swallows the rest.
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                }
                // Block-level tags separate words, so keep a boundary.
                text.push(' ');
            }
            '&' => match decode_entity(&mut chars) {
                Some(decoded) => text.push_str(&decoded),
                None => text.push('&'),
            },
            c => text.push(c),
        }
    }

    collapse_whitespace(&text).into_owned()
}

fn opens_tag(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')
}

/// Decodes the entity following a `&`, consuming it from `chars` on success.
///
/// Only a complete `&name;` or `&#num;` reference is handed to `htmlescape`.
/// Unknown or malformed entities consume nothing, so the caller emits the
/// ampersand and the following text stays untouched (`AT&T` survives).
fn decode_entity(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    const MAX_ENTITY_LEN: usize = 10;

    let mut lookahead = chars.clone();
    let mut entity = String::from("&");
    loop {
        match lookahead.next() {
            Some(';') if entity.len() > 1 => break,
            Some(c) if c.is_ascii_alphanumeric() || c == '#' => {
                if entity.len() > MAX_ENTITY_LEN {
                    return None;
                }
                entity.push(c);
            }
            _ => return None,
        }
    }
    entity.push(';');

    let decoded = htmlescape::decode_html(&entity).ok()?;
    *chars = lookahead;
    Some(decoded)
}

/// Collapses whitespace runs to a single ASCII space and trims the ends.
///
/// Returns `Cow::Borrowed` when the input is already collapsed.
pub fn collapse_whitespace(s: &str) -> Cow<'_, str> {
    let already_clean = s.trim() == s
        && !s
            .as_bytes()
            .windows(2)
            .any(|w| w[0].is_ascii_whitespace() && w[1].is_ascii_whitespace())
        && s.chars().all(|c| c == ' ' || !c.is_whitespace());
    if already_clean {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Truncates to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(s[..idx].to_string()),
        None => Cow::Borrowed(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_inline_markup() {
        assert_eq!(normalize_title("<b>Hi</b> There"), "Hi There");
        assert_eq!(normalize_title("<p>Hello</p>"), "Hello");
        assert_eq!(normalize_title("<div><p>Nested</p></div>"), "Nested");
    }

    #[test]
    fn test_tags_separate_words() {
        assert_eq!(normalize_title("<p>One</p><p>Two</p>"), "One Two");
        assert_eq!(normalize_title("line<br/>break"), "line break");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize_title("  a \t\n b   c "), "a b c");
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert_eq!(normalize_title(""), "");
        assert_eq!(normalize_title("   \n\t "), "");
        assert_eq!(normalize_title("<br/>"), "");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(normalize_title("Rust &amp; Go"), "Rust & Go");
        assert_eq!(normalize_title("&quot;quoted&quot;"), "\"quoted\"");
        assert_eq!(normalize_title("A&nbsp;B"), "A B");
        assert_eq!(normalize_title("&#65;&#x42;"), "AB");
    }

    #[test]
    fn test_decodes_typographic_entities() {
        assert_eq!(
            normalize_title("Rust&rsquo;s 2024 &mdash; what&#8217;s next&hellip; &eacute;t&eacute;"),
            "Rust\u{2019}s 2024 \u{2014} what\u{2019}s next\u{2026} \u{e9}t\u{e9}"
        );
        assert_eq!(normalize_title("Caf&eacute; &copy; &euro;5"), "Caf\u{e9} \u{a9} \u{20ac}5");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(normalize_title("&bogus; thing"), "&bogus; thing");
        assert_eq!(normalize_title("AT&T"), "AT&T");
        assert_eq!(normalize_title("fish & chips;"), "fish & chips;");
        assert_eq!(normalize_title("&;"), "&;");
    }

    #[test]
    fn test_double_escaped_entity_is_stable() {
        // A title is compared in its fully decoded form, on every call.
        let once = normalize_title("Use &amp;amp; in HTML");
        assert_eq!(once, "Use & in HTML");
        assert_eq!(normalize_title(&once), once);
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(normalize_title("5 < 6"), "5 < 6");
        assert_eq!(normalize_title("a <3 b"), "a <3 b");
    }

    #[test]
    fn test_escaped_markup_reaches_fixpoint() {
        // First pass yields "a <b>c</b>", which is itself markup.
        assert_eq!(normalize_title("a &lt;b&gt;c&lt;/b&gt;"), "a c");
    }

    #[test]
    fn test_unterminated_tag_dropped() {
        assert_eq!(normalize_title("Title <span class=\"x\""), "Title");
    }

    #[test]
    fn test_collapse_whitespace_borrows_clean_input() {
        assert!(matches!(collapse_whitespace("a b c"), Cow::Borrowed(_)));
        assert!(matches!(collapse_whitespace("a  b"), Cow::Owned(_)));
        assert!(matches!(collapse_whitespace("a\tb"), Cow::Owned(_)));
        assert_eq!(collapse_whitespace(" a "), "a");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("日本語テキスト", 2), "日本");
        assert_eq!(truncate_chars("", 0), "");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in ".{0,64}") {
            let once = normalize_title(&raw);
            prop_assert_eq!(normalize_title(&once), once);
        }

        #[test]
        fn prop_normalize_markup_is_idempotent(
            raw in "[a-z <>/&;#x0-9\\t\\n]{0,48}"
        ) {
            let once = normalize_title(&raw);
            prop_assert_eq!(normalize_title(&once), once);
        }

        #[test]
        fn prop_no_outer_or_double_spaces(raw in ".{0,64}") {
            let out = normalize_title(&raw);
            prop_assert_eq!(out.trim(), out.as_str());
            prop_assert!(!out.contains("  "));
        }
    }
}
