//! IRCv3 message tag escaping utilities.

/// Escape a tag value for the wire.
///
/// Escapes special characters according to the IRCv3 message-tags spec.
pub fn escape_tag_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => escaped.push_str("\\:"),
            ' ' => escaped.push_str("\\s"),
            '\\' => escaped.push_str("\\\\"),
            '\r' => escaped.push_str("\\r"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Unescape a tag value from wire format.
///
/// Reverses [`escape_tag_value`]. Unknown escapes yield the escaped
/// character; a lone trailing backslash is kept as-is.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => '\\',
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Build the body of an `@tags` block: `key=value` pairs joined by `;`.
///
/// Pairs whose value is `None` are omitted. Returns `""` when nothing
/// remains; callers must then leave the `@` block off entirely
/// (see [`with_tags`](super::with_tags)).
pub fn build_tag_string<I, K, V>(tags: I) -> String
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|(key, value)| {
            value.map(|value| format!("{}={}", key.as_ref(), escape_tag_value(value.as_ref())))
        })
        .collect::<Vec<_>>()
        .join(";")
}
