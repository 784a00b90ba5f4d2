//! Character references: decoding while reading, escaping while writing.

use std::borrow::Cow;

use memchr::{memchr, memchr3};

use crate::diagnostic::{Diagnostics, W_UNKNOWN_ENTITY};

fn named(name: &str) -> Option<char> {
    Some(match name {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => return None,
    })
}

/// Decode character references in `text`, which starts at byte `offset` of
/// the input.
///
/// Unknown references are kept literally and reported. A `&` that does not
/// start a reference is plain text.
pub(crate) fn decode<'a>(text: &'a str, offset: usize, diagnostics: &mut Diagnostics) -> Cow<'a, str> {
    let bytes = text.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..first]);
    let mut pos = first;

    while pos < bytes.len() {
        let Some(rel) = memchr(b'&', &bytes[pos..]) else {
            out.push_str(&text[pos..]);
            break;
        };
        let amp = pos + rel;
        out.push_str(&text[pos..amp]);

        let body_start = amp + 1;
        let numeric = bytes.get(body_start) == Some(&b'#');
        let name_start = if numeric { body_start + 1 } else { body_start };
        let name_end = name_start
            + bytes[name_start..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric())
                .count();

        if name_end == name_start {
            out.push('&');
            pos = body_start;
            continue;
        }

        let name = &text[name_start..name_end];
        let decoded = if numeric {
            let value = match name.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => name.parse().ok(),
            };
            value.and_then(char::from_u32)
        } else {
            named(name)
        };
        let end = if bytes.get(name_end) == Some(&b';') {
            name_end + 1
        } else {
            name_end
        };

        match decoded {
            Some(c) => out.push(c),
            None => {
                diagnostics.push(
                    offset + amp,
                    W_UNKNOWN_ENTITY,
                    format!("unknown character reference {:?}", &text[amp..end]),
                );
                out.push_str(&text[amp..end]);
            }
        }
        pos = end;
    }

    Cow::Owned(out)
}

/// Escape text content: `&`, `<` and `>`.
pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }
    Cow::Owned(escape(text, false))
}

/// Escape an attribute value for use inside double quotes.
pub(crate) fn escape_attribute(value: &str) -> Cow<'_, str> {
    let bytes = value.as_bytes();
    if memchr3(b'&', b'<', b'>', bytes).is_none() && memchr(b'"', bytes).is_none() {
        return Cow::Borrowed(value);
    }
    Cow::Owned(escape(value, true))
}

fn escape(text: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
