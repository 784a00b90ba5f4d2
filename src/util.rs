//! Byte-level helpers for loading markup.

use std::borrow::Cow;

use memchr::memmem;

/// Decode markup bytes to a string.
///
/// 1. UTF-8 (a byte order mark is handled by encoding_rs)
/// 2. the hinted encoding, usually from a `charset=` declaration
/// 3. Windows-1252, a superset of ISO-8859-1
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Find a `charset=` declaration near the start of the input, as in
/// `<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=iso-8859-1">`.
pub fn sniff_charset(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(1024)];
    let lowered = prefix.to_ascii_lowercase();
    let at = memmem::find(&lowered, b"charset=")? + b"charset=".len();

    let rest = &prefix[at..];
    let rest = rest.strip_prefix(b"\"").or_else(|| rest.strip_prefix(b"'")).unwrap_or(rest);
    let end = rest
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':')))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    std::str::from_utf8(&rest[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert!(matches!(decode_text("héllo".as_bytes(), None), Cow::Borrowed("héllo")));
    }

    #[test]
    fn test_decode_with_hint_and_fallback() {
        // 0xE9 is é in Latin-1, and invalid on its own in UTF-8.
        let bytes = b"caf\xe9";
        assert_eq!(decode_text(bytes, Some("iso-8859-1")), "café");
        assert_eq!(decode_text(bytes, None), "café");
        assert_eq!(decode_text(bytes, Some("no-such-charset")), "café");
    }

    #[test]
    fn test_sniff_charset() {
        let meta = b"<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=ISO-8859-1\">";
        assert_eq!(sniff_charset(meta), Some("ISO-8859-1"));
        assert_eq!(sniff_charset(b"<meta charset='koi8-r'>"), Some("koi8-r"));
        assert_eq!(sniff_charset(b"<P>no declaration</P>"), None);
        assert_eq!(sniff_charset(b"charset=>"), None);
    }
}
