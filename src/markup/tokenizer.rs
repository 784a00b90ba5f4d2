//! Lexical scanner for tagged markup.
//!
//! Produces text runs (with character references decoded), start tags with
//! their attributes, and end tags. Comments, declarations and processing
//! instructions are skipped. Nothing here is fatal: a `<` that does not
//! start a complete tag is kept as text.

use std::borrow::Cow;

use memchr::{memchr, memmem};

use super::entities;
use crate::diagnostic::{Diagnostic, Diagnostics, W_UNTERMINATED_TAG};

/// One lexical unit of markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(Cow<'a, str>),
    StartTag {
        name: &'a str,
        attributes: Vec<(&'a str, Cow<'a, str>)>,
    },
    EndTag {
        name: &'a str,
    },
}

impl Token<'_> {
    /// Value of the attribute `name` (ASCII case-insensitive) of a start tag.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Token::StartTag { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_ref()),
            _ => None,
        }
    }
}

/// Iterator over the tokens of a markup string, paired with their byte
/// offsets.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    diagnostics: Diagnostics,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Problems recovered from so far.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_vec()
    }

    fn text(&mut self, start: usize, end: usize) -> Token<'a> {
        let input = self.input;
        let raw = &input[start..end];
        Token::Text(entities::decode(raw, start, &mut self.diagnostics))
    }

    /// Skip past `terminator`, or to the end of input when it is missing.
    fn skip_until(&mut self, start: usize, terminator: &[u8], what: &str) {
        let bytes = &self.input.as_bytes()[start..];
        match memmem::find(bytes, terminator) {
            Some(i) => self.pos = start + i + terminator.len(),
            None => {
                self.diagnostics.push(
                    start,
                    W_UNTERMINATED_TAG,
                    format!("unterminated {what} runs to end of input"),
                );
                self.pos = self.input.len();
            }
        }
    }

    /// Scan a tag starting at `self.pos` (which holds `<`). Returns `None`
    /// when the `<` does not begin a complete tag.
    fn tag(&mut self) -> Option<Token<'a>> {
        let input = self.input;
        let bytes = input.as_bytes();
        let lt = self.pos;
        let mut i = lt + 1;
        let closing = bytes.get(i) == Some(&b'/');
        if closing {
            i += 1;
        }

        let name_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'.')) {
            i += 1;
        }
        if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
            return None;
        }
        let name = &input[name_start..i];

        if closing {
            let gt = i + memchr(b'>', &bytes[i..])?;
            self.pos = gt + 1;
            return Some(Token::EndTag { name });
        }

        let mut attributes = Vec::new();
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                None => return None,
                Some(b'>') => {
                    self.pos = i + 1;
                    return Some(Token::StartTag { name, attributes });
                }
                Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                    self.pos = i + 2;
                    return Some(Token::StartTag { name, attributes });
                }
                Some(_) => {}
            }

            let key_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>')
            {
                i += 1;
            }
            let key = &input[key_start..i];
            if key.is_empty() {
                // A stray '=' with no name.
                i += 1;
                continue;
            }

            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if bytes.get(i) != Some(&b'=') {
                attributes.push((key, Cow::Borrowed("")));
                continue;
            }
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let (value_start, value_end) = match bytes.get(i) {
                None => return None,
                Some(&quote @ (b'"' | b'\'')) => {
                    let start = i + 1;
                    let end = start + memchr(quote, &bytes[start..])?;
                    i = end + 1;
                    (start, end)
                }
                Some(_) => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    (start, i)
                }
            };
            let raw = &input[value_start..value_end];
            attributes.push((key, entities::decode(raw, value_start, &mut self.diagnostics)));
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = (usize, Token<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let input = self.input;
        let bytes = input.as_bytes();
        loop {
            let start = self.pos;
            if start >= bytes.len() {
                return None;
            }

            if bytes[start] != b'<' {
                let end = memchr(b'<', &bytes[start..]).map_or(bytes.len(), |i| start + i);
                self.pos = end;
                return Some((start, self.text(start, end)));
            }

            let rest = &bytes[start..];
            if rest.starts_with(b"<!--") {
                self.skip_until(start + 4, b"-->", "comment");
                continue;
            }
            if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
                let terminator: &[u8] = if rest[1] == b'?' { b"?>" } else { b">" };
                self.skip_until(start + 2, terminator, "declaration");
                continue;
            }

            if let Some(token) = self.tag() {
                return Some((start, token));
            }

            // Not a tag: the '<' and what follows up to the next '<' is text.
            let looks_like_tag = rest
                .get(1)
                .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'/');
            if looks_like_tag {
                self.diagnostics.push(
                    start,
                    W_UNTERMINATED_TAG,
                    "unterminated tag treated as text",
                );
            }
            let end = memchr(b'<', &bytes[start + 1..]).map_or(bytes.len(), |i| start + 1 + i);
            self.pos = end;
            return Some((start, self.text(start, end)));
        }
    }
}

/// Tokenize a whole input.
pub fn tokenize(input: &str) -> (Vec<(usize, Token<'_>)>, Vec<Diagnostic>) {
    let mut tokenizer = Tokenizer::new(input);
    let tokens: Vec<_> = tokenizer.by_ref().collect();
    (tokens, tokenizer.into_diagnostics())
}
