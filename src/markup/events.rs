//! Classification of tokens into hypertext events.

use std::borrow::Cow;

use super::tokenizer::{Token, Tokenizer};
use crate::diagnostic::Diagnostic;

/// What the reader state machine consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent<'a> {
    Text(Cow<'a, str>),
    TagOpen(&'a str),
    TagClose(&'a str),
    AnchorOpen {
        name: Option<Cow<'a, str>>,
        href: Option<Cow<'a, str>>,
    },
    AnchorClose,
    /// Contents of `<TITLE>`, whitespace-trimmed.
    Title(String),
    /// `<NEXTID N=z<n>>`: the next free anchor serial.
    NextId(u64),
    IsIndex,
}

/// Iterator over the events of a markup string, paired with byte offsets.
pub struct Events<'a> {
    tokens: Tokenizer<'a>,
    /// A token read ahead while collecting a title.
    pending: Option<(usize, Token<'a>)>,
}

impl<'a> Events<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: Tokenizer::new(input),
            pending: None,
        }
    }

    /// Problems the tokenizer recovered from.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.tokens.into_diagnostics()
    }

    fn next_token(&mut self) -> Option<(usize, Token<'a>)> {
        self.pending.take().or_else(|| self.tokens.next())
    }

    /// Gather text up to `</TITLE>`. Any other tag ends the title and is
    /// kept for the next call.
    fn title(&mut self) -> String {
        let mut title = String::new();
        while let Some((offset, token)) = self.next_token() {
            match token {
                Token::Text(text) => title.push_str(&text),
                Token::EndTag { name } if name.eq_ignore_ascii_case("title") => break,
                token => {
                    self.pending = Some((offset, token));
                    break;
                }
            }
        }
        title.trim().to_string()
    }
}

impl<'a> Iterator for Events<'a> {
    type Item = (usize, MarkupEvent<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (offset, token) = self.next_token()?;
        let event = match token {
            Token::Text(text) => MarkupEvent::Text(text),
            Token::EndTag { name } if name.eq_ignore_ascii_case("a") => MarkupEvent::AnchorClose,
            Token::EndTag { name } => MarkupEvent::TagClose(name),
            Token::StartTag { name, attributes } => {
                if name.eq_ignore_ascii_case("a") {
                    let mut anchor_name = None;
                    let mut href = None;
                    for (key, value) in attributes {
                        if key.eq_ignore_ascii_case("name") {
                            anchor_name = Some(value);
                        } else if key.eq_ignore_ascii_case("href") {
                            href = Some(value);
                        }
                    }
                    MarkupEvent::AnchorOpen {
                        name: anchor_name,
                        href,
                    }
                } else if name.eq_ignore_ascii_case("title") {
                    MarkupEvent::Title(self.title())
                } else if name.eq_ignore_ascii_case("nextid") {
                    let token = Token::StartTag { name, attributes };
                    match token.attribute("n").and_then(parse_next_id) {
                        Some(n) => MarkupEvent::NextId(n),
                        None => MarkupEvent::TagOpen(name),
                    }
                } else if name.eq_ignore_ascii_case("isindex") {
                    MarkupEvent::IsIndex
                } else {
                    MarkupEvent::TagOpen(name)
                }
            }
        };
        Some((offset, event))
    }
}

/// `z12`, `Z12` or `12`. Values too large for `u64` saturate.
fn parse_next_id(value: &str) -> Option<u64> {
    let digits = value.trim_start_matches(['z', 'Z']);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}
