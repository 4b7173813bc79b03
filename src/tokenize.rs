//! Tokenizer - stage two of the pipeline
//!
//! One deterministic pass over the normalized text. Recognition priority:
//! quoted literals > tags > flags > numbers > UUID identifiers > words.
//! Words are whitespace-delimited and never split on '.', '/', ':' or '@',
//! so paths, URLs and emails survive as single tokens.
//!
//! Quote handling: a quote character opens a literal only at token start
//! (or right after '=' in a flag). Inside the literal, a backslash escapes
//! the next character and the first unescaped occurrence of the opening
//! character closes the span; other quote characters are plain content and
//! are never re-paired. An unclosed quote or tag rejects the whole input.

use crate::normalize::Normalized;
use crate::types::{RejectKind, Rejection, Token, TokenKind};
use regex::Regex;

const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

/// Token scanner holding the compiled shape patterns
pub struct Tokenizer {
    number: Regex,
    uuid: Regex,
    flag_name: Regex,
}

impl Tokenizer {
    pub fn new() -> Self {
        // Compile once - these should never fail
        Self {
            number: Regex::new(r"^\d+$").expect("Invalid regex pattern"),
            uuid: Regex::new(
                r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            )
            .expect("Invalid regex pattern"),
            flag_name: Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("Invalid regex pattern"),
        }
    }

    /// Scan normalized text into tokens
    ///
    /// The first token, if it is a plain word, is tentatively retagged as
    /// the verb; the classifier decides what it means.
    pub fn scan(&self, norm: &Normalized) -> Result<Vec<Token>, Rejection> {
        let chars: Vec<(usize, char)> = norm.text.char_indices().collect();
        let total = norm.text.len();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i].1;
            if c == ' ' {
                i += 1;
            } else if QUOTE_CHARS.contains(&c) {
                let (token, next) = scan_quoted(&chars, i)?;
                tokens.push(token);
                i = next;
            } else if c == '<' {
                let (token, next) = scan_tag(&chars, i)?;
                tokens.push(token);
                i = next;
            } else if c == '-' {
                let (token, next) = self.scan_flag_or_word(&chars, i, total)?;
                tokens.push(token);
                i = next;
            } else {
                let (token, next) = self.scan_word(&chars, i, total);
                tokens.push(token);
                i = next;
            }
        }

        if let Some(first) = tokens.first_mut() {
            if first.kind == TokenKind::Word {
                first.kind = TokenKind::Verb;
            }
        }

        tracing::trace!("Scanned {} tokens from {} bytes", tokens.len(), total);
        Ok(tokens)
    }

    /// A token-start dash chunk: a flag when a valid name follows the
    /// dashes, otherwise a plain word ("-5", "--", "---x")
    fn scan_flag_or_word(
        &self,
        chars: &[(usize, char)],
        start: usize,
        total: usize,
    ) -> Result<(Token, usize), Rejection> {
        let start_pos = chars[start].0;
        let mut i = start;
        let mut dashes = 0;
        while i < chars.len() && chars[i].1 == '-' {
            dashes += 1;
            i += 1;
            if dashes == 2 {
                break;
            }
        }

        let mut name = String::new();
        while i < chars.len() {
            let c = chars[i].1;
            if c == ' ' || c == '=' {
                break;
            }
            name.push(c);
            i += 1;
        }

        if !self.flag_name.is_match(&name) {
            return Ok(self.scan_word(chars, start, total));
        }

        if i < chars.len() && chars[i].1 == '=' {
            i += 1;
            // Inline value, possibly quoted: --title="My Task"
            if i < chars.len() && QUOTE_CHARS.contains(&chars[i].1) {
                let (value_token, next) = scan_quoted(chars, i)?;
                let token = Token::with_attachment(
                    TokenKind::Flag,
                    name,
                    value_token.text,
                    start_pos,
                    value_token.end,
                );
                return Ok((token, next));
            }
            let mut value = String::new();
            while i < chars.len() && chars[i].1 != ' ' {
                value.push(chars[i].1);
                i += 1;
            }
            let end = byte_end(chars, i, total);
            return Ok((
                Token::with_attachment(TokenKind::Flag, name, value, start_pos, end),
                i,
            ));
        }

        let end = byte_end(chars, i, total);
        Ok((Token::new(TokenKind::Flag, name, start_pos, end), i))
    }

    /// A whitespace-delimited word, classified by shape
    fn scan_word(&self, chars: &[(usize, char)], start: usize, total: usize) -> (Token, usize) {
        let start_pos = chars[start].0;
        let mut text = String::new();
        let mut i = start;
        while i < chars.len() && chars[i].1 != ' ' {
            text.push(chars[i].1);
            i += 1;
        }
        let end = byte_end(chars, i, total);

        let kind = if self.number.is_match(&text) {
            TokenKind::Number
        } else if self.uuid.is_match(&text) {
            TokenKind::Identifier
        } else {
            TokenKind::Word
        };
        (Token::new(kind, text, start_pos, end), i)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

fn scan_quoted(chars: &[(usize, char)], start: usize) -> Result<(Token, usize), Rejection> {
    let (start_pos, quote) = chars[start];
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            text.push(chars[i + 1].1);
            i += 2;
            continue;
        }
        if c == quote {
            let end = pos + c.len_utf8();
            return Ok((
                Token::new(TokenKind::QuotedLiteral, text, start_pos, end),
                i + 1,
            ));
        }
        text.push(c);
        i += 1;
    }

    Err(Rejection::new(
        RejectKind::InvalidFormat,
        format!(
            "❌ Unterminated quote starting at offset {}\n💡 Correct usage: close the {} quote or remove it",
            start_pos, quote
        ),
    ))
}

fn scan_tag(chars: &[(usize, char)], start: usize) -> Result<(Token, usize), Rejection> {
    let start_pos = chars[start].0;
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c == '>' {
            if text.is_empty() {
                return Err(Rejection::new(
                    RejectKind::InvalidFormat,
                    "❌ Empty tag <>\n💡 Correct usage: name the tag, e.g. <work>",
                ));
            }
            let end = pos + 1;
            return Ok((Token::new(TokenKind::Tag, text, start_pos, end), i + 1));
        }
        text.push(c);
        i += 1;
    }

    Err(Rejection::new(
        RejectKind::InvalidFormat,
        format!(
            "❌ Unclosed tag starting at offset {}\n💡 Correct usage: close the tag with '>', e.g. <work>",
            start_pos
        ),
    ))
}

fn byte_end(chars: &[(usize, char)], i: usize, total: usize) -> usize {
    if i < chars.len() {
        chars[i].0
    } else {
        total
    }
}
