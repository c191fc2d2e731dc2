//! Lexer for the SCIM filter/path grammar (RFC 7644 §3.4.2.2).
//!
//! Tokens: identifiers/dotted-URN paths, numeric literals, boolean
//! literals, quoted strings, duration-less ISO-8601 `dateTime` literals,
//! `null`, the relational/logical keywords, and the grouping/bracket
//! punctuation `attr[subFilter]` needs.

use crate::error::ScimError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Path(String),
    Number(f64),
    Bool(bool),
    Str(String),
    DateTime(String),
    Null,
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
    Pr,
    And,
    Or,
    Not,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ScimError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn skip_whitespace(&mut self) {
        while let Some((_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ScimError> {
        self.skip_whitespace();
        let (start, c) = match self.chars.peek().copied() {
            Some(pair) => pair,
            None => return Ok(Token::Eof),
        };

        match c {
            '(' => {
                self.chars.next();
                Ok(Token::LParen)
            }
            ')' => {
                self.chars.next();
                Ok(Token::RParen)
            }
            '[' => {
                self.chars.next();
                Ok(Token::LBracket)
            }
            ']' => {
                self.chars.next();
                Ok(Token::RBracket)
            }
            '"' => self.lex_string(),
            c if c == '-' || c.is_ascii_digit() => self.lex_number(start),
            c if is_path_start(c) => self.lex_word(start),
            other => Err(ScimError::InvalidFilter {
                expression: self.input.to_string(),
                message: format!("unexpected character '{other}'"),
            }),
        }
    }

    fn lex_string(&mut self) -> Result<Token, ScimError> {
        self.chars.next(); // opening quote
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(Token::Str(s)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, '"')) => s.push('"'),
                    Some((_, '\\')) => s.push('\\'),
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, other)) => s.push(other),
                    None => {
                        return Err(ScimError::InvalidFilter {
                            expression: self.input.to_string(),
                            message: "unterminated string escape".to_string(),
                        })
                    }
                },
                Some((_, ch)) => s.push(ch),
                None => {
                    return Err(ScimError::InvalidFilter {
                        expression: self.input.to_string(),
                        message: "unterminated string literal".to_string(),
                    })
                }
            }
        }
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, ScimError> {
        let mut end = start;
        if let Some((_, '-')) = self.chars.peek().copied() {
            self.chars.next();
            end += 1;
        }
        while let Some((idx, c)) = self.chars.peek().copied() {
            if c.is_ascii_digit() || c == '.' {
                end = idx + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.input[start..end];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ScimError::InvalidFilter {
                expression: self.input.to_string(),
                message: format!("invalid numeric literal '{text}'"),
            })
    }

    fn lex_word(&mut self, start: usize) -> Result<Token, ScimError> {
        let mut end = start;
        while let Some((idx, c)) = self.chars.peek().copied() {
            if is_path_char(c) {
                end = idx + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let word = &self.input[start..end];
        Ok(match word {
            "eq" => Token::Eq,
            "ne" => Token::Ne,
            "co" => Token::Co,
            "sw" => Token::Sw,
            "ew" => Token::Ew,
            "gt" => Token::Gt,
            "ge" => Token::Ge,
            "lt" => Token::Lt,
            "le" => Token::Le,
            "pr" => Token::Pr,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            "null" => Token::Null,
            _ if looks_like_date_time(word) => Token::DateTime(word.to_string()),
            _ => Token::Path(word.to_string()),
        })
    }
}

fn is_path_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '-' | '$' | 'T' | 'Z' | '+')
}

/// Heuristic: a bare word of the form `YYYY-MM-DDTHH:MM:SS(Z|+HH:MM)` is a
/// `dateTime` literal, not a path — paths never contain `T` mid-word
/// followed by digits-colons in that shape and SCIM attribute names never
/// start with four digits.
fn looks_like_date_time(word: &str) -> bool {
    let bytes = word.as_bytes();
    bytes.len() >= 19
        && bytes[0].is_ascii_digit()
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b'T'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_comparison() {
        let tokens = Lexer::new("userName eq \"bjensen\"").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Path("userName".into()),
                Token::Eq,
                Token::Str("bjensen".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn tokenizes_urn_prefixed_path() {
        let tokens = Lexer::new(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber eq \"1\"",
        )
        .tokenize()
        .unwrap();
        assert_eq!(
            tokens[0],
            Token::Path(
                "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber"
                    .into()
            )
        );
    }

    #[test]
    fn tokenizes_value_filter_brackets() {
        let tokens = Lexer::new("emails[type eq \"work\"]").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Path("emails".into()),
                Token::LBracket,
                Token::Path("type".into()),
                Token::Eq,
                Token::Str("work".into()),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_datetime_literal() {
        let tokens = Lexer::new("meta.created gt 2011-05-13T04:42:34Z").tokenize().unwrap();
        assert_eq!(tokens[2], Token::DateTime("2011-05-13T04:42:34Z".into()));
    }

    #[test]
    fn tokenizes_negative_and_decimal_numbers() {
        let tokens = Lexer::new("score gt -1.5").tokenize().unwrap();
        assert_eq!(tokens[2], Token::Number(-1.5));
    }
}
