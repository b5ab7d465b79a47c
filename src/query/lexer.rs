//! Lexer for the filter-query language
//!
//! Produces tokens tagged with their character offset so syntax errors can
//! point at the offending input.

use crate::error::PagedexError;
use crate::Result;

/// Token types for filter queries
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unquoted word: a field name, keyword-free value or bare phrase
    Ident(String),
    /// Single- or double-quoted string with escapes resolved
    Quoted(String),
    /// `~` contains operator
    Tilde,
    /// `=` equality operator
    Equals,
    /// Any other comparison operator (`!=`, `!~`, `<`, `>=`, ...)
    Operator(String),
    LeftParen,
    RightParen,
    And,
    Or,
    Eof,
}

impl Token {
    /// Source-like rendering used in error messages
    pub fn display(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Quoted(s) => format!("\"{}\"", s),
            Token::Tilde => "~".to_string(),
            Token::Equals => "=".to_string(),
            Token::Operator(op) => op.clone(),
            Token::LeftParen => "(".to_string(),
            Token::RightParen => ")".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Eof => "end of query".to_string(),
        }
    }
}

/// A token and the character offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Spanned> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(self.spanned(Token::Eof, start));
        };

        let token = match ch {
            '~' => {
                self.advance();
                Token::Tilde
            }
            '=' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::Operator("==".to_string())
                } else {
                    Token::Equals
                }
            }
            '!' | '<' | '>' => self.read_operator(),
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            '"' | '\'' => self.read_quoted(ch)?,
            _ => self.read_word(),
        };

        Ok(self.spanned(token, start))
    }

    /// Tokenize the whole input, ending with `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn spanned(&self, token: Token, position: usize) -> Spanned {
        Spanned { token, position }
    }

    fn read_operator(&mut self) -> Token {
        let mut op = String::new();
        while let Some(ch) = self.current_char() {
            if matches!(ch, '!' | '<' | '>' | '=' | '~') {
                op.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::Operator(op)
    }

    fn read_quoted(&mut self, quote: char) -> Result<Token> {
        let start = self.position;
        self.advance();
        let mut value = String::new();

        loop {
            match self.current_char() {
                None => {
                    let raw: String = self.input[start..].iter().collect();
                    return Err(PagedexError::syntax(
                        "unterminated quoted string",
                        raw,
                        start,
                    ));
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some(escaped) => {
                            value.push(escaped);
                            self.advance();
                        }
                        None => value.push('\\'),
                    }
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(Token::Quoted(value));
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.current_char() {
            if Self::is_word_char(ch) {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match word.to_uppercase().as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            _ => Token::Ident(word),
        }
    }

    fn is_word_char(ch: char) -> bool {
        !ch.is_whitespace() && !matches!(ch, '"' | '\'' | '~' | '=' | '!' | '<' | '>' | '(' | ')')
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }
}
