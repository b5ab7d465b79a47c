//! Translator from filter queries to [`QueryPlan`]s
//!
//! # Grammar
//!
//! ```text
//! query    := ε | clause ((AND | OR) clause)*
//! clause   := text_field '~' value
//!           | key_field '=' value
//!           | 'type' '=' 'page'
//! value    := QUOTED | WORD
//! text_field := 'text' | 'title'
//! key_field  := 'space' | 'container'
//! ```
//!
//! `AND` and `OR` bind equally and combine strictly left to right.

use tracing::debug;

use super::lexer::{Lexer, Spanned, Token};
use super::plan::{QueryPlan, TextField};
use crate::error::PagedexError;
use crate::Result;

/// Translate a filter query into a plan
pub fn translate(query: &str) -> Result<QueryPlan> {
    let plan = QueryTranslator::new(query)?.translate()?;
    debug!(query, clauses = plan.clause_count(), "translated filter query");
    Ok(plan)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Text(TextField),
    ContainerKey,
    Type,
}

#[derive(Clone, Copy)]
enum Connective {
    And,
    Or,
}

pub struct QueryTranslator {
    tokens: Vec<Spanned>,
    cursor: usize,
}

impl QueryTranslator {
    pub fn new(query: &str) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::new(query).tokenize()?,
            cursor: 0,
        })
    }

    pub fn translate(&mut self) -> Result<QueryPlan> {
        if self.current().token == Token::Eof {
            return Ok(QueryPlan::MatchAll);
        }

        let mut plan = self.parse_clause()?;

        loop {
            let connective = match self.current().token {
                Token::Eof => return Ok(plan),
                Token::And => Connective::And,
                Token::Or => Connective::Or,
                _ => return Err(self.error_here("expected AND or OR between clauses")),
            };
            let keyword = self.advance();
            if self.current().token == Token::Eof {
                return Err(PagedexError::syntax(
                    format!("dangling {} with no clause after it", keyword.token.display()),
                    keyword.token.display(),
                    keyword.position,
                ));
            }
            let clause = self.parse_clause()?;
            plan = match connective {
                Connective::And => plan.and(clause),
                Connective::Or => plan.or(clause),
            };
        }
    }

    fn parse_clause(&mut self) -> Result<QueryPlan> {
        let field_token = self.advance();
        let field = match &field_token.token {
            Token::Ident(name) => match name.to_lowercase().as_str() {
                "text" => Field::Text(TextField::Body),
                "title" => Field::Text(TextField::Title),
                "space" | "container" => Field::ContainerKey,
                "type" => Field::Type,
                _ => {
                    return Err(PagedexError::syntax(
                        format!("unknown field '{}'", name),
                        name.clone(),
                        field_token.position,
                    ))
                }
            },
            Token::LeftParen | Token::RightParen => {
                return Err(Self::error_at(&field_token, "parentheses are not supported"))
            }
            _ => return Err(Self::error_at(&field_token, "expected a field name")),
        };

        let operator = self.advance();
        let expected = match field {
            Field::Text(_) => Token::Tilde,
            Field::ContainerKey | Field::Type => Token::Equals,
        };
        if operator.token != expected {
            let message = match &operator.token {
                Token::Eof => format!("expected '{}' after field", expected.display()),
                Token::Tilde | Token::Equals | Token::Operator(_) => format!(
                    "operator '{}' is not supported for field '{}', use '{}'",
                    operator.token.display(),
                    field_token.token.display(),
                    expected.display()
                ),
                Token::Ident(word) if word.eq_ignore_ascii_case("in") || word.eq_ignore_ascii_case("not") => {
                    format!("operator '{}' is not supported", word)
                }
                Token::LeftParen | Token::RightParen => "parentheses are not supported".to_string(),
                _ => format!("expected '{}' after field", expected.display()),
            };
            return Err(Self::error_at(&operator, &message));
        }

        let value_token = self.advance();
        let value = match &value_token.token {
            Token::Quoted(v) | Token::Ident(v) => v.clone(),
            Token::LeftParen | Token::RightParen => {
                return Err(Self::error_at(&value_token, "parentheses are not supported"))
            }
            _ => {
                return Err(Self::error_at(
                    &value_token,
                    &format!("expected a value after '{}'", operator.token.display()),
                ))
            }
        };

        match field {
            Field::Text(text_field) => Ok(QueryPlan::text(text_field, value)),
            Field::ContainerKey => Ok(QueryPlan::container(value)),
            Field::Type if value.eq_ignore_ascii_case("page") => Ok(QueryPlan::MatchAll),
            Field::Type => Err(PagedexError::syntax(
                format!("unsupported type '{}', only 'page' is available", value),
                value,
                value_token.position,
            )),
        }
    }

    fn current(&self) -> &Spanned {
        // tokenize always ends with Eof and advance never moves past it
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let spanned = self.current().clone();
        if spanned.token != Token::Eof {
            self.cursor += 1;
        }
        spanned
    }

    fn error_here(&self, message: &str) -> PagedexError {
        Self::error_at(self.current(), message)
    }

    fn error_at(spanned: &Spanned, message: &str) -> PagedexError {
        PagedexError::syntax(message, spanned.token.display(), spanned.position)
    }
}
