//! Block-tree parser and the public parse entry point.

use thiserror::Error;

use crate::lexer::{Lexer, Token};
use crate::node::{Block, PairValue};
use crate::read;
use core_model::Display;

#[derive(Debug, Error)]
pub enum AdlError {
    #[error("{0}: {1}")]
    Io(String, String),
    #[error("line {0}: unterminated string")]
    UnterminatedString(usize),
    #[error("line {0}: unexpected character {1:?}")]
    UnexpectedCharacter(usize, char),
    #[error("line {0}: expected {1}")]
    Expected(usize, &'static str),
    #[error("line {0}: unexpected closing brace")]
    UnexpectedClose(usize),
    #[error("display file has no `file` or `display` block")]
    MissingHeader,
}

struct TreeParser<'t> {
    lexer: Lexer<'t>,
    peeked: Option<Token>,
}

impl<'t> TreeParser<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            lexer: Lexer::new(text),
            peeked: None,
        }
    }

    fn next(&mut self) -> Result<Option<Token>, AdlError> {
        if let Some(token) = self.peeked.take() {
            return Ok(Some(token));
        }
        self.lexer.next_token()
    }

    fn peek(&mut self) -> Result<Option<&Token>, AdlError> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn line(&self) -> usize {
        self.lexer.line()
    }

    /// Top level: a sequence of named blocks.
    fn parse_all(&mut self) -> Result<Vec<Block>, AdlError> {
        let mut blocks = Vec::new();
        while let Some(token) = self.next()? {
            let name = match token {
                Token::Word(name) | Token::Quoted(name) => name,
                Token::CloseBrace => return Err(AdlError::UnexpectedClose(self.line())),
                _ => return Err(AdlError::Expected(self.line(), "a block name")),
            };
            match self.next()? {
                Some(Token::OpenBrace) => blocks.push(self.parse_block(name)?),
                _ => return Err(AdlError::Expected(self.line(), "'{'")),
            }
        }
        Ok(blocks)
    }

    fn parse_block(&mut self, name: String) -> Result<Block, AdlError> {
        let mut block = Block::named(name);
        loop {
            let Some(token) = self.next()? else {
                return Err(AdlError::Expected(self.line(), "'}'"));
            };
            match token {
                Token::CloseBrace => return Ok(block),
                Token::Word(entry) | Token::Quoted(entry) => match self.peek()? {
                    Some(Token::Equals) => {
                        self.next()?;
                        let value = match self.next()? {
                            Some(Token::Word(value)) => PairValue::Bare(value),
                            Some(Token::Quoted(value)) => PairValue::Quoted(value),
                            _ => return Err(AdlError::Expected(self.line(), "a value")),
                        };
                        block.pairs.push((entry, value));
                    }
                    Some(Token::OpenBrace) => {
                        self.next()?;
                        if entry == "points" {
                            block.points = self.parse_points()?;
                        } else {
                            let child = self.parse_block(entry)?;
                            block.children.push(child);
                        }
                    }
                    // A bare word on its own line is a list item
                    // (legacy color tables); keep it and move on.
                    _ => block.values.push(entry),
                },
                Token::OpenParen => {
                    // Stray point list directly in a block body.
                    return Err(AdlError::Expected(self.line(), "a key or block"));
                }
                _ => return Err(AdlError::Expected(self.line(), "a key or '}'")),
            }
        }
    }

    fn parse_points(&mut self) -> Result<Vec<(i32, i32)>, AdlError> {
        let mut points = Vec::new();
        loop {
            match self.next()? {
                Some(Token::CloseBrace) => return Ok(points),
                Some(Token::OpenParen) => {
                    let x = self.parse_int()?;
                    self.expect_comma()?;
                    let y = self.parse_int()?;
                    match self.next()? {
                        Some(Token::CloseParen) => points.push((x, y)),
                        _ => return Err(AdlError::Expected(self.line(), "')'")),
                    }
                }
                _ => return Err(AdlError::Expected(self.line(), "'(' or '}'")),
            }
        }
    }

    fn parse_int(&mut self) -> Result<i32, AdlError> {
        match self.next()? {
            Some(Token::Word(text)) => text
                .parse::<i32>()
                .map_err(|_| AdlError::Expected(self.line(), "an integer")),
            _ => Err(AdlError::Expected(self.line(), "an integer")),
        }
    }

    fn expect_comma(&mut self) -> Result<(), AdlError> {
        match self.next()? {
            Some(Token::Comma) => Ok(()),
            _ => Err(AdlError::Expected(self.line(), "','")),
        }
    }
}

/// Parse a display file's text into the model.
pub fn parse_display(text: &str) -> Result<Display, AdlError> {
    let blocks = TreeParser::new(text).parse_all()?;
    read::display_from_blocks(&blocks)
}
