//! UCL parser for converting tokens into a document tree
//!
//! This module consumes tokens from the [`Scanner`] and builds [`Map`]s.
//! Grammar in brief:
//!
//! - a statement is a key followed by a value and an optional `;` or `,`
//! - `=` and `:` between key and value are optional
//! - `key1 key2 value` is shorthand for `key1 { key2 value }`
//! - repeated keys are collected into an array
//! - a bare `{ ... }` in key position merges into the enclosing map

use crate::error::{ParseError, UclError};
use crate::scanner::{Scanner, Scope, Token, TokenKind};
use crate::value::{Array, Map, Value};
use std::collections::VecDeque;
use std::io::Read;

/// Configuration options for the parser
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Record key insertion order on every map
    pub key_order: bool,
    /// Emit scanner and parser diagnostics through `tracing`
    pub trace: bool,
    /// Maximum nesting depth to prevent stack overflow
    pub max_depth: usize,
}

impl DecoderOptions {
    /// Creates a new parser configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether maps record key insertion order
    pub fn with_key_order(mut self, key_order: bool) -> Self {
        self.key_order = key_order;
        self
    }

    /// Sets whether diagnostics are traced
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Sets the maximum nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            key_order: true,
            trace: true,
            max_depth: 128,
        }
    }
}

/// Result of reading one value
enum Slot {
    /// A complete value; its terminator, if any, has been consumed
    Value(Value),
    /// A value directly followed by a closing delimiter, which has been consumed
    Closed(Value, Scope),
    /// A terminator or end of input where a value was expected
    Empty,
}

/// UCL parser over any reader
pub struct Parser<R> {
    scanner: Scanner<R>,
    pending: VecDeque<Token>,
    options: DecoderOptions,
    depth: usize,
    finished: bool,
}

impl<R: Read> Parser<R> {
    /// Creates a new parser with default options
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecoderOptions::default())
    }

    /// Creates a new parser with custom options
    pub fn with_options(reader: R, options: DecoderOptions) -> Self {
        let scanner = Scanner::new(reader).with_trace(options.trace);
        Self {
            scanner,
            pending: VecDeque::new(),
            options,
            depth: 0,
            finished: false,
        }
    }

    /// Current input line
    pub fn line(&self) -> usize {
        self.scanner.line()
    }

    /// Parses the whole input into one document
    pub fn ucl(&mut self) -> Result<Map, UclError> {
        let mut document = Map::tracking(self.options.key_order);
        match self.parse_body(&mut document) {
            Ok(()) => Ok(document),
            Err(e) => {
                if self.options.trace {
                    tracing::debug!(error = %e, line = self.scanner.line(), "UCL decoding failed");
                }
                Err(e)
            }
        }
    }

    /// Returns the next non-comment token, pulling batches from the scanner
    fn next_token(&mut self) -> Result<Option<Token>, UclError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                if token.kind.is_comment() {
                    continue;
                }
                return Ok(Some(token));
            }
            if self.finished {
                return Ok(None);
            }
            match self.scanner.next_tokens()? {
                Some(tokens) => self.pending.extend(tokens),
                None => self.finished = true,
            }
        }
    }

    fn enter(&mut self, line: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(ParseError::MaxDepthExceeded { line });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parses statements into `map` until its closing `}` or end of input
    fn parse_body(&mut self, map: &mut Map) -> Result<(), UclError> {
        while let Some(token) = self.next_token()? {
            match token.kind {
                TokenKind::Tag
                | TokenKind::DoubleQuoted
                | TokenKind::SingleQuoted
                | TokenKind::SlashLiteral => {
                    let line = token.line;
                    let key = token.into_string()?;
                    match self.parse_value(None)? {
                        Slot::Value(value) => map.append(key, value),
                        Slot::Empty => map.append(key, Value::Null),
                        Slot::Closed(value, Scope::Brace) => {
                            map.append(key, value);
                            return Ok(());
                        }
                        Slot::Closed(_, Scope::Bracket) => {
                            return Err(unexpected("']'", "'}'", line));
                        }
                    }
                }
                TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::HashComment
                | TokenKind::BlockComment => {}
                TokenKind::BraceOpen => {
                    // anonymous block, merged into the enclosing map
                    self.enter(token.line)?;
                    self.parse_body(map)?;
                    self.leave();
                }
                TokenKind::BraceClose => return Ok(()),
                TokenKind::MultilineString => {
                    return Err(unexpected("multi-line string", "a key", token.line));
                }
                TokenKind::BracketOpen
                | TokenKind::BracketClose
                | TokenKind::Equal
                | TokenKind::Colon => {
                    return Err(unexpected(token.kind.type_name(), "a key", token.line));
                }
            }
        }
        Ok(())
    }

    /// Parses the value that follows a key, or the next element of a list.
    ///
    /// `token` is an already consumed token to start from.
    fn parse_value(&mut self, token: Option<Token>) -> Result<Slot, UclError> {
        let mut token = match token {
            Some(token) => token,
            None => match self.next_token()? {
                Some(token) => token,
                None => return Ok(Slot::Empty),
            },
        };

        loop {
            match token.kind {
                TokenKind::Tag
                | TokenKind::DoubleQuoted
                | TokenKind::SingleQuoted
                | TokenKind::SlashLiteral => return self.parse_scalar_or_nested(token),
                TokenKind::MultilineString => {
                    return Ok(Slot::Value(Value::String(token.into_string()?)));
                }
                TokenKind::Semicolon | TokenKind::Comma => return Ok(Slot::Empty),
                TokenKind::BraceOpen => {
                    self.enter(token.line)?;
                    let mut map = Map::tracking(self.options.key_order);
                    self.parse_body(&mut map)?;
                    self.leave();
                    return Ok(Slot::Value(Value::Map(map)));
                }
                TokenKind::BracketOpen => {
                    self.enter(token.line)?;
                    let arr = self.parse_list()?;
                    self.leave();
                    return Ok(Slot::Value(Value::Array(Box::new(arr))));
                }
                TokenKind::BraceClose => return Ok(Slot::Closed(Value::Null, Scope::Brace)),
                TokenKind::BracketClose => {
                    return Ok(Slot::Closed(Value::Null, Scope::Bracket));
                }
                TokenKind::Equal
                | TokenKind::Colon
                | TokenKind::HashComment
                | TokenKind::BlockComment => {
                    token = match self.next_token()? {
                        Some(next) => next,
                        None => return Ok(Slot::Empty),
                    };
                }
            }
        }
    }

    /// A key-capable token in value position is a scalar when a terminator,
    /// closer or end of input follows, and a nested key otherwise
    fn parse_scalar_or_nested(&mut self, token: Token) -> Result<Slot, UclError> {
        let line = token.line;
        let text = token.into_string()?;

        let next = match self.next_token()? {
            None => return Ok(Slot::Value(Value::String(text))),
            Some(next) => next,
        };

        match next.kind {
            TokenKind::Semicolon | TokenKind::Comma => Ok(Slot::Value(Value::String(text))),
            TokenKind::BraceClose => Ok(Slot::Closed(Value::String(text), Scope::Brace)),
            TokenKind::BracketClose => Ok(Slot::Closed(Value::String(text), Scope::Bracket)),
            _ => {
                self.enter(line)?;
                let inner = self.parse_value(Some(next));
                self.leave();
                let inner = inner.inspect_err(|e| {
                    if self.options.trace {
                        tracing::debug!(key = %text, error = %e, "failed to parse nested value");
                    }
                })?;

                let wrap = |value: Value| {
                    let mut map = Map::tracking(self.options.key_order);
                    map.append(text, value);
                    Value::Map(map)
                };
                Ok(match inner {
                    Slot::Value(value) => Slot::Value(wrap(value)),
                    Slot::Closed(value, scope) => Slot::Closed(wrap(value), scope),
                    Slot::Empty => Slot::Value(wrap(Value::Null)),
                })
            }
        }
    }

    /// Parses list elements up to the closing `]`
    fn parse_list(&mut self) -> Result<Array, UclError> {
        let mut arr = Array::new();

        while let Some(token) = self.next_token()? {
            match token.kind {
                TokenKind::BracketClose => return Ok(arr),
                TokenKind::Comma => {}
                TokenKind::Semicolon | TokenKind::Colon | TokenKind::Equal => {
                    return Err(unexpected(
                        token.kind.type_name(),
                        "a value or ']'",
                        token.line,
                    ));
                }
                _ => {
                    let line = token.line;
                    match self.parse_value(Some(token))? {
                        Slot::Value(value) => arr.push(value),
                        Slot::Closed(value, Scope::Bracket) => {
                            arr.push(value);
                            return Ok(arr);
                        }
                        Slot::Closed(_, Scope::Brace) => {
                            return Err(unexpected("'}'", "a value or ']'", line));
                        }
                        Slot::Empty => {}
                    }
                }
            }
        }
        Ok(arr)
    }
}

fn unexpected(token: &str, expected: &str, line: usize) -> UclError {
    ParseError::UnexpectedToken {
        token: token.to_string(),
        expected: expected.to_string(),
        line,
    }
    .into()
}
