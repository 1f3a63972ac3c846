//! UCL lexical scanner
//!
//! This module turns a byte stream into classified tokens. The scanner is a
//! resumable character-class state machine: it reads fixed-size chunks from the
//! underlying reader and keeps all partial state (current token bytes, quoting,
//! comment and heredoc progress, open scopes) between calls, so a token may span
//! any number of reads.

use crate::error::{LexError, UclError};
use smallvec::SmallVec;
use std::io::{ErrorKind, Read};

/// Size of the internal read buffer
pub const READ_BUFFER_SIZE: usize = 4096;

/// Bitfield flags for byte classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterFlags(u8);

impl CharacterFlags {
    /// Horizontal and vertical whitespace, including control bytes
    pub const WHITESPACE: Self = Self(1 << 0);
    /// ASCII letters and digits (heredoc tags, unquoted output)
    pub const ALNUM: Self = Self(1 << 1);
    /// Scope delimiters `{ } [ ]`
    pub const SCOPE: Self = Self(1 << 2);
    /// Key/value separators `=` and `:`
    pub const SEPARATOR: Self = Self(1 << 3);
    /// Statement terminators `;` and `,`
    pub const TERMINATOR: Self = Self(1 << 4);

    /// Creates empty flags
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns the union of two flag sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Checks if any of the given flags are set
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

/// Byte lookup table for O(1) classification
#[derive(Debug, Clone)]
pub struct CharacterTable([CharacterFlags; 256]);

impl CharacterTable {
    /// Creates the table at compile time
    pub const fn new() -> Self {
        let mut table = [CharacterFlags::empty(); 256];
        let mut i = 0;

        while i < 256 {
            let ch = i as u8;
            let mut flags = CharacterFlags::empty();

            if ch <= b' ' {
                flags = flags.union(CharacterFlags::WHITESPACE);
            }
            if ch.is_ascii_alphanumeric() {
                flags = flags.union(CharacterFlags::ALNUM);
            }
            match ch {
                b'{' | b'}' | b'[' | b']' => flags = flags.union(CharacterFlags::SCOPE),
                b'=' | b':' => flags = flags.union(CharacterFlags::SEPARATOR),
                b';' | b',' => flags = flags.union(CharacterFlags::TERMINATOR),
                _ => {}
            }

            table[i] = flags;
            i += 1;
        }

        Self(table)
    }

    /// Tests if a byte has any of the given flags
    #[inline(always)]
    pub const fn test(&self, ch: u8, flags: CharacterFlags) -> bool {
        self.0[ch as usize].intersects(flags)
    }

    #[inline(always)]
    pub const fn is_whitespace(&self, ch: u8) -> bool {
        self.test(ch, CharacterFlags::WHITESPACE)
    }

    #[inline(always)]
    pub const fn is_alnum(&self, ch: u8) -> bool {
        self.test(ch, CharacterFlags::ALNUM)
    }
}

impl Default for CharacterTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Global character table instance
pub static CHARACTER_TABLE: CharacterTable = CharacterTable::new();

/// Token classes produced by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Unquoted bareword
    Tag,
    /// `"..."` string, already unescaped
    DoubleQuoted,
    /// `'...'` string, already unescaped
    SingleQuoted,
    /// Bare `/regex/` or `/path` token
    SlashLiteral,
    Semicolon,
    Comma,
    Colon,
    Equal,
    BraceOpen,
    BraceClose,
    BracketOpen,
    BracketClose,
    /// Heredoc body (`<<TAG ... TAG`)
    MultilineString,
    /// `# ...` comment
    HashComment,
    /// `/* ... */` comment
    BlockComment,
}

impl TokenKind {
    /// Returns a string representation of the token kind for error messages
    pub fn type_name(self) -> &'static str {
        match self {
            TokenKind::Tag => "bareword",
            TokenKind::DoubleQuoted => "double-quoted string",
            TokenKind::SingleQuoted => "single-quoted string",
            TokenKind::SlashLiteral => "slash literal",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Equal => "'='",
            TokenKind::BraceOpen => "'{'",
            TokenKind::BraceClose => "'}'",
            TokenKind::BracketOpen => "'['",
            TokenKind::BracketClose => "']'",
            TokenKind::MultilineString => "multi-line string",
            TokenKind::HashComment => "comment",
            TokenKind::BlockComment => "block comment",
        }
    }

    /// Comments never reach the document tree
    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::HashComment | TokenKind::BlockComment)
    }

    /// Tokens that may act as a key or as a scalar value
    pub fn is_key(self) -> bool {
        matches!(
            self,
            TokenKind::Tag
                | TokenKind::DoubleQuoted
                | TokenKind::SingleQuoted
                | TokenKind::SlashLiteral
        )
    }
}

/// A classified lexical unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw bytes, already unescaped for quoted forms
    pub value: Vec<u8>,
    /// Line on which the token was completed
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<Vec<u8>>, line: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
        }
    }

    /// Borrows the token text
    pub fn as_str(&self) -> Result<&str, LexError> {
        std::str::from_utf8(&self.value).map_err(|_| LexError::InvalidUtf8 { line: self.line })
    }

    /// Converts the token into owned text
    pub fn into_string(self) -> Result<String, LexError> {
        let line = self.line;
        String::from_utf8(self.value).map_err(|_| LexError::InvalidUtf8 { line })
    }
}

/// Kind of an open delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `{ ... }`
    Brace,
    /// `[ ... ]`
    Bracket,
}

impl Scope {
    fn closed_by(byte: u8) -> Self {
        if byte == b'}' {
            Scope::Brace
        } else {
            Scope::Bracket
        }
    }
}

/// Stack of currently open delimiters
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    scopes: SmallVec<[Scope; 16]>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Pops the innermost scope if it is of the given kind
    pub fn pop(&mut self, scope: Scope) -> bool {
        if self.current() == Some(scope) {
            self.scopes.pop();
            true
        } else {
            false
        }
    }

    /// Returns the innermost open scope
    pub fn current(&self) -> Option<Scope> {
        self.scopes.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Whitespace,
    Tag,
    Quote,
    VQuote,
    Slash,
    HashComment,
    BlockComment,
    BlockCommentClosing,
    MaybeMultiline,
    MultilinePrep,
    MultilineHeaderOk,
    Multiline,
}

/// Whether the byte was consumed or must be dispatched again in the new state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Consumed,
    Reprocess,
}

/// Streaming UCL scanner over any reader
pub struct Scanner<R> {
    reader: R,
    buffer: Box<[u8]>,
    filled: usize,
    cursor: usize,
    scopes: ScopeStack,
    /// Bytes of the token being accumulated, reused across tokens
    current: Vec<u8>,
    state: State,
    /// Set until the statement's first `=`/`:` has been seen
    skip_sep: bool,
    /// Previous byte was a backslash inside a quote or slash literal
    escape_pending: bool,
    /// A `#` comment interrupted a statement, so its line end terminates it
    comment_ends_statement: bool,
    heredoc_tag: Vec<u8>,
    heredoc_line: Vec<u8>,
    last_kind: Option<TokenKind>,
    line: usize,
    exhausted: bool,
    trace: bool,
}

impl<R: Read> Scanner<R> {
    /// Creates a new scanner over the given reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            filled: 0,
            cursor: 0,
            scopes: ScopeStack::new(),
            current: Vec::with_capacity(1024),
            state: State::Whitespace,
            skip_sep: true,
            escape_pending: false,
            comment_ends_statement: false,
            heredoc_tag: Vec::new(),
            heredoc_line: Vec::new(),
            last_kind: None,
            line: 1,
            exhausted: false,
            trace: false,
        }
    }

    /// Enables per-token diagnostic tracing
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Current 1-based input line
    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of currently open scopes
    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Produces the next batch of tokens.
    ///
    /// Returns as soon as at least one token is complete; several tokens are
    /// returned together when they complete on the same byte (a trailing
    /// bareword and the `}` that ends it, for instance). `Ok(None)` signals the
    /// end of input with every scope closed.
    pub fn next_tokens(&mut self) -> Result<Option<Vec<Token>>, UclError> {
        let mut tokens = Vec::new();

        loop {
            if self.cursor >= self.filled && !self.fill()? {
                if !self.exhausted {
                    self.exhausted = true;
                    self.finish(&mut tokens)?;
                    if !tokens.is_empty() {
                        return Ok(Some(tokens));
                    }
                }
                if !self.scopes.is_empty() {
                    return Err(LexError::UnexpectedEndOfInput { line: self.line }.into());
                }
                return Ok(None);
            }

            let c = self.buffer[self.cursor];
            self.cursor += 1;
            if c == b'\n' {
                self.line += 1;
            }

            while self.step(c, &mut tokens)? == Step::Reprocess {}

            if !tokens.is_empty() {
                return Ok(Some(tokens));
            }
        }
    }

    /// Refills the read buffer once it has been fully consumed
    fn fill(&mut self) -> Result<bool, UclError> {
        if self.exhausted {
            return Ok(false);
        }
        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.filled = n;
                    self.cursor = 0;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn step(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<Step, LexError> {
        match self.state {
            State::Whitespace => self.scan_whitespace(c, tokens),
            State::Tag => self.scan_tag(c, tokens),
            State::Quote | State::VQuote => self.scan_quote(c, tokens),
            State::Slash => self.scan_slash(c, tokens),
            State::HashComment => {
                if c == b'\n' {
                    self.emit_current(tokens, TokenKind::HashComment);
                    if self.comment_ends_statement {
                        self.emit(tokens, TokenKind::Semicolon, vec![b';']);
                    }
                    self.state = State::Whitespace;
                } else {
                    self.current.push(c);
                }
                Ok(Step::Consumed)
            }
            State::BlockComment => {
                self.current.push(c);
                if c == b'*' {
                    self.state = State::BlockCommentClosing;
                }
                Ok(Step::Consumed)
            }
            State::BlockCommentClosing => {
                self.current.push(c);
                match c {
                    b'/' => {
                        self.emit_current(tokens, TokenKind::BlockComment);
                        self.state = State::Whitespace;
                    }
                    b'*' => {}
                    _ => self.state = State::BlockComment,
                }
                Ok(Step::Consumed)
            }
            State::MaybeMultiline => self.scan_maybe_multiline(c, tokens),
            State::MultilinePrep => {
                if CHARACTER_TABLE.is_alnum(c) {
                    self.heredoc_tag.push(c);
                } else if c == b'\n' {
                    self.begin_heredoc_body();
                } else {
                    // anything after the tag on the opener line is ignored
                    self.state = State::MultilineHeaderOk;
                }
                Ok(Step::Consumed)
            }
            State::MultilineHeaderOk => {
                if c == b'\n' {
                    self.begin_heredoc_body();
                }
                Ok(Step::Consumed)
            }
            State::Multiline => self.scan_heredoc(c, tokens),
        }
    }

    fn scan_whitespace(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<Step, LexError> {
        if CHARACTER_TABLE.is_whitespace(c) {
            return Ok(Step::Consumed);
        }

        match c {
            b'{' => {
                self.scopes.push(Scope::Brace);
                self.emit(tokens, TokenKind::BraceOpen, vec![c]);
            }
            b'[' => {
                self.scopes.push(Scope::Bracket);
                self.emit(tokens, TokenKind::BracketOpen, vec![c]);
            }
            b'}' | b']' => self.close_scope(c, tokens)?,
            b'/' => {
                self.current.clear();
                self.current.push(c);
                self.escape_pending = false;
                self.state = State::Slash;
            }
            b'"' => self.begin_quote(State::Quote),
            b'\'' => self.begin_quote(State::VQuote),
            b'#' => {
                self.current.clear();
                self.comment_ends_statement = false;
                self.state = State::HashComment;
            }
            b'=' | b':' => {
                if !matches!(
                    self.last_kind,
                    Some(TokenKind::DoubleQuoted | TokenKind::SingleQuoted)
                ) {
                    return Err(LexError::UnexpectedSeparator {
                        separator: c as char,
                        line: self.line,
                    });
                }
                self.emit(tokens, separator_kind(c), vec![c]);
                self.begin_tag();
                self.skip_sep = false;
            }
            b',' => {
                if self.scopes.current() != Some(Scope::Bracket) {
                    return Err(LexError::MisplacedComma { line: self.line });
                }
                self.emit(tokens, TokenKind::Comma, vec![c]);
            }
            b';' => self.emit(tokens, TokenKind::Semicolon, vec![c]),
            _ => {
                self.begin_tag();
                return Ok(Step::Reprocess);
            }
        }
        Ok(Step::Consumed)
    }

    fn scan_tag(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<Step, LexError> {
        match c {
            b'\n' => {
                // a bare line break terminates the statement
                self.flush_tag(tokens);
                self.emit(tokens, TokenKind::Semicolon, vec![b';']);
                self.state = State::Whitespace;
            }
            b';' => {
                self.flush_tag(tokens);
                self.emit(tokens, TokenKind::Semicolon, vec![c]);
                self.state = State::Whitespace;
            }
            b',' => {
                if self.scopes.is_empty() {
                    self.current.push(c);
                } else {
                    self.flush_tag(tokens);
                    self.emit(tokens, TokenKind::Comma, vec![c]);
                    self.state = State::Whitespace;
                }
            }
            b'{' | b'[' => {
                // `outer inner {` names a chain of nested keys
                self.flush_words(tokens);
                if c == b'{' {
                    self.scopes.push(Scope::Brace);
                    self.emit(tokens, TokenKind::BraceOpen, vec![c]);
                } else {
                    self.scopes.push(Scope::Bracket);
                    self.emit(tokens, TokenKind::BracketOpen, vec![c]);
                }
                self.state = State::Whitespace;
            }
            b'}' | b']' => self.close_scope(c, tokens)?,
            b'"' => {
                self.flush_tag(tokens);
                self.begin_quote(State::Quote);
            }
            b'\'' => {
                self.flush_tag(tokens);
                self.begin_quote(State::VQuote);
            }
            b'\\' => {
                return Err(LexError::UnexpectedCharacter {
                    character: '\\',
                    line: self.line,
                });
            }
            b'#' if self
                .current
                .last()
                .is_none_or(|&b| CHARACTER_TABLE.is_whitespace(b)) =>
            {
                self.flush_tag(tokens);
                self.comment_ends_statement = true;
                self.state = State::HashComment;
            }
            b'=' | b':' => {
                if self.skip_sep {
                    // only the first separator of a statement splits key and value
                    self.flush_tag(tokens);
                    self.emit(tokens, separator_kind(c), vec![c]);
                    self.skip_sep = false;
                } else {
                    self.current.push(c);
                }
            }
            b'/' if self.current.is_empty() => {
                self.current.push(c);
                self.escape_pending = false;
                self.state = State::Slash;
            }
            b'<' => {
                self.current.push(c);
                if self.current.ends_with(b"<<") {
                    self.state = State::MaybeMultiline;
                }
            }
            _ if CHARACTER_TABLE.is_whitespace(c) => {
                if self.current.is_empty() {
                    // leading whitespace
                } else if self.skip_sep {
                    self.flush_tag(tokens);
                } else {
                    self.current.push(c);
                }
            }
            _ => self.current.push(c),
        }
        Ok(Step::Consumed)
    }

    fn scan_maybe_multiline(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<Step, LexError> {
        if CHARACTER_TABLE.is_alnum(c) {
            let prefix = self.current.len() - 2;
            let blank = self.current[..prefix]
                .iter()
                .all(|&b| CHARACTER_TABLE.is_whitespace(b));
            if blank || self.skip_sep {
                if !blank {
                    // key glued to the opener, as in `key<<EOD`
                    self.current.truncate(prefix);
                    self.flush_tag(tokens);
                }
                self.current.clear();
                self.heredoc_tag.clear();
                self.heredoc_tag.push(c);
                self.state = State::MultilinePrep;
                return Ok(Step::Consumed);
            }
        }
        self.state = State::Tag;
        Ok(Step::Reprocess)
    }

    fn scan_heredoc(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<Step, LexError> {
        match c {
            b'\n' => {
                if self.at_heredoc_terminator() {
                    self.finish_heredoc(tokens);
                } else {
                    self.current.extend_from_slice(&self.heredoc_line);
                    self.current.push(b'\n');
                    self.heredoc_line.clear();
                }
            }
            b';' if self.heredoc_line == self.heredoc_tag => self.finish_heredoc(tokens),
            b',' if self.heredoc_line == self.heredoc_tag
                && self.scopes.current() == Some(Scope::Bracket) =>
            {
                self.finish_heredoc(tokens)
            }
            _ => self.heredoc_line.push(c),
        }
        Ok(Step::Consumed)
    }

    fn scan_quote(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<Step, LexError> {
        if self.escape_pending {
            // escaped byte, including an escaped line break
            self.current.push(c);
            self.escape_pending = false;
            return Ok(Step::Consumed);
        }

        let (quote, kind) = if self.state == State::Quote {
            (b'"', TokenKind::DoubleQuoted)
        } else {
            (b'\'', TokenKind::SingleQuoted)
        };

        if c == b'\\' {
            self.current.push(c);
            self.escape_pending = true;
        } else if c == quote {
            let raw = std::str::from_utf8(&self.current)
                .map_err(|_| LexError::InvalidUtf8 { line: self.line })?;
            let value = unescape(raw, quote as char).map_err(|e| e.at_line(self.line))?;
            self.current.clear();
            self.emit(tokens, kind, value.into_bytes());
            self.begin_tag();
        } else {
            self.current.push(c);
        }
        Ok(Step::Consumed)
    }

    fn scan_slash(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<Step, LexError> {
        if self.escape_pending {
            self.current.push(c);
            self.escape_pending = false;
            return Ok(Step::Consumed);
        }

        if self.current == b"/" && c == b'*' {
            self.current.push(c);
            self.state = State::BlockComment;
            return Ok(Step::Consumed);
        }

        match c {
            b'\\' => {
                self.current.push(c);
                self.escape_pending = true;
            }
            b'/' => {
                self.current.push(c);
                self.emit_current(tokens, TokenKind::SlashLiteral);
                self.begin_tag();
            }
            b'\n' => {
                self.emit_current(tokens, TokenKind::SlashLiteral);
                self.emit(tokens, TokenKind::Semicolon, vec![b';']);
                self.state = State::Whitespace;
            }
            b';' => {
                // soft terminator: the `;` itself is scanned as part of the statement
                self.emit_current(tokens, TokenKind::SlashLiteral);
                self.begin_tag();
                return Ok(Step::Reprocess);
            }
            _ if CHARACTER_TABLE.is_whitespace(c) => {
                self.emit_current(tokens, TokenKind::SlashLiteral);
                self.begin_tag();
            }
            _ => self.current.push(c),
        }
        Ok(Step::Consumed)
    }

    /// Flushes whatever is pending when the reader is exhausted
    fn finish(&mut self, tokens: &mut Vec<Token>) -> Result<(), LexError> {
        match self.state {
            State::Whitespace => {}
            State::Tag | State::MaybeMultiline => self.flush_tag(tokens),
            State::Slash => self.emit_current(tokens, TokenKind::SlashLiteral),
            State::HashComment => self.emit_current(tokens, TokenKind::HashComment),
            State::Multiline if self.at_heredoc_terminator() => self.finish_heredoc(tokens),
            State::Quote
            | State::VQuote
            | State::BlockComment
            | State::BlockCommentClosing
            | State::MultilinePrep
            | State::MultilineHeaderOk
            | State::Multiline => {
                return Err(LexError::UnexpectedEndOfInput { line: self.line });
            }
        }
        self.state = State::Whitespace;
        Ok(())
    }

    fn close_scope(&mut self, c: u8, tokens: &mut Vec<Token>) -> Result<(), LexError> {
        let scope = Scope::closed_by(c);
        if self.scopes.current() != Some(scope) {
            return Err(LexError::MisplacedCloser {
                closer: c as char,
                line: self.line,
            });
        }
        self.flush_tag(tokens);
        self.scopes.pop(scope);
        let kind = match scope {
            Scope::Brace => TokenKind::BraceClose,
            Scope::Bracket => TokenKind::BracketClose,
        };
        self.emit(tokens, kind, vec![c]);
        self.state = State::Whitespace;
        Ok(())
    }

    fn begin_tag(&mut self) {
        self.current.clear();
        self.state = State::Tag;
        self.skip_sep = true;
    }

    fn begin_quote(&mut self, state: State) {
        self.current.clear();
        self.escape_pending = false;
        self.state = state;
    }

    fn begin_heredoc_body(&mut self) {
        self.current.clear();
        self.heredoc_line.clear();
        self.state = State::Multiline;
    }

    fn at_heredoc_terminator(&self) -> bool {
        let line = self
            .heredoc_line
            .strip_suffix(b"\r")
            .unwrap_or(self.heredoc_line.as_slice());
        line == self.heredoc_tag.as_slice()
    }

    fn finish_heredoc(&mut self, tokens: &mut Vec<Token>) {
        // the line break before the terminator line is not part of the body
        if self.current.last() == Some(&b'\n') {
            self.current.pop();
            if self.current.last() == Some(&b'\r') {
                self.current.pop();
            }
        }
        let body = self.current.clone();
        self.current.clear();
        self.heredoc_line.clear();
        self.emit(tokens, TokenKind::MultilineString, body);
        self.state = State::Whitespace;
    }

    /// Emits the pending bareword, trimmed of trailing whitespace
    fn flush_tag(&mut self, tokens: &mut Vec<Token>) {
        let end = self
            .current
            .iter()
            .rposition(|&b| !CHARACTER_TABLE.is_whitespace(b))
            .map_or(0, |i| i + 1);
        if end > 0 {
            let value = self.current[..end].to_vec();
            self.emit(tokens, TokenKind::Tag, value);
        }
        self.current.clear();
    }

    /// Emits the pending bytes split on whitespace, one bareword per word
    fn flush_words(&mut self, tokens: &mut Vec<Token>) {
        let words: Vec<Vec<u8>> = self
            .current
            .split(|&b| CHARACTER_TABLE.is_whitespace(b))
            .filter(|word| !word.is_empty())
            .map(<[u8]>::to_vec)
            .collect();
        for word in words {
            self.emit(tokens, TokenKind::Tag, word);
        }
        self.current.clear();
    }

    fn emit_current(&mut self, tokens: &mut Vec<Token>, kind: TokenKind) {
        let value = self.current.clone();
        self.current.clear();
        self.emit(tokens, kind, value);
    }

    fn emit(&mut self, tokens: &mut Vec<Token>, kind: TokenKind, value: Vec<u8>) {
        if self.trace {
            tracing::trace!(
                kind = kind.type_name(),
                line = self.line,
                len = value.len(),
                "scanned token"
            );
        }
        if !kind.is_comment() {
            self.last_kind = Some(kind);
        }
        tokens.push(Token::new(kind, value, self.line));
    }
}

fn separator_kind(c: u8) -> TokenKind {
    if c == b'=' {
        TokenKind::Equal
    } else {
        TokenKind::Colon
    }
}

/// Unescapes the body of a quoted string.
///
/// Supports `\a \b \f \n \r \t \v \\ \' \"`, `\xHH`, `\uHHHH`, `\UHHHHHHHH`,
/// three-digit octal escapes and backslash line continuations. `quote` is the
/// delimiter the body was scanned with; it may not appear unescaped.
pub fn unescape(input: &str, quote: char) -> Result<String, LexError> {
    if !input.contains('\\') && !input.contains(quote) {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == quote {
            return Err(invalid_escape(ch.to_string()));
        }
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        match chars.next() {
            Some('a') => result.push('\u{0007}'),
            Some('b') => result.push('\u{0008}'),
            Some('f') => result.push('\u{000C}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('v') => result.push('\u{000B}'),
            Some('\\') => result.push('\\'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some('\n') => {}
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.by_ref().take(width).collect();
                if digits.len() != width || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(invalid_escape(format!("{}{}", kind, digits)));
                }
                let code = u32::from_str_radix(&digits, 16)
                    .map_err(|_| invalid_escape(format!("{}{}", kind, digits)))?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| invalid_escape(format!("{}{}", kind, digits)))?;
                result.push(decoded);
            }
            Some(first @ '0'..='7') => {
                let mut digits = String::from(first);
                for _ in 0..2 {
                    match chars.next() {
                        Some(c @ '0'..='7') => digits.push(c),
                        Some(c) => {
                            digits.push(c);
                            return Err(invalid_escape(digits));
                        }
                        None => return Err(invalid_escape(digits)),
                    }
                }
                let code = u32::from_str_radix(&digits, 8)
                    .map_err(|_| invalid_escape(digits.clone()))?;
                if code > 0xFF {
                    return Err(invalid_escape(digits));
                }
                result.push(char::from(code as u8));
            }
            Some(other) => return Err(invalid_escape(other.to_string())),
            None => return Err(invalid_escape(String::new())),
        }
    }

    Ok(result)
}

fn invalid_escape(sequence: String) -> LexError {
    LexError::InvalidEscape { sequence, line: 0 }
}
