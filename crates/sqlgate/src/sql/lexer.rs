//! Tokenizer shared by the safety screen and the reference extractor.
//!
//! Comments never reach the token stream. String literals and quoted
//! identifiers are single tokens, so keywords, semicolons and comment markers
//! inside them are inert.
//!
//! Where comments and strings begin differs between servers, so the lexer is
//! driven by a [`LexMode`] of dialect switches. The safety screen lexes every
//! combination and only accepts input that is safe under all of them.

/// Dialect switches that change where comments, string literals and quoted
/// identifiers start and end. All switches off is plain ANSI SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexMode {
    /// Backslash escapes the next character inside quoted strings (MySQL).
    pub backslash_escapes: bool,
    /// `#` starts a line comment (MySQL).
    pub hash_comments: bool,
    /// `--` starts a comment only when whitespace or a control character
    /// follows it, so `1--1` is arithmetic (MySQL).
    pub spaced_dash_comments: bool,
    /// `/*! ... */` bodies are executed instead of ignored (MySQL).
    pub executable_comments: bool,
    /// `$tag$ ... $tag$` is a string literal (PostgreSQL).
    pub dollar_quotes: bool,
    /// `/* /* */ */` nests (PostgreSQL).
    pub nested_comments: bool,
    pub brackets: Brackets,
}

/// How `[` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Brackets {
    /// `[` is an operator (MySQL, PostgreSQL).
    #[default]
    Operator,
    /// `[name]` is an identifier closed by the first `]` (SQLite).
    Identifier,
    /// `[name]` is an identifier in which `]]` is an escaped `]` (SQL Server).
    EscapedIdentifier,
}

impl LexMode {
    pub const STANDARD: Self = Self {
        backslash_escapes: false,
        hash_comments: false,
        spaced_dash_comments: false,
        executable_comments: false,
        dollar_quotes: false,
        nested_comments: false,
        brackets: Brackets::Operator,
    };

    /// How SQLite, the engine `query` runs against, lexes.
    pub const SQLITE: Self = Self {
        brackets: Brackets::Identifier,
        ..Self::STANDARD
    };

    pub const MYSQL: Self = Self {
        backslash_escapes: true,
        hash_comments: true,
        spaced_dash_comments: true,
        executable_comments: true,
        ..Self::STANDARD
    };

    pub const POSTGRES: Self = Self {
        dollar_quotes: true,
        nested_comments: true,
        ..Self::STANDARD
    };

    /// Every combination of switches, starting with [`LexMode::STANDARD`].
    pub fn readings() -> impl Iterator<Item = Self> {
        (0u8..64).flat_map(|bits| {
            [
                Brackets::Operator,
                Brackets::Identifier,
                Brackets::EscapedIdentifier,
            ]
            .map(move |brackets| Self {
                backslash_escapes: bits & 1 != 0,
                hash_comments: bits & 2 != 0,
                spaced_dash_comments: bits & 4 != 0,
                executable_comments: bits & 8 != 0,
                dollar_quotes: bits & 16 != 0,
                nested_comments: bits & 32 != 0,
                brackets,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Unquoted identifier or keyword, original spelling.
    Word(String),
    /// Backtick- or bracket-quoted identifier with the quotes removed.
    QuotedIdent(String),
    /// Single- or double-quoted string literal with the quotes removed.
    Str(String),
    Number(String),
    /// Bind parameter or session variable: `?`, `$1`, `:name`, `@var`, `@@var`.
    Param(String),
    /// Structural punctuation: `(` `)` `,` `.` `;` `*`.
    Punct(char),
    Operator(String),
}

impl Token {
    #[must_use]
    pub fn is_punct(&self, expected: char) -> bool {
        matches!(self, Self::Punct(ch) if *ch == expected)
    }

    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Word(word) if word.eq_ignore_ascii_case(keyword))
    }

    #[must_use]
    pub fn is_operator(&self, expected: &str) -> bool {
        matches!(self, Self::Operator(op) if op == expected)
    }

    #[must_use]
    pub fn word(&self) -> Option<&str> {
        match self {
            Self::Word(word) => Some(word),
            _ => None,
        }
    }

    /// Identifier text for either an unquoted word or a backtick identifier.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Word(text) | Self::QuotedIdent(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Word(text)
            | Self::QuotedIdent(text)
            | Self::Str(text)
            | Self::Number(text)
            | Self::Param(text)
            | Self::Operator(text) => text.clone(),
            Self::Punct(ch) => ch.to_string(),
        }
    }
}

#[must_use]
pub fn tokenize(sql: &str, mode: LexMode) -> Vec<Token> {
    let mut lexer = Lexer {
        chars: sql.chars().collect(),
        pos: 0,
        mode,
        open_executable: 0,
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    mode: LexMode,
    /// Unclosed `/*!` comments whose `*/` must not lex as `*` `/`.
    open_executable: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) {
        while let Some(ch) = self.peek(0) {
            match ch {
                ch if ch.is_whitespace() => self.pos += 1,
                '-' if self.peek(1) == Some('-')
                    && (!self.mode.spaced_dash_comments || starts_line_comment(self.peek(2))) =>
                {
                    self.skip_line_comment();
                }
                '#' if self.mode.hash_comments => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => self.block_comment(),
                '*' if self.open_executable > 0 && self.peek(1) == Some('/') => {
                    self.open_executable -= 1;
                    self.pos += 2;
                }
                '\'' | '"' => {
                    let text = self.quoted(ch, true);
                    self.tokens.push(Token::Str(text));
                }
                '`' => {
                    let text = self.quoted('`', false);
                    self.tokens.push(Token::QuotedIdent(text));
                }
                '[' if self.mode.brackets != Brackets::Operator => {
                    let text = self.bracketed();
                    self.tokens.push(Token::QuotedIdent(text));
                }
                '(' | ')' | ',' | '.' | ';' | '*' => {
                    self.pos += 1;
                    self.tokens.push(Token::Punct(ch));
                }
                '?' => {
                    self.pos += 1;
                    self.tokens.push(Token::Param("?".to_string()));
                }
                '$' if self.peek(1).is_some_and(|next| next.is_ascii_digit()) => {
                    let start = self.pos;
                    self.pos += 1;
                    self.take_while(|next| next.is_ascii_digit());
                    self.tokens.push(Token::Param(self.slice(start)));
                }
                '$' if self.mode.dollar_quotes => self.dollar_quoted(),
                ':' if self.peek(1).is_some_and(is_word_start) => {
                    let start = self.pos;
                    self.pos += 1;
                    self.take_while(is_word_continue);
                    self.tokens.push(Token::Param(self.slice(start)));
                }
                '@' => self.variable(),
                ch if ch.is_ascii_digit() => {
                    let start = self.pos;
                    self.take_while(|next| next.is_alphanumeric() || next == '_' || next == '.');
                    self.tokens.push(Token::Number(self.slice(start)));
                }
                ch if is_word_start(ch) => {
                    let start = self.pos;
                    self.take_while(is_word_continue);
                    self.tokens.push(Token::Word(self.slice(start)));
                }
                _ => self.operator(),
            }
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&predicate) {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_line_comment(&mut self) {
        self.take_while(|ch| ch != '\n' && ch != '\r');
    }

    fn block_comment(&mut self) {
        if self.mode.executable_comments && self.peek(2) == Some('!') {
            self.pos += 3;
            self.take_while(|ch| ch.is_ascii_digit());
            self.open_executable += 1;
            return;
        }

        let mut depth = 1usize;
        self.pos += 2;
        while depth > 0 {
            match (self.peek(0), self.peek(1)) {
                (None, _) => return,
                (Some('*'), Some('/')) => {
                    depth -= 1;
                    self.pos += 2;
                }
                (Some('/'), Some('*')) if self.mode.nested_comments => {
                    depth += 1;
                    self.pos += 2;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// `$$ ... $$` or `$tag$ ... $tag$`. A lone `$` is an operator.
    fn dollar_quoted(&mut self) {
        let Some(tag) = self.dollar_tag() else {
            self.operator();
            return;
        };
        self.pos += tag.len();
        let start = self.pos;
        while self.pos < self.chars.len() {
            if self.chars[self.pos..].starts_with(&tag) {
                let text = self.slice(start);
                self.pos += tag.len();
                self.tokens.push(Token::Str(text));
                return;
            }
            self.pos += 1;
        }
        self.tokens.push(Token::Str(self.slice(start)));
    }

    fn dollar_tag(&self) -> Option<Vec<char>> {
        let mut end = self.pos + 1;
        loop {
            let ch = *self.chars.get(end)?;
            if ch == '$' {
                return Some(self.chars[self.pos..=end].to_vec());
            }
            let valid = if end == self.pos + 1 {
                is_word_start(ch)
            } else {
                ch.is_alphanumeric() || ch == '_'
            };
            if !valid {
                return None;
            }
            end += 1;
        }
    }

    fn quoted(&mut self, quote: char, allow_backslash: bool) -> String {
        let escapes = allow_backslash && self.mode.backslash_escapes;
        let mut text = String::new();
        self.pos += 1;
        while let Some(ch) = self.peek(0) {
            if escapes && ch == '\\' {
                if let Some(escaped) = self.peek(1) {
                    text.push(escaped);
                }
                self.pos += 2;
                continue;
            }
            if ch == quote {
                if self.peek(1) == Some(quote) {
                    text.push(quote);
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return text;
            }
            text.push(ch);
            self.pos += 1;
        }
        self.pos = self.chars.len();
        text
    }

    fn bracketed(&mut self) -> String {
        let doubled = self.mode.brackets == Brackets::EscapedIdentifier;
        let mut text = String::new();
        self.pos += 1;
        while let Some(ch) = self.peek(0) {
            if ch == ']' {
                if doubled && self.peek(1) == Some(']') {
                    text.push(']');
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return text;
            }
            text.push(ch);
            self.pos += 1;
        }
        text
    }

    fn variable(&mut self) {
        let start = self.pos;
        self.pos += 1;
        if self.peek(0) == Some('@') {
            self.pos += 1;
        }
        match self.peek(0) {
            Some(quote @ ('\'' | '"' | '`')) => {
                let prefix = self.slice(start);
                let name = self.quoted(quote, false);
                self.tokens.push(Token::Param(format!("{prefix}{name}")));
            }
            _ => {
                self.take_while(|ch| is_word_continue(ch) || ch == '.');
                self.tokens.push(Token::Param(self.slice(start)));
            }
        }
    }

    fn operator(&mut self) {
        const PAIRS: &[&str] = &[
            "::", "<=", ">=", "<>", "!=", "||", "&&", "<<", ">>", ":=", "->",
        ];
        let start = self.pos;
        let pair: String = self.chars[self.pos..].iter().take(2).collect();
        if PAIRS.contains(&pair.as_str()) {
            self.pos += 2;
            if pair == "->" && self.peek(0) == Some('>') {
                self.pos += 1;
            }
        } else {
            self.pos += 1;
        }
        self.tokens.push(Token::Operator(self.slice(start)));
    }
}

/// MySQL only treats `--` as a comment when whitespace, a control character
/// or the end of input follows it; `1--1` is arithmetic.
fn starts_line_comment(next: Option<char>) -> bool {
    next.is_none_or(|ch| ch.is_whitespace() || ch.is_control())
}

fn is_word_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_word_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}
