//! Lexer
//!
//! Streaming tokenizer for shell source text. The lexer exposes
//! `next_token()` and a one-token look-ahead `peek_token()`; the parser
//! drives it directly rather than tokenizing up front.
//!
//! Word tokens carry the raw source fragment including all quoting syntax;
//! the parser re-scans that fragment to build the word tree. The lexer is
//! lenient: an unterminated quote or substitution is closed by end of input
//! instead of raising an error.

use crate::ast::types::{Position, Range};
use std::collections::HashSet;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Word,
    Operator,
    Newline,
    /// A bare digit immediately followed by `<` or `>`.
    IoNumber,
    Eof,
}

/// A token with its raw value and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub start: Position,
    pub end: Position,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, start: Position, end: Position) -> Self {
        Self { token_type, value: value.into(), start, end }
    }

    pub fn range(&self) -> Range {
        Range { start: self.start, end: self.end }
    }

    /// True for an Operator token with exactly this value.
    pub fn is_operator(&self, op: &str) -> bool {
        self.token_type == TokenType::Operator && self.value == op
    }

    /// True for a Word token with exactly this value.
    pub fn is_word(&self, word: &str) -> bool {
        self.token_type == TokenType::Word && self.value == word
    }
}

/// Multi-character operators, longest first so prefix operators never
/// shadow their extensions.
const OPERATORS: &[&str] = &[
    "&&", "||", ";;", "<<-", "<<", ">>", "<&", ">&", "<>", ">|",
    "|", "&", ";", "<", ">", "(", ")", "{", "}",
];

lazy_static::lazy_static! {
    /// Reserved words. The lexer does not distinguish them from ordinary
    /// words; the parser recognizes them in command position.
    static ref RESERVED_WORDS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for w in [
            "if", "then", "else", "elif", "fi", "do", "done", "case",
            "esac", "while", "until", "for", "in", "!", "{", "}",
        ] {
            s.insert(w);
        }
        s
    };
}

/// Check whether a word is in the reserved-word set.
pub fn is_reserved_word(s: &str) -> bool {
    RESERVED_WORDS.contains(s)
}

/// Characters that terminate an unquoted word.
fn is_metacharacter(c: char) -> bool {
    matches!(c, '|' | '&' | ';' | '<' | '>' | '(' | ')' | ' ' | '\t' | '\n')
}

/// `$@`, `$*`, `$#`, `$?`, `$-`, `$$`, `$!` and single-digit positionals.
fn is_special_parameter(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '-' | '$' | '!' | '0'..='9')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Streaming lexer over a UTF-8 source string.
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    peeked: Option<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            peeked: None,
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> &Token {
        if self.peeked.is_none() {
            let token = self.read_token();
            self.peeked = Some(token);
        }
        self.peeked.as_ref().unwrap()
    }

    /// Consume and return the next token. After end of input this keeps
    /// returning Eof tokens.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.peeked.take() {
            return token;
        }
        self.read_token()
    }

    fn position(&self) -> Position {
        Position { offset: self.pos, line: self.line, column: self.column }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn skip_blanks(&mut self) {
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' => {
                    self.advance();
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    // Line continuation
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn read_token(&mut self) -> Token {
        loop {
            self.skip_blanks();

            let start = self.position();
            let c = match self.current() {
                Some(c) => c,
                None => return Token::new(TokenType::Eof, "", start, start),
            };

            // Comment through end of line; the newline itself stays.
            if c == '#' {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            if c == '\n' {
                self.advance();
                return Token::new(TokenType::Newline, "\n", start, self.position());
            }

            // A single digit glued to a redirect operator is an io number.
            if c.is_ascii_digit() && matches!(self.peek_at(1), Some('<') | Some('>')) {
                self.advance();
                return Token::new(TokenType::IoNumber, c.to_string(), start, self.position());
            }

            for op in OPERATORS {
                if self.matches_at(op) {
                    for _ in 0..op.chars().count() {
                        self.advance();
                    }
                    return Token::new(TokenType::Operator, *op, start, self.position());
                }
            }

            let value = self.read_word();
            return Token::new(TokenType::Word, value, start, self.position());
        }
    }

    fn matches_at(&self, s: &str) -> bool {
        for (i, c) in s.chars().enumerate() {
            if self.peek_at(i) != Some(c) {
                return false;
            }
        }
        true
    }

    /// Read a word token: everything up to the next unquoted metacharacter,
    /// keeping quote characters and expansion spans verbatim.
    fn read_word(&mut self) -> String {
        let mut out = String::new();

        while let Some(c) = self.current() {
            if is_metacharacter(c) {
                break;
            }
            match c {
                '\'' => self.read_single_quoted_raw(&mut out),
                '"' => self.read_double_quoted_raw(&mut out),
                '\\' => {
                    out.push('\\');
                    self.advance();
                    if let Some(next) = self.advance() {
                        out.push(next);
                    }
                }
                '$' => self.read_dollar_raw(&mut out),
                '`' => self.read_backquoted_raw(&mut out),
                _ => {
                    out.push(c);
                    self.advance();
                }
            }
        }

        out
    }

    /// `'...'` verbatim, quotes included. End of input closes the quote.
    fn read_single_quoted_raw(&mut self, out: &mut String) {
        out.push('\'');
        self.advance();
        while let Some(c) = self.advance() {
            out.push(c);
            if c == '\'' {
                return;
            }
        }
    }

    /// `"..."` with backslash escapes, quotes included.
    fn read_double_quoted_raw(&mut self, out: &mut String) {
        out.push('"');
        self.advance();
        while let Some(c) = self.current() {
            if c == '\\' {
                out.push('\\');
                self.advance();
                if let Some(next) = self.advance() {
                    out.push(next);
                }
                continue;
            }
            out.push(c);
            self.advance();
            if c == '"' {
                return;
            }
        }
    }

    /// Backquoted command substitution, backslash escaping one character.
    fn read_backquoted_raw(&mut self, out: &mut String) {
        out.push('`');
        self.advance();
        while let Some(c) = self.current() {
            if c == '\\' {
                out.push('\\');
                self.advance();
                if let Some(next) = self.advance() {
                    out.push(next);
                }
                continue;
            }
            out.push(c);
            self.advance();
            if c == '`' {
                return;
            }
        }
    }

    /// `$`-introduced spans: arithmetic, command substitution, parameter
    /// braces, special parameters, and names.
    fn read_dollar_raw(&mut self, out: &mut String) {
        self.advance(); // $

        match (self.current(), self.peek_at(1)) {
            (Some('('), Some('(')) => {
                out.push_str("$((");
                self.advance();
                self.advance();
                // Balance parentheses to depth zero; both closers included.
                let mut depth = 2;
                while let Some(c) = self.advance() {
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                out.push(')');
                                return;
                            }
                        }
                        _ => {}
                    }
                    out.push(c);
                }
            }
            (Some('('), _) => {
                out.push_str("$(");
                self.advance();
                let mut depth = 1;
                while let Some(c) = self.current() {
                    match c {
                        '\'' => {
                            self.read_single_quoted_raw(out);
                            continue;
                        }
                        '"' => {
                            self.read_double_quoted_raw(out);
                            continue;
                        }
                        '`' => {
                            self.read_backquoted_raw(out);
                            continue;
                        }
                        '\\' => {
                            out.push('\\');
                            self.advance();
                            if let Some(next) = self.advance() {
                                out.push(next);
                            }
                            continue;
                        }
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                out.push(')');
                                self.advance();
                                return;
                            }
                        }
                        _ => {}
                    }
                    out.push(c);
                    self.advance();
                }
            }
            (Some('{'), _) => {
                out.push_str("${");
                self.advance();
                let mut depth = 1;
                while let Some(c) = self.current() {
                    match c {
                        '\'' => {
                            self.read_single_quoted_raw(out);
                            continue;
                        }
                        '"' => {
                            self.read_double_quoted_raw(out);
                            continue;
                        }
                        '\\' => {
                            out.push('\\');
                            self.advance();
                            if let Some(next) = self.advance() {
                                out.push(next);
                            }
                            continue;
                        }
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                out.push('}');
                                self.advance();
                                return;
                            }
                        }
                        _ => {}
                    }
                    out.push(c);
                    self.advance();
                }
            }
            (Some(c), _) if is_special_parameter(c) => {
                out.push('$');
                out.push(c);
                self.advance();
            }
            (Some(c), _) if is_name_char(c) => {
                out.push('$');
                while let Some(c) = self.current() {
                    if !is_name_char(c) {
                        break;
                    }
                    out.push(c);
                    self.advance();
                }
            }
            _ => out.push('$'),
        }
    }
}
