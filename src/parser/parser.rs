//! Parser
//!
//! Recursive descent with one-token look-ahead over the streaming lexer.
//! Produces a `Program` tree; word fragments are handed to the word
//! reconstructor, which parses substitution bodies eagerly.

use crate::ast::types::{
    AndOrItem, AndOrList, AndOrOp, Assignment, BraceGroup, CaseCommand, CaseItem, Command,
    CommandList, ForCommand, FunctionDef, IfCommand, IoRedirect, LoopCommand, Pipeline, Program,
    RedirectOp, SimpleCommand, Subshell, Word,
};
use crate::parser::lexer::{Lexer, Token, TokenType};
use crate::parser::types::{ParseException, MAX_INPUT_SIZE, MAX_PARSER_DEPTH};
use crate::parser::word_parser::parse_word;

/// Parse shell source text into a program.
pub fn parse(input: &str) -> Result<Program, ParseException> {
    if input.len() > MAX_INPUT_SIZE {
        return Err(ParseException::new(
            format!("input exceeds {} bytes", MAX_INPUT_SIZE),
            1,
            1,
        ));
    }
    Parser::new(input).parse_program()
}

/// Reserved words that terminate a compound list.
fn is_closer_word(s: &str) -> bool {
    matches!(s, "then" | "else" | "elif" | "fi" | "do" | "done" | "esac" | "in")
}

fn is_redirect_operator(s: &str) -> Option<RedirectOp> {
    match s {
        "<" => Some(RedirectOp::Less),
        ">" => Some(RedirectOp::Great),
        ">|" => Some(RedirectOp::Clobber),
        ">>" => Some(RedirectOp::DGreat),
        "<&" => Some(RedirectOp::LessAnd),
        ">&" => Some(RedirectOp::GreatAnd),
        "<>" => Some(RedirectOp::LessGreat),
        "<<" => Some(RedirectOp::DLess),
        "<<-" => Some(RedirectOp::DLessDash),
        _ => None,
    }
}

fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// `NAME=...` where NAME is a valid identifier.
fn assignment_parts(s: &str) -> Option<(&str, &str)> {
    let eq = s.find('=')?;
    let (name, rest) = s.split_at(eq);
    if is_valid_name(name) {
        Some((name, &rest[1..]))
    } else {
        None
    }
}

pub struct Parser {
    lexer: Lexer,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self { lexer: Lexer::new(input), depth: 0 }
    }

    fn peek(&mut self) -> &Token {
        self.lexer.peek_token()
    }

    fn next(&mut self) -> Token {
        self.lexer.next_token()
    }

    fn error_at(&mut self, message: impl Into<String>) -> ParseException {
        let token = self.peek();
        ParseException::new(message, token.start.line, token.start.column)
    }

    fn unexpected(&mut self, expected: &str) -> ParseException {
        let token = self.peek().clone();
        let got = match token.token_type {
            TokenType::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.value),
        };
        ParseException::expected(expected, &got, token.start.line, token.start.column)
    }

    fn skip_newlines(&mut self) {
        while self.peek().token_type == TokenType::Newline {
            self.next();
        }
    }

    fn expect_operator(&mut self, op: &str) -> Result<(), ParseException> {
        if self.peek().is_operator(op) {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", op)))
        }
    }

    fn expect_reserved(&mut self, word: &str) -> Result<(), ParseException> {
        if self.peek().is_word(word) {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    // =========================================================================
    // Program & lists
    // =========================================================================

    pub fn parse_program(&mut self) -> Result<Program, ParseException> {
        let mut commands = Vec::new();

        loop {
            while self.peek().token_type == TokenType::Newline || self.peek().is_operator(";") {
                self.next();
            }
            if self.peek().token_type == TokenType::Eof {
                break;
            }
            match self.parse_command_list()? {
                Some(list) => {
                    let separated = list.is_async
                        || matches!(
                            self.peek().token_type,
                            TokenType::Newline | TokenType::Eof
                        )
                        || self.peek().is_operator(";");
                    commands.push(list);
                    if !separated {
                        return Err(self.unexpected("';' or newline"));
                    }
                }
                None => return Err(self.unexpected("a command")),
            }
        }

        Ok(Program { commands })
    }

    /// AndOrList with an optional trailing `&`.
    fn parse_command_list(&mut self) -> Result<Option<CommandList>, ParseException> {
        let first = match self.parse_pipeline()? {
            Some(pipeline) => pipeline,
            None => return Ok(None),
        };

        let mut rest = Vec::new();
        loop {
            let op = if self.peek().is_operator("&&") {
                AndOrOp::And
            } else if self.peek().is_operator("||") {
                AndOrOp::Or
            } else {
                break;
            };
            let op_text = self.next().value;
            self.skip_newlines();
            let pipeline = self
                .parse_pipeline()?
                .ok_or_else(|| self.error_at(format!("expected a command after '{}'", op_text)))?;
            rest.push(AndOrItem { op, pipeline });
        }

        let is_async = if self.peek().is_operator("&") {
            self.next();
            true
        } else {
            false
        };

        Ok(Some(CommandList {
            list: AndOrList { first, rest },
            is_async,
        }))
    }

    fn parse_pipeline(&mut self) -> Result<Option<Pipeline>, ParseException> {
        let negation = if self.peek().is_word("!") {
            self.next();
            true
        } else {
            false
        };

        let first = match self.parse_command()? {
            Some(command) => command,
            None if negation => return Err(self.unexpected("a command after '!'")),
            None => return Ok(None),
        };

        let mut commands = vec![first];
        while self.peek().is_operator("|") {
            self.next();
            self.skip_newlines();
            let command = self
                .parse_command()?
                .ok_or_else(|| self.error_at("expected a command after '|'"))?;
            commands.push(command);
        }

        Ok(Some(Pipeline { negation, commands }))
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn parse_command(&mut self) -> Result<Option<Command>, ParseException> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(self.error_at("maximum nesting depth exceeded"));
        }
        let result = self.parse_command_inner();
        self.depth -= 1;
        result
    }

    fn parse_command_inner(&mut self) -> Result<Option<Command>, ParseException> {
        let token = self.peek().clone();
        match token.token_type {
            TokenType::Operator if token.value == "{" => {
                self.next();
                let body = self.parse_compound_list(&["}"])?;
                self.expect_operator("}")?;
                Ok(Some(Command::BraceGroup(BraceGroup { body })))
            }
            TokenType::Operator if token.value == "(" => {
                self.next();
                let body = self.parse_compound_list(&[")"])?;
                self.expect_operator(")")?;
                Ok(Some(Command::Subshell(Subshell { body })))
            }
            TokenType::Word if token.value == "if" => {
                self.next();
                let node = self.parse_if_chain()?;
                self.expect_reserved("fi")?;
                Ok(Some(Command::If(node)))
            }
            TokenType::Word if token.value == "for" => self.parse_for().map(Some),
            TokenType::Word if token.value == "while" => self.parse_loop(false).map(Some),
            TokenType::Word if token.value == "until" => self.parse_loop(true).map(Some),
            TokenType::Word if token.value == "case" => self.parse_case().map(Some),
            TokenType::Word if is_closer_word(&token.value) => Ok(None),
            TokenType::Word | TokenType::IoNumber => self.parse_simple(),
            TokenType::Operator if is_redirect_operator(&token.value).is_some() => {
                self.parse_simple()
            }
            _ => Ok(None),
        }
    }

    /// Commands until a closer from `closers` (or end of input). The caller
    /// consumes the closer.
    fn parse_compound_list(&mut self, closers: &[&str]) -> Result<Vec<CommandList>, ParseException> {
        let mut lists = Vec::new();

        loop {
            while self.peek().token_type == TokenType::Newline || self.peek().is_operator(";") {
                self.next();
            }

            let token = self.peek();
            match token.token_type {
                TokenType::Eof => break,
                TokenType::Operator if closers.contains(&token.value.as_str()) => break,
                TokenType::Word if closers.contains(&token.value.as_str()) => break,
                _ => {}
            }

            match self.parse_command_list()? {
                Some(list) => lists.push(list),
                None => return Err(self.unexpected("a command")),
            }
        }

        Ok(lists)
    }

    /// Condition/body chain after `if` or `elif`; the final `fi` is left
    /// for the caller.
    fn parse_if_chain(&mut self) -> Result<IfCommand, ParseException> {
        let condition = self.parse_compound_list(&["then"])?;
        self.expect_reserved("then")?;
        let body = self.parse_compound_list(&["elif", "else", "fi"])?;

        let else_clause = if self.peek().is_word("elif") {
            self.next();
            let nested = self.parse_if_chain()?;
            Some(vec![CommandList {
                list: AndOrList {
                    first: Pipeline {
                        negation: false,
                        commands: vec![Command::If(nested)],
                    },
                    rest: vec![],
                },
                is_async: false,
            }])
        } else if self.peek().is_word("else") {
            self.next();
            Some(self.parse_compound_list(&["fi"])?)
        } else {
            None
        };

        Ok(IfCommand { condition, body, else_clause })
    }

    fn parse_for(&mut self) -> Result<Command, ParseException> {
        self.next(); // for

        let token = self.next();
        if token.token_type != TokenType::Word || !is_valid_name(&token.value) {
            return Err(ParseException::expected(
                "an identifier after 'for'",
                &format!("'{}'", token.value),
                token.start.line,
                token.start.column,
            ));
        }
        let name = token.value;

        self.skip_newlines();

        let mut has_in = false;
        let mut words = Vec::new();
        if self.peek().is_word("in") {
            self.next();
            has_in = true;
            while self.peek().token_type == TokenType::Word {
                let raw = self.next().value;
                words.push(parse_word(&raw)?);
            }
        }

        if self.peek().is_operator(";") || self.peek().token_type == TokenType::Newline {
            self.next();
        }
        self.skip_newlines();
        self.expect_reserved("do")?;
        let body = self.parse_compound_list(&["done"])?;
        self.expect_reserved("done")?;

        Ok(Command::For(ForCommand { name, has_in, words, body }))
    }

    fn parse_loop(&mut self, is_until: bool) -> Result<Command, ParseException> {
        self.next(); // while / until
        let condition = self.parse_compound_list(&["do"])?;
        self.expect_reserved("do")?;
        let body = self.parse_compound_list(&["done"])?;
        self.expect_reserved("done")?;
        Ok(Command::Loop(LoopCommand { is_until, condition, body }))
    }

    fn parse_case(&mut self) -> Result<Command, ParseException> {
        self.next(); // case

        let token = self.next();
        if token.token_type != TokenType::Word {
            return Err(ParseException::expected(
                "a word after 'case'",
                &format!("'{}'", token.value),
                token.start.line,
                token.start.column,
            ));
        }
        let word = parse_word(&token.value)?;

        self.skip_newlines();
        self.expect_reserved("in")?;
        self.skip_newlines();

        let mut items = Vec::new();
        while !self.peek().is_word("esac") {
            if self.peek().token_type == TokenType::Eof {
                return Err(self.unexpected("'esac'"));
            }

            if self.peek().is_operator("(") {
                self.next();
            }

            let mut patterns = Vec::new();
            loop {
                let token = self.next();
                if token.token_type != TokenType::Word {
                    return Err(ParseException::expected(
                        "a pattern",
                        &format!("'{}'", token.value),
                        token.start.line,
                        token.start.column,
                    ));
                }
                patterns.push(parse_word(&token.value)?);
                if self.peek().is_operator("|") {
                    self.next();
                } else {
                    break;
                }
            }
            self.expect_operator(")")?;
            self.skip_newlines();

            let body = self.parse_compound_list(&[";;", "esac"])?;
            if self.peek().is_operator(";;") {
                self.next();
                self.skip_newlines();
            }

            items.push(CaseItem { patterns, body });
        }
        self.expect_reserved("esac")?;

        Ok(Command::Case(CaseCommand { word, items }))
    }

    // =========================================================================
    // Simple commands
    // =========================================================================

    fn parse_simple(&mut self) -> Result<Option<Command>, ParseException> {
        let mut assignments = Vec::new();
        let mut redirects = Vec::new();
        let mut name: Option<Word> = None;
        let mut args = Vec::new();

        loop {
            let token = self.peek().clone();
            match token.token_type {
                TokenType::IoNumber => {
                    self.next();
                    let io_number = token.value.parse::<i32>().unwrap_or(-1);
                    redirects.push(self.parse_redirect(io_number)?);
                }
                TokenType::Operator => {
                    if is_redirect_operator(&token.value).is_some() {
                        redirects.push(self.parse_redirect(-1)?);
                    } else {
                        break;
                    }
                }
                TokenType::Word => {
                    // Assignment words only count before the command name
                    // is bound.
                    if name.is_none() {
                        if let Some((assign_name, value)) = assignment_parts(&token.value) {
                            self.next();
                            assignments.push(Assignment {
                                name: assign_name.to_string(),
                                value: parse_word(value)?,
                            });
                            continue;
                        }
                    }

                    let raw = self.next().value;

                    // `name() body` defines a function.
                    if name.is_none()
                        && args.is_empty()
                        && assignments.is_empty()
                        && redirects.is_empty()
                        && is_valid_name(&raw)
                        && self.peek().is_operator("(")
                    {
                        self.next();
                        self.expect_operator(")")?;
                        self.skip_newlines();
                        let body = self
                            .parse_command()?
                            .ok_or_else(|| self.error_at("expected a function body"))?;
                        return Ok(Some(Command::Function(FunctionDef {
                            name: raw,
                            body: Box::new(body),
                        })));
                    }

                    let word = parse_word(&raw)?;
                    if name.is_none() {
                        name = Some(word);
                    } else {
                        args.push(word);
                    }
                }
                _ => break,
            }
        }

        let command = SimpleCommand { name, args, redirects, assignments };
        if command.is_empty() {
            return Ok(None);
        }
        Ok(Some(Command::Simple(command)))
    }

    fn parse_redirect(&mut self, io_number: i32) -> Result<IoRedirect, ParseException> {
        let token = self.next();
        let op = is_redirect_operator(&token.value).ok_or_else(|| {
            ParseException::expected(
                "a redirection operator",
                &format!("'{}'", token.value),
                token.start.line,
                token.start.column,
            )
        })?;

        let target = self.next();
        if target.token_type != TokenType::Word {
            return Err(ParseException::expected(
                "a redirection target",
                &format!("'{}'", target.value),
                target.start.line,
                target.start.column,
            ));
        }

        Ok(IoRedirect {
            io_number,
            op,
            name: parse_word(&target.value)?,
            here_document: None,
        })
    }
}
