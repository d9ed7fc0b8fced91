//! Abstract Syntax Tree Types
//!
//! This module defines the AST produced by the parser and walked by the
//! evaluator. Words and commands are sum types with one constructor per
//! syntactic kind; the evaluator performs exhaustive case analysis.

// =============================================================================
// BASE TYPES
// =============================================================================

/// Position information for error reporting.
///
/// `line` and `column` start at 1; `offset` is the byte offset into the
/// source and starts at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Self { offset: 0, line: 1, column: 1 }
    }
}

/// A half-open span in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

// =============================================================================
// WORDS
// =============================================================================

/// A word is a parsed unit that may expand to a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Word {
    /// A literal chunk. `single_quoted` suppresses all expansion.
    Str(StrWord),
    /// `${...}`-style parameter expansion (and bare `$name`).
    Parameter(ParameterWord),
    /// `$(...)` or backquoted command substitution.
    Command(CommandWord),
    /// `$((...))` arithmetic expansion.
    Arithmetic(ArithmeticWord),
    /// Concatenation of sub-words (composite tokens and `"..."` regions).
    List(ListWord),
}

impl Word {
    /// Convenience constructor for an unquoted literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Word::Str(StrWord {
            value: value.into(),
            single_quoted: false,
            split_fields: true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrWord {
    pub value: String,
    pub single_quoted: bool,
    /// Whether the chunk would be subject to field splitting. Field
    /// splitting itself is not performed; the flag records quoting context.
    pub split_fields: bool,
}

/// Operators usable inside `${name<op>word}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamOp {
    /// Plain `$name` or `${name}`.
    #[default]
    None,
    /// `${name-word}` / `${name:-word}`: default value.
    Minus,
    /// `${name=word}` / `${name:=word}`: assign default.
    Equal,
    /// `${name?word}` / `${name:?word}`: error if unset.
    QMark,
    /// `${name+word}` / `${name:+word}`: alternative value.
    Plus,
    /// `${#name}`: length of value.
    LeadingHash,
    /// `${name%word}`: strip shortest matching suffix.
    Percent,
    /// `${name%%word}`: strip longest matching suffix.
    DPercent,
    /// `${name#word}`: strip shortest matching prefix.
    Hash,
    /// `${name##word}`: strip longest matching prefix.
    DHash,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterWord {
    pub name: String,
    pub op: ParamOp,
    /// Distinguishes `:-` (unset or empty) from `-` (unset only).
    pub colon: bool,
    pub arg: Option<Box<Word>>,
}

/// Command substitution. The body is parsed eagerly at word-construction
/// time and cached here.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandWord {
    pub program: Option<Program>,
    pub back_quoted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticWord {
    pub body: Box<Word>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListWord {
    pub children: Vec<Word>,
    pub double_quoted: bool,
}

// =============================================================================
// REDIRECTIONS & ASSIGNMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    Less,      // <
    Great,     // >
    Clobber,   // >|
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    DLess,     // <<
    DLessDash, // <<-
}

impl RedirectOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Great => ">",
            Self::Clobber => ">|",
            Self::DGreat => ">>",
            Self::LessAnd => "<&",
            Self::GreatAnd => ">&",
            Self::LessGreat => "<>",
            Self::DLess => "<<",
            Self::DLessDash => "<<-",
        }
    }

    /// Operators that write a captured output buffer to a file target.
    pub fn is_output_file(&self) -> bool {
        matches!(self, Self::Great | Self::Clobber | Self::DGreat)
    }
}

/// An I/O redirection attached to a simple command.
#[derive(Debug, Clone, PartialEq)]
pub struct IoRedirect {
    /// Explicit descriptor number, or -1 when unspecified.
    pub io_number: i32,
    pub op: RedirectOp,
    pub name: Word,
    /// Here-document body lines. Parsed operators only; bodies stay empty.
    pub here_document: Option<Vec<Word>>,
}

/// `NAME=value` preceding a command name.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Word,
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Union of all command forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(SimpleCommand),
    BraceGroup(BraceGroup),
    Subshell(Subshell),
    If(IfCommand),
    For(ForCommand),
    Loop(LoopCommand),
    Case(CaseCommand),
    Function(FunctionDef),
}

/// name args... with redirections and leading assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommand {
    pub name: Option<Word>,
    pub args: Vec<Word>,
    pub redirects: Vec<IoRedirect>,
    pub assignments: Vec<Assignment>,
}

impl SimpleCommand {
    /// True when the parser consumed nothing for this production.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.args.is_empty()
            && self.redirects.is_empty()
            && self.assignments.is_empty()
    }
}

/// `{ ...; }` executed in the current environment.
#[derive(Debug, Clone, PartialEq)]
pub struct BraceGroup {
    pub body: Vec<CommandList>,
}

/// `( ... )` whose env and cwd mutations do not escape.
#[derive(Debug, Clone, PartialEq)]
pub struct Subshell {
    pub body: Vec<CommandList>,
}

/// `if cond; then body; [else ...;] fi`. An `elif` chain is represented as
/// an else clause holding a nested `If`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfCommand {
    pub condition: Vec<CommandList>,
    pub body: Vec<CommandList>,
    pub else_clause: Option<Vec<CommandList>>,
}

/// `for name [in words]; do body; done`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForCommand {
    pub name: String,
    pub has_in: bool,
    /// Empty when `has_in` is false.
    pub words: Vec<Word>,
    pub body: Vec<CommandList>,
}

/// `while`/`until` loops share a node; `is_until` inverts the condition.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCommand {
    pub is_until: bool,
    pub condition: Vec<CommandList>,
    pub body: Vec<CommandList>,
}

/// `case word in pattern) body ;; ... esac`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseCommand {
    pub word: Word,
    pub items: Vec<CaseItem>,
}

/// One case arm. Always has at least one pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub body: Vec<CommandList>,
}

/// `name() body`. Executing the definition installs the body in the
/// shell's function table under `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub body: Box<Command>,
}

// =============================================================================
// LISTS
// =============================================================================

/// Commands connected by `|`. Contains at least one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub negation: bool,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndOrOp {
    And, // &&
    Or,  // ||
}

#[derive(Debug, Clone, PartialEq)]
pub struct AndOrItem {
    pub op: AndOrOp,
    pub pipeline: Pipeline,
}

/// Pipelines connected by `&&`/`||` with short-circuit semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct AndOrList {
    pub first: Pipeline,
    pub rest: Vec<AndOrItem>,
}

/// One statement of a program. `is_async` records a trailing `&`; execution
/// remains synchronous.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandList {
    pub list: AndOrList,
    pub is_async: bool,
}

/// Root node: a complete parsed script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub commands: Vec<CommandList>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_literal() {
        match Word::literal("abc") {
            Word::Str(s) => {
                assert_eq!(s.value, "abc");
                assert!(!s.single_quoted);
                assert!(s.split_fields);
            }
            other => panic!("expected Str, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_command_is_empty() {
        let cmd = SimpleCommand {
            name: None,
            args: vec![],
            redirects: vec![],
            assignments: vec![],
        };
        assert!(cmd.is_empty());

        let cmd = SimpleCommand {
            name: Some(Word::literal("echo")),
            args: vec![],
            redirects: vec![],
            assignments: vec![],
        };
        assert!(!cmd.is_empty());
    }

    #[test]
    fn test_redirect_op_strings() {
        assert_eq!(RedirectOp::Great.as_str(), ">");
        assert_eq!(RedirectOp::DLessDash.as_str(), "<<-");
        assert!(RedirectOp::DGreat.is_output_file());
        assert!(!RedirectOp::Less.is_output_file());
    }
}
