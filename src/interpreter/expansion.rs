//! Word Expansion
//!
//! Turns a `Word` into a string against the current shell state: literals,
//! parameter expansion with its operator family, command substitution
//! (running the cached sub-program with stdout captured), and arithmetic
//! expansion. Field splitting and pathname expansion are not performed.
//!
//! Children of a list expand strictly left to right, so side-effecting
//! expansions (`${X:=d}`) observe a deterministic order.

use crate::ast::types::{ParamOp, ParameterWord, Word};
use crate::interpreter::arithmetic;
use crate::interpreter::engine::{BoxFuture, ExecutionEngine};
use crate::interpreter::pattern::{strip_pattern, StripSide};
use crate::interpreter::state::ShellState;

/// Result of expanding one word.
#[derive(Debug, Clone, Default)]
pub struct ExpandResult {
    pub value: String,
    /// Diagnostics from `${X:?}` and command substitutions.
    pub stderr: String,
    /// Set when a `${X:?}` fired; the containing command must not run.
    pub failed: bool,
}

impl ExpandResult {
    fn merge(&mut self, other: ExpandResult) -> String {
        self.stderr.push_str(&other.stderr);
        self.failed |= other.failed;
        other.value
    }
}

impl<'a> ExecutionEngine<'a> {
    /// Expand a word to a single string.
    pub fn expand_word<'b>(
        &'b self,
        state: &'b mut ShellState,
        word: &'b Word,
    ) -> BoxFuture<'b, ExpandResult> {
        Box::pin(async move {
            match word {
                Word::Str(s) => ExpandResult {
                    value: s.value.clone(),
                    ..Default::default()
                },
                Word::List(list) => {
                    let mut result = ExpandResult::default();
                    for child in &list.children {
                        let piece = self.expand_word(state, child).await;
                        let value = result.merge(piece);
                        result.value.push_str(&value);
                    }
                    result
                }
                Word::Parameter(param) => self.expand_parameter(state, param).await,
                Word::Command(command) => {
                    let mut result = ExpandResult::default();
                    if let Some(program) = &command.program {
                        // The pipe buffer belongs to the command being
                        // assembled, not to the substitution.
                        let saved = std::mem::take(&mut state.pipe_buffer);
                        let sub = self.execute_program(state, program).await;
                        state.pipe_buffer = saved;
                        result.stderr.push_str(&sub.stderr);
                        let mut value = sub.stdout;
                        if value.ends_with('\n') {
                            value.pop();
                        }
                        result.value = value;
                    }
                    result
                }
                Word::Arithmetic(arith) => {
                    let mut result = ExpandResult::default();
                    let body = self.expand_word(state, &arith.body).await;
                    let body_value = result.merge(body);
                    result.value = evaluate_arithmetic(state, &body_value);
                    result
                }
            }
        })
    }

    async fn expand_parameter(
        &self,
        state: &mut ShellState,
        param: &ParameterWord,
    ) -> ExpandResult {
        let mut result = ExpandResult::default();

        let (value, is_unset) = match param.name.as_str() {
            "?" => (state.last_exit_code.to_string(), false),
            // Single synthetic process: constant pid, no last background job.
            "$" | "!" => ("1".to_string(), false),
            "-" => (String::new(), false),
            "#" => ("0".to_string(), false),
            "*" | "@" => (String::new(), false),
            "0" => (self.shell_name.to_string(), false),
            name => match state.get_env(name) {
                Some(v) => (v.to_string(), false),
                None => (String::new(), true),
            },
        };

        let is_empty = value.is_empty();
        // `:` extends the trigger from unset to unset-or-empty.
        let null = param.colon && is_empty;

        result.value = match param.op {
            ParamOp::None => value,
            ParamOp::Minus => {
                if is_unset || null {
                    match &param.arg {
                        Some(arg) => {
                            let piece = self.expand_word(state, arg).await;
                            result.merge(piece)
                        }
                        None => String::new(),
                    }
                } else {
                    value
                }
            }
            ParamOp::Equal => {
                if is_unset || null {
                    let assigned = match &param.arg {
                        Some(arg) => {
                            let piece = self.expand_word(state, arg).await;
                            result.merge(piece)
                        }
                        None => String::new(),
                    };
                    state.set_env(&param.name, &assigned);
                    assigned
                } else {
                    value
                }
            }
            ParamOp::QMark => {
                if is_unset || null {
                    let message = match &param.arg {
                        Some(arg) => {
                            let piece = self.expand_word(state, arg).await;
                            let text = result.merge(piece);
                            if text.is_empty() {
                                "parameter null or not set".to_string()
                            } else {
                                text
                            }
                        }
                        None => "parameter null or not set".to_string(),
                    };
                    result.stderr.push_str(&format!(
                        "{}: {}: {}\n",
                        self.shell_name, param.name, message
                    ));
                    result.failed = true;
                    String::new()
                } else {
                    value
                }
            }
            ParamOp::Plus => {
                if !is_unset && !null {
                    match &param.arg {
                        Some(arg) => {
                            let piece = self.expand_word(state, arg).await;
                            result.merge(piece)
                        }
                        None => String::new(),
                    }
                } else {
                    String::new()
                }
            }
            ParamOp::LeadingHash => value.chars().count().to_string(),
            ParamOp::Percent | ParamOp::DPercent | ParamOp::Hash | ParamOp::DHash => {
                let pattern = match &param.arg {
                    Some(arg) => {
                        let piece = self.expand_word(state, arg).await;
                        result.merge(piece)
                    }
                    None => String::new(),
                };
                let (side, longest) = match param.op {
                    ParamOp::Percent => (StripSide::Suffix, false),
                    ParamOp::DPercent => (StripSide::Suffix, true),
                    ParamOp::Hash => (StripSide::Prefix, false),
                    _ => (StripSide::Prefix, true),
                };
                strip_pattern(&value, &pattern, side, longest)
            }
        };

        result
    }
}

/// Arithmetic semantics: substitute any remaining `$name` references, strip
/// the string down to the arithmetic character set, and evaluate. Any
/// failure yields "0".
fn evaluate_arithmetic(state: &ShellState, body: &str) -> String {
    let substituted = substitute_variables(state, body);
    let sanitized: String = substituted
        .chars()
        .filter(|c| matches!(c, '0'..='9' | '+' | '-' | '*' | '/' | '%' | '(' | ')' | ' '))
        .collect();
    match arithmetic::evaluate(&sanitized) {
        Ok(value) => value.to_string(),
        Err(_) => "0".to_string(),
    }
}

/// Replace `$name` occurrences with the variable's value (empty if unset).
fn substitute_variables(state: &ShellState, input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
            if end > start {
                let name: String = chars[start..end].iter().collect();
                out.push_str(state.get_env(&name).unwrap_or(""));
                i = end;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}
