//! test / [ - evaluate conditional expressions
//!
//! Predates option schemas, so it evaluates the raw argument vector:
//! string, numeric, and file predicates with optional `!` negation.

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct TestCommand;
pub struct BracketCommand;

enum Verdict {
    Bool(bool),
    Usage(String),
}

async fn evaluate(ctx: &CommandContext, args: &[String]) -> Verdict {
    let mut negate = false;
    let mut args = args;
    while args.first().map(|s| s.as_str()) == Some("!") {
        negate = !negate;
        args = &args[1..];
    }

    let verdict = match args.len() {
        0 => Verdict::Bool(false),
        1 => Verdict::Bool(!args[0].is_empty()),
        2 => {
            let operand = &args[1];
            match args[0].as_str() {
                "-z" => Verdict::Bool(operand.is_empty()),
                "-n" => Verdict::Bool(!operand.is_empty()),
                "-e" => Verdict::Bool(ctx.fs.access(&ctx.resolve(operand)).await.is_ok()),
                "-f" => Verdict::Bool(
                    matches!(ctx.fs.stat(&ctx.resolve(operand)).await, Ok(stat) if stat.is_file),
                ),
                "-d" => Verdict::Bool(
                    matches!(ctx.fs.stat(&ctx.resolve(operand)).await, Ok(stat) if stat.is_directory),
                ),
                op => Verdict::Usage(format!("unknown operator {}", op)),
            }
        }
        3 => {
            let (a, op, b) = (&args[0], &args[1], &args[2]);
            match op.as_str() {
                "=" => Verdict::Bool(a == b),
                "!=" => Verdict::Bool(a != b),
                "-eq" | "-ne" | "-lt" | "-le" | "-gt" | "-ge" => {
                    let (Ok(x), Ok(y)) = (a.parse::<i64>(), b.parse::<i64>()) else {
                        return Verdict::Usage(format!(
                            "integer expression expected: {} {} {}",
                            a, op, b
                        ));
                    };
                    Verdict::Bool(match op.as_str() {
                        "-eq" => x == y,
                        "-ne" => x != y,
                        "-lt" => x < y,
                        "-le" => x <= y,
                        "-gt" => x > y,
                        _ => x >= y,
                    })
                }
                _ => Verdict::Usage(format!("unknown operator {}", op)),
            }
        }
        _ => Verdict::Usage("too many arguments".to_string()),
    };

    match verdict {
        Verdict::Bool(b) if negate => Verdict::Bool(!b),
        other => other,
    }
}

async fn run_test(
    name: &str,
    args: &[String],
    ctx: &mut CommandContext,
) -> Result<i32, CommandError> {
    match evaluate(ctx, args).await {
        Verdict::Bool(true) => Ok(0),
        Verdict::Bool(false) => Ok(1),
        Verdict::Usage(message) => {
            ctx.stderr(&format!("{}: {}\n", name, message));
            Ok(2)
        }
    }
}

#[async_trait]
impl Command for TestCommand {
    fn name(&self) -> &'static str {
        "test"
    }

    fn description(&self) -> &'static str {
        "evaluate a conditional expression"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        run_test("test", &args.raw, ctx).await
    }
}

#[async_trait]
impl Command for BracketCommand {
    fn name(&self) -> &'static str {
        "["
    }

    fn description(&self) -> &'static str {
        "evaluate a conditional expression (closing ] required)"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    fn hidden(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let mut raw = args.raw.clone();
        match raw.pop().as_deref() {
            Some("]") => run_test("[", &raw, ctx).await,
            _ => {
                ctx.stderr("[: missing ']'\n");
                Ok(2)
            }
        }
    }
}
