//! echo - write arguments to stdout

use async_trait::async_trait;

use crate::commands::types::{
    Command, CommandContext, CommandError, ParamSpec, ParsedArgs,
};

pub struct EchoCommand;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::flag("n", 'n', "do not output the trailing newline"),
    ParamSpec::flag("e", 'e', "enable interpretation of backslash escapes"),
    ParamSpec::flag("E", 'E', "disable interpretation of backslash escapes"),
];

/// Interpret the escapes `-e` enables.
fn interpret_escapes(input: &str) -> String {
    let mut out = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "write arguments to standard output"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let mut text = args.positionals.join(" ");
        if args.flag("e") && !args.flag("E") {
            text = interpret_escapes(&text);
        }
        ctx.stdout(&text);
        if !args.flag("n") {
            ctx.stdout("\n");
        }
        Ok(0)
    }
}
