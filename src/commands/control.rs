//! true / false / exit

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct TrueCommand;
pub struct FalseCommand;
pub struct ExitCommand;

#[async_trait]
impl Command for TrueCommand {
    fn name(&self) -> &'static str {
        "true"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &[":"]
    }

    fn description(&self) -> &'static str {
        "return a successful result"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    async fn execute(
        &self,
        _args: ParsedArgs,
        _ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        Ok(0)
    }
}

#[async_trait]
impl Command for FalseCommand {
    fn name(&self) -> &'static str {
        "false"
    }

    fn description(&self) -> &'static str {
        "return an unsuccessful result"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    async fn execute(
        &self,
        _args: ParsedArgs,
        _ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        Ok(1)
    }
}

#[async_trait]
impl Command for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn description(&self) -> &'static str {
        "exit the shell"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let code = match args.raw.first() {
            Some(raw) => match raw.parse::<i32>() {
                Ok(code) => code,
                Err(_) => {
                    ctx.stderr(&format!("exit: {}: numeric argument required\n", raw));
                    ctx.exit(2);
                    return Ok(2);
                }
            },
            None => ctx.last_exit_code,
        };
        ctx.exit(code);
        Ok(code)
    }
}
