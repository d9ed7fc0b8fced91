//! pwd - print the working directory

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct PwdCommand;

#[async_trait]
impl Command for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn description(&self) -> &'static str {
        "print the current working directory"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    async fn execute(
        &self,
        _args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let cwd = ctx.cwd.clone();
        ctx.stdout(&format!("{}\n", cwd));
        Ok(0)
    }
}
