//! help - list registered commands

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "list available commands"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    async fn execute(
        &self,
        _args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let mut out = String::new();
        for command in &ctx.commands {
            if command.hidden {
                continue;
            }
            out.push_str(&format!("{:<12} {}\n", command.name, command.description));
        }
        ctx.stdout(&out);
        Ok(0)
    }
}
