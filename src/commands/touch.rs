//! touch - create empty files

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct TouchCommand;

#[async_trait]
impl Command for TouchCommand {
    fn name(&self) -> &'static str {
        "touch"
    }

    fn description(&self) -> &'static str {
        "create files if they do not exist"
    }

    fn category(&self) -> Option<&'static str> {
        Some("filesystem")
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        if args.positionals.is_empty() {
            ctx.stderr("touch: missing file operand\n");
            return Ok(1);
        }

        let mut exit_code = 0;
        for target in &args.positionals {
            let path = ctx.resolve(target);
            if ctx.fs.access(&path).await.is_ok() {
                continue;
            }
            if let Err(err) = ctx.fs.write_file(&path, "").await {
                ctx.stderr(&format!("touch: cannot touch '{}': {}\n", target, err.reason()));
                exit_code = 1;
            }
        }
        Ok(exit_code)
    }
}
