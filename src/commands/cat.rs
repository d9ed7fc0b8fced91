//! cat - concatenate files to stdout

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct CatCommand;

#[async_trait]
impl Command for CatCommand {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn description(&self) -> &'static str {
        "concatenate files and print on standard output"
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
            let stdin = ctx.stdin.clone();
            ctx.stdout(&stdin);
            return Ok(0);
        }

        let mut exit_code = 0;
        for file in &args.positionals {
            if file == "-" {
                let stdin = ctx.stdin.clone();
                ctx.stdout(&stdin);
                continue;
            }
            let path = ctx.resolve(file);
            match ctx.fs.read_file(&path).await {
                Ok(contents) => ctx.stdout(&contents),
                Err(err) => {
                    ctx.stderr(&format!("cat: {}: {}\n", file, err.reason()));
                    exit_code = 1;
                }
            }
        }
        Ok(exit_code)
    }
}
