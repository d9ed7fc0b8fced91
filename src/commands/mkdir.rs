//! mkdir - create directories

use async_trait::async_trait;

use crate::commands::types::{
    Command, CommandContext, CommandError, ParamSpec, ParsedArgs,
};
use crate::fs::MkdirOptions;

pub struct MkdirCommand;

const PARAMS: &[ParamSpec] = &[ParamSpec::flag(
    "parents",
    'p',
    "make parent directories as needed; no error if existing",
)];

#[async_trait]
impl Command for MkdirCommand {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    fn description(&self) -> &'static str {
        "create directories"
    }

    fn category(&self) -> Option<&'static str> {
        Some("filesystem")
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        if args.positionals.is_empty() {
            ctx.stderr("mkdir: missing operand\n");
            return Ok(1);
        }

        let options = MkdirOptions {
            recursive: args.flag("parents"),
        };

        let mut exit_code = 0;
        for target in &args.positionals {
            let path = ctx.resolve(target);
            if let Err(err) = ctx.fs.mkdir(&path, &options).await {
                ctx.stderr(&format!(
                    "mkdir: cannot create directory '{}': {}\n",
                    target,
                    err.reason()
                ));
                exit_code = 1;
            }
        }
        Ok(exit_code)
    }
}
