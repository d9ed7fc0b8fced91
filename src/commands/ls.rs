//! ls - list directory contents

use async_trait::async_trait;

use crate::commands::types::{
    Command, CommandContext, CommandError, ParamSpec, ParsedArgs,
};

pub struct LsCommand;

const PARAMS: &[ParamSpec] = &[ParamSpec::flag("all", 'a', "do not hide dotfiles")];

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["dir"]
    }

    fn description(&self) -> &'static str {
        "list directory contents"
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
        let show_all = args.flag("all");
        let targets: Vec<String> = if args.positionals.is_empty() {
            vec![".".to_string()]
        } else {
            args.positionals.clone()
        };
        let label_targets = targets.len() > 1;

        let mut exit_code = 0;
        for (index, target) in targets.iter().enumerate() {
            let path = ctx.resolve(target);
            let stat = match ctx.fs.stat(&path).await {
                Ok(stat) => stat,
                Err(err) => {
                    ctx.stderr(&format!("ls: cannot access '{}': {}\n", target, err.reason()));
                    exit_code = 1;
                    continue;
                }
            };

            if stat.is_file {
                ctx.stdout(&format!("{}\n", target));
                continue;
            }

            if label_targets {
                if index > 0 {
                    ctx.stdout("\n");
                }
                ctx.stdout(&format!("{}:\n", target));
            }
            match ctx.fs.readdir(&path).await {
                Ok(names) => {
                    for name in names {
                        if !show_all && name.starts_with('.') {
                            continue;
                        }
                        ctx.stdout(&format!("{}\n", name));
                    }
                }
                Err(err) => {
                    ctx.stderr(&format!("ls: cannot open '{}': {}\n", target, err.reason()));
                    exit_code = 1;
                }
            }
        }
        Ok(exit_code)
    }
}
