//! rm - remove files and directories

use async_trait::async_trait;

use crate::commands::types::{
    Command, CommandContext, CommandError, ParamSpec, ParsedArgs,
};

pub struct RmCommand;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::flag("recursive", 'r', "remove directories and their contents"),
    ParamSpec::flag("force", 'f', "ignore nonexistent files"),
];

#[async_trait]
impl Command for RmCommand {
    fn name(&self) -> &'static str {
        "rm"
    }

    fn description(&self) -> &'static str {
        "remove files or directories"
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
        let recursive = args.flag("recursive") || args.flag("R");
        let force = args.flag("force");

        if args.positionals.is_empty() {
            if force {
                return Ok(0);
            }
            ctx.stderr("rm: missing operand\n");
            return Ok(1);
        }

        let mut exit_code = 0;
        for target in &args.positionals {
            let path = ctx.resolve(target);
            let stat = match ctx.fs.stat(&path).await {
                Ok(stat) => stat,
                Err(_) => {
                    if !force {
                        ctx.stderr(&format!(
                            "rm: cannot remove '{}': No such file or directory\n",
                            target
                        ));
                        exit_code = 1;
                    }
                    continue;
                }
            };

            let outcome = if stat.is_directory {
                if recursive {
                    remove_tree(ctx, &path).await
                } else {
                    ctx.stderr(&format!("rm: cannot remove '{}': Is a directory\n", target));
                    exit_code = 1;
                    continue;
                }
            } else {
                ctx.fs.unlink(&path).await
            };

            if let Err(err) = outcome {
                ctx.stderr(&format!("rm: cannot remove '{}': {}\n", target, err.reason()));
                exit_code = 1;
            }
        }
        Ok(exit_code)
    }
}

/// Depth-first removal without recursion: walk the subtree, then delete
/// children before parents.
async fn remove_tree(ctx: &CommandContext, root: &str) -> Result<(), crate::fs::FsError> {
    let mut stack = vec![root.to_string()];
    let mut order = Vec::new();

    while let Some(path) = stack.pop() {
        order.push(path.clone());
        if ctx.fs.stat(&path).await?.is_directory {
            for name in ctx.fs.readdir(&path).await? {
                stack.push(format!("{}/{}", path, name));
            }
        }
    }

    for path in order.iter().rev() {
        if ctx.fs.stat(path).await?.is_directory {
            ctx.fs.rmdir(path).await?;
        } else {
            ctx.fs.unlink(path).await?;
        }
    }
    Ok(())
}
