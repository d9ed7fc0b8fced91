//! cd - change the working directory

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct CdCommand;

#[async_trait]
impl Command for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn description(&self) -> &'static str {
        "change the working directory"
    }

    fn category(&self) -> Option<&'static str> {
        Some("core")
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let mut print_target = false;

        let target = match args.positionals.first().map(|s| s.as_str()) {
            None => ctx.env_get("HOME").unwrap_or("/").to_string(),
            Some("-") => {
                // `cd -` goes to OLDPWD and echoes the destination.
                print_target = true;
                match ctx.env_get("OLDPWD") {
                    Some(oldpwd) => oldpwd.to_string(),
                    None => {
                        ctx.stderr("cd: OLDPWD not set\n");
                        return Ok(1);
                    }
                }
            }
            Some(raw) => {
                let home = ctx.env_get("HOME").unwrap_or("/").to_string();
                if raw == "~" {
                    home
                } else if let Some(rest) = raw.strip_prefix("~/") {
                    format!("{}/{}", home, rest)
                } else {
                    raw.to_string()
                }
            }
        };

        let path = ctx.resolve(&target);
        match ctx.fs.stat(&path).await {
            Ok(stat) if stat.is_directory => {
                ctx.set_cwd(&path);
                if print_target {
                    ctx.stdout(&format!("{}\n", path));
                }
                Ok(0)
            }
            Ok(_) => {
                ctx.stderr(&format!("cd: {}: Not a directory\n", target));
                Ok(1)
            }
            Err(_) => {
                ctx.stderr(&format!("cd: {}: No such file or directory\n", target));
                Ok(1)
            }
        }
    }
}
