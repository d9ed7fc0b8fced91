//! alias / unalias - textual alias management

use async_trait::async_trait;

use crate::commands::types::{
    Command, CommandContext, CommandError, ParamSpec, ParsedArgs,
};

pub struct AliasCommand;
pub struct UnaliasCommand;

#[async_trait]
impl Command for AliasCommand {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn description(&self) -> &'static str {
        "define or display aliases"
    }

    fn category(&self) -> Option<&'static str> {
        Some("environment")
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        if args.raw.is_empty() {
            let mut out = String::new();
            for (name, value) in &ctx.aliases {
                out.push_str(&format!("alias {}='{}'\n", name, value));
            }
            ctx.stdout(&out);
            return Ok(0);
        }

        let mut exit_code = 0;
        for arg in &args.raw {
            match arg.split_once('=') {
                Some((name, value)) => {
                    let (name, value) = (name.to_string(), value.to_string());
                    ctx.set_alias(&name, &value);
                }
                None => match ctx.aliases.get(arg) {
                    Some(value) => {
                        let line = format!("alias {}='{}'\n", arg, value);
                        ctx.stdout(&line);
                    }
                    None => {
                        ctx.stderr(&format!("alias: {}: not found\n", arg));
                        exit_code = 1;
                    }
                },
            }
        }
        Ok(exit_code)
    }
}

const UNALIAS_PARAMS: &[ParamSpec] = &[ParamSpec::flag("all", 'a', "remove every alias")];

#[async_trait]
impl Command for UnaliasCommand {
    fn name(&self) -> &'static str {
        "unalias"
    }

    fn description(&self) -> &'static str {
        "remove aliases"
    }

    fn category(&self) -> Option<&'static str> {
        Some("environment")
    }

    fn params(&self) -> &'static [ParamSpec] {
        UNALIAS_PARAMS
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        if args.flag("all") {
            let names: Vec<String> = ctx.aliases.keys().cloned().collect();
            for name in names {
                ctx.unset_alias(&name);
            }
            return Ok(0);
        }

        let mut exit_code = 0;
        for name in &args.positionals {
            if ctx.aliases.contains_key(name) {
                let name = name.clone();
                ctx.unset_alias(&name);
            } else {
                ctx.stderr(&format!("unalias: {}: not found\n", name));
                exit_code = 1;
            }
        }
        Ok(exit_code)
    }
}
