//! export / unset / env - environment management

use async_trait::async_trait;

use crate::commands::types::{Command, CommandContext, CommandError, ParsedArgs};

pub struct ExportCommand;
pub struct UnsetCommand;
pub struct EnvCommand;

fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[async_trait]
impl Command for ExportCommand {
    fn name(&self) -> &'static str {
        "export"
    }

    fn description(&self) -> &'static str {
        "set environment variables"
    }

    fn category(&self) -> Option<&'static str> {
        Some("environment")
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let mut exit_code = 0;
        for arg in &args.raw {
            match arg.split_once('=') {
                Some((name, value)) if is_valid_name(name) => {
                    let (name, value) = (name.to_string(), value.to_string());
                    ctx.set_env(&name, &value);
                }
                Some((name, _)) => {
                    ctx.stderr(&format!("export: '{}': not a valid identifier\n", name));
                    exit_code = 1;
                }
                // A bare name with no value: the environment is flat here,
                // so there is nothing to mark.
                None if is_valid_name(arg) => {}
                None => {
                    ctx.stderr(&format!("export: '{}': not a valid identifier\n", arg));
                    exit_code = 1;
                }
            }
        }
        Ok(exit_code)
    }
}

#[async_trait]
impl Command for UnsetCommand {
    fn name(&self) -> &'static str {
        "unset"
    }

    fn description(&self) -> &'static str {
        "remove environment variables"
    }

    fn category(&self) -> Option<&'static str> {
        Some("environment")
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        for arg in &args.raw {
            let name = arg.clone();
            ctx.unset_env(&name);
        }
        Ok(0)
    }
}

#[async_trait]
impl Command for EnvCommand {
    fn name(&self) -> &'static str {
        "env"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["printenv"]
    }

    fn description(&self) -> &'static str {
        "print the environment"
    }

    fn category(&self) -> Option<&'static str> {
        Some("environment")
    }

    async fn execute(
        &self,
        _args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let mut out = String::new();
        for (name, value) in &ctx.env {
            out.push_str(&format!("{}={}\n", name, value));
        }
        ctx.stdout(&out);
        Ok(0)
    }
}
