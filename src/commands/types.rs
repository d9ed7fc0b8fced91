//! Command Types
//!
//! The contract between the interpreter and host-provided commands: the
//! `Command` trait with its parameter schema, the `CommandContext` handed
//! to handlers, and the effects a handler may request against shell state.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

use crate::fs::FileSystem;

/// Declared type of a command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Boolean,
    Number,
    Array,
}

/// A parsed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Bool(bool),
    Num(i64),
    List(Vec<String>),
}

/// Schema entry for one option.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    /// Single-character flag alias (`-x`).
    pub short: Option<char>,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn flag(name: &'static str, short: char, description: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::Boolean,
            short: Some(short),
            required: false,
            default: None,
            description,
        }
    }

    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::String,
            short: None,
            required: false,
            default: None,
            description,
        }
    }
}

/// Options and positionals after schema parsing. `raw` keeps the original
/// expanded argv for commands whose surface predates option schemas.
#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub options: IndexMap<String, ParamValue>,
    pub positionals: Vec<String>,
    pub raw: Vec<String>,
}

impl ParsedArgs {
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.options.get(name), Some(ParamValue::Bool(true)))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.options.get(name) {
            Some(ParamValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_num(&self, name: &str) -> Option<i64> {
        match self.options.get(name) {
            Some(ParamValue::Num(n)) => Some(*n),
            _ => None,
        }
    }
}

/// An error a handler reports for an unexpected failure. Expected failures
/// are written to stderr with a nonzero return instead.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CommandError(pub String);

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// State mutations a handler requests; the evaluator applies them after the
/// handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEffect {
    SetEnv(String, String),
    UnsetEnv(String),
    SetCwd(String),
    SetAlias(String, String),
    UnsetAlias(String),
    Exit(i32),
}

/// Registry listing entry, used by `help`.
#[derive(Debug, Clone)]
pub struct CommandSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Option<&'static str>,
    pub hidden: bool,
}

/// Execution context for one command invocation.
pub struct CommandContext {
    /// Piped input for this command.
    pub stdin: String,
    pub cwd: String,
    /// Environment view. Mutations go through effects, not this map.
    pub env: IndexMap<String, String>,
    pub aliases: IndexMap<String, String>,
    pub last_exit_code: i32,
    pub shell_name: String,
    pub fs: Arc<dyn FileSystem>,
    /// Registry listing for introspection commands.
    pub commands: Vec<CommandSummary>,
    stdout: String,
    stderr: String,
    effects: Vec<ShellEffect>,
}

impl CommandContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stdin: String,
        cwd: String,
        env: IndexMap<String, String>,
        aliases: IndexMap<String, String>,
        last_exit_code: i32,
        shell_name: String,
        fs: Arc<dyn FileSystem>,
        commands: Vec<CommandSummary>,
    ) -> Self {
        Self {
            stdin,
            cwd,
            env,
            aliases,
            last_exit_code,
            shell_name,
            fs,
            commands,
            stdout: String::new(),
            stderr: String::new(),
            effects: Vec::new(),
        }
    }

    pub fn stdout(&mut self, text: &str) {
        self.stdout.push_str(text);
    }

    pub fn stderr(&mut self, text: &str) {
        self.stderr.push_str(text);
    }

    pub fn set_env(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_string(), value.to_string());
        self.effects
            .push(ShellEffect::SetEnv(name.to_string(), value.to_string()));
    }

    pub fn unset_env(&mut self, name: &str) {
        self.env.shift_remove(name);
        self.effects.push(ShellEffect::UnsetEnv(name.to_string()));
    }

    pub fn set_cwd(&mut self, path: &str) {
        self.effects.push(ShellEffect::SetCwd(path.to_string()));
    }

    pub fn set_alias(&mut self, name: &str, value: &str) {
        self.effects
            .push(ShellEffect::SetAlias(name.to_string(), value.to_string()));
    }

    pub fn unset_alias(&mut self, name: &str) {
        self.effects.push(ShellEffect::UnsetAlias(name.to_string()));
    }

    pub fn exit(&mut self, code: i32) {
        self.effects.push(ShellEffect::Exit(code));
    }

    /// Resolve a possibly-relative path against the command's cwd.
    pub fn resolve(&self, path: &str) -> String {
        self.fs.resolve_path(&self.cwd, path)
    }

    pub fn env_get(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(|s| s.as_str())
    }

    /// Drain captured output and requested effects.
    pub fn into_parts(self) -> (String, String, Vec<ShellEffect>) {
        (self.stdout, self.stderr, self.effects)
    }
}

/// A host command plugged into the registry.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    fn category(&self) -> Option<&'static str> {
        None
    }

    fn hidden(&self) -> bool {
        false
    }

    /// Option schema applied before the handler runs.
    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    async fn execute(&self, args: ParsedArgs, ctx: &mut CommandContext)
        -> Result<i32, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_args_accessors() {
        let mut args = ParsedArgs::default();
        args.options.insert("v".to_string(), ParamValue::Bool(true));
        args.options
            .insert("out".to_string(), ParamValue::Str("f.txt".to_string()));
        args.options.insert("n".to_string(), ParamValue::Num(3));

        assert!(args.flag("v"));
        assert!(!args.flag("missing"));
        assert_eq!(args.get_str("out"), Some("f.txt"));
        assert_eq!(args.get_num("n"), Some(3));
    }

    #[test]
    fn test_context_collects_output_and_effects() {
        let fs: Arc<dyn FileSystem> = Arc::new(crate::fs::MemFs::new());
        let mut ctx = CommandContext::new(
            String::new(),
            "/".to_string(),
            IndexMap::new(),
            IndexMap::new(),
            0,
            "mrsh".to_string(),
            fs,
            vec![],
        );
        ctx.stdout("out");
        ctx.stderr("err");
        ctx.set_env("A", "1");
        ctx.exit(3);

        assert_eq!(ctx.env_get("A"), Some("1"));
        let (stdout, stderr, effects) = ctx.into_parts();
        assert_eq!(stdout, "out");
        assert_eq!(stderr, "err");
        assert_eq!(
            effects,
            vec![
                ShellEffect::SetEnv("A".to_string(), "1".to_string()),
                ShellEffect::Exit(3)
            ]
        );
    }
}
