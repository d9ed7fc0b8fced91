pub mod alias_cmd;
pub mod args;
pub mod cat;
pub mod cd;
pub mod control;
pub mod echo;
pub mod env_cmd;
pub mod help_cmd;
pub mod ls;
pub mod mkdir;
pub mod pwd;
pub mod registry;
pub mod rm;
pub mod test_cmd;
pub mod touch;
pub mod types;
pub mod wc;

pub use args::{parse_args, ArgError};
pub use registry::CommandRegistry;
pub use types::{
    Command, CommandContext, CommandError, CommandSummary, ParamSpec, ParamType, ParamValue,
    ParsedArgs, ShellEffect,
};

use std::sync::Arc;

/// Registry pre-loaded with the standard command set.
pub fn default_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(echo::EchoCommand));
    registry.register(Arc::new(cat::CatCommand));
    registry.register(Arc::new(pwd::PwdCommand));
    registry.register(Arc::new(cd::CdCommand));
    registry.register(Arc::new(ls::LsCommand));
    registry.register(Arc::new(mkdir::MkdirCommand));
    registry.register(Arc::new(touch::TouchCommand));
    registry.register(Arc::new(rm::RmCommand));
    registry.register(Arc::new(wc::WcCommand));
    registry.register(Arc::new(test_cmd::TestCommand));
    registry.register(Arc::new(test_cmd::BracketCommand));
    registry.register(Arc::new(control::TrueCommand));
    registry.register(Arc::new(control::FalseCommand));
    registry.register(Arc::new(control::ExitCommand));
    registry.register(Arc::new(env_cmd::ExportCommand));
    registry.register(Arc::new(env_cmd::UnsetCommand));
    registry.register(Arc::new(env_cmd::EnvCommand));
    registry.register(Arc::new(alias_cmd::AliasCommand));
    registry.register(Arc::new(alias_cmd::UnaliasCommand));
    registry.register(Arc::new(help_cmd::HelpCommand));
    registry
}
