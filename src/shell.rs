//! Shell Facade
//!
//! Ties the parser, evaluator, registry, and filesystem together behind the
//! surface a host embeds: construct once, `execute` scripts against it, and
//! poke at env, cwd, aliases, functions, and the registry in between.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::types::Command as AstCommand;
use crate::commands::types::Command;
use crate::commands::{default_registry, CommandRegistry, CommandSummary};
use crate::fs::{normalize_path, FileSystem, MemFs, MkdirOptions};
use crate::interpreter::engine::ExecutionEngine;
use crate::interpreter::prompt::expand_prompt;
use crate::interpreter::state::{ExecResult, ExecutionLimits, ShellState};
use crate::parser::{parse, ParseException};

/// Options for creating a shell.
#[derive(Default)]
pub struct ShellOptions {
    /// Seed environment variables.
    pub env: Option<HashMap<String, String>>,
    /// Working directory. When omitted the sandbox gets the default layout.
    pub cwd: Option<String>,
    /// Filesystem capability (defaults to an in-memory sandbox).
    pub fs: Option<Arc<dyn FileSystem>>,
    pub limits: Option<ExecutionLimits>,
    /// Program name used in diagnostics.
    pub shell_name: Option<String>,
}

/// An embeddable shell instance.
pub struct Shell {
    pub fs: Arc<dyn FileSystem>,
    registry: CommandRegistry,
    state: ShellState,
    limits: ExecutionLimits,
    shell_name: String,
}

impl Shell {
    pub async fn new(options: ShellOptions) -> Self {
        let use_default_layout = options.cwd.is_none();
        let cwd = normalize_path(&options.cwd.unwrap_or_else(|| "/home/user".to_string()));
        let fs: Arc<dyn FileSystem> = options.fs.unwrap_or_else(|| Arc::new(MemFs::new()));
        let limits = options.limits.unwrap_or_default();
        let shell_name = options.shell_name.unwrap_or_else(|| "mrsh".to_string());

        let mut state = ShellState {
            cwd: cwd.clone(),
            ..Default::default()
        };
        state.set_env("HOME", "/home/user");
        state.set_env("PATH", "/bin:/usr/bin");
        state.set_env("PWD", &cwd);
        state.set_env("PS1", "$ ");
        if let Some(env) = options.env {
            for (name, value) in env {
                state.set_env(&name, &value);
            }
        }

        init_filesystem(fs.as_ref(), use_default_layout).await;
        let _ = fs.mkdir(&cwd, &MkdirOptions { recursive: true }).await;

        Self {
            fs,
            registry: default_registry(),
            state,
            limits,
            shell_name,
        }
    }

    /// Parse and run a script. Parse errors surface on stderr with exit 2;
    /// otherwise the result carries the last command list's exit code.
    pub async fn execute(&mut self, source: &str) -> ExecResult {
        if !self.state.running {
            return ExecResult::code(self.state.last_exit_code);
        }

        let program = match parse(source) {
            Ok(program) => program,
            Err(err) => {
                self.state.last_exit_code = 2;
                return ExecResult::new(
                    String::new(),
                    format!("{}: {}\n", self.shell_name, err),
                    2,
                );
            }
        };

        self.state.command_count = 0;
        let engine = ExecutionEngine {
            limits: &self.limits,
            fs: self.fs.clone(),
            registry: &self.registry,
            shell_name: &self.shell_name,
        };
        let result = engine.execute_program(&mut self.state, &program).await;
        self.state.last_exit_code = result.exit_code;

        // A limit breach unwinds through the running flag but does not shut
        // the shell down the way `exit` does.
        if !self.state.running && !self.state.exit_requested {
            self.state.running = true;
        }

        result
    }

    /// PS1 with prompt escapes expanded.
    pub fn get_prompt(&self) -> String {
        let ps1 = self.state.get_env("PS1").unwrap_or("$ ").to_string();
        expand_prompt(&self.state, &ps1)
    }

    pub fn get_cwd(&self) -> &str {
        &self.state.cwd
    }

    pub fn set_cwd(&mut self, path: &str) {
        self.state.set_cwd(path);
    }

    pub fn get_env(&self, name: &str) -> Option<&str> {
        self.state.get_env(name)
    }

    pub fn set_env(&mut self, name: &str, value: &str) {
        self.state.set_env(name, value);
    }

    pub fn unset_env(&mut self, name: &str) {
        self.state.unset_env(name);
    }

    pub fn get_last_exit_code(&self) -> i32 {
        self.state.last_exit_code
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Host-initiated shutdown, equivalent to the `exit` command.
    pub fn exit(&mut self, code: i32) {
        self.state.request_exit(code);
    }

    // =========================================================================
    // Registry surface
    // =========================================================================

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.registry.register(command);
    }

    pub fn get_command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.registry.get(name)
    }

    pub fn list_commands(&self) -> Vec<CommandSummary> {
        self.registry.list()
    }

    pub fn list_visible_commands(&self) -> Vec<CommandSummary> {
        self.registry.list_visible()
    }

    // =========================================================================
    // Aliases & functions
    // =========================================================================

    pub fn set_alias(&mut self, name: &str, value: &str) {
        self.state
            .aliases
            .insert(name.to_string(), value.to_string());
    }

    pub fn unset_alias(&mut self, name: &str) {
        self.state.aliases.shift_remove(name);
    }

    /// Install a function from source text; the body is the first command
    /// of the parsed script.
    pub fn define_function(&mut self, name: &str, body: &str) -> Result<(), ParseException> {
        let program = parse(body)?;
        let command: Option<AstCommand> = program
            .commands
            .into_iter()
            .next()
            .and_then(|list| list.list.first.commands.into_iter().next());
        match command {
            Some(command) => {
                self.state.functions.insert(name.to_string(), command);
                Ok(())
            }
            None => Err(ParseException::new("empty function body", 1, 1)),
        }
    }
}

/// Seed the sandbox with the standard directory layout.
async fn init_filesystem(fs: &dyn FileSystem, use_default_layout: bool) {
    let recursive = MkdirOptions { recursive: true };
    let _ = fs.mkdir("/bin", &recursive).await;
    let _ = fs.mkdir("/usr/bin", &recursive).await;
    if use_default_layout {
        let _ = fs.mkdir("/home/user", &recursive).await;
        let _ = fs.mkdir("/tmp", &recursive).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// A shell configured like the documented end-to-end environment: empty
    /// filesystem with /home/user, USER=u, HOSTNAME=h, cwd /home/user.
    async fn scenario_shell() -> Shell {
        let mut env = HashMap::new();
        env.insert("USER".to_string(), "u".to_string());
        env.insert("HOSTNAME".to_string(), "h".to_string());
        Shell::new(ShellOptions {
            env: Some(env),
            ..Default::default()
        })
        .await
    }

    #[tokio::test]
    async fn test_defaults() {
        let shell = scenario_shell().await;
        assert_eq!(shell.get_cwd(), "/home/user");
        assert_eq!(shell.get_env("HOME"), Some("/home/user"));
        assert_eq!(shell.get_env("PATH"), Some("/bin:/usr/bin"));
        assert_eq!(shell.get_env("PS1"), Some("$ "));
        assert!(shell.is_running());
    }

    #[tokio::test]
    async fn test_scenario_echo() {
        let mut shell = scenario_shell().await;
        let result = shell.execute("echo hello world").await;
        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_scenario_redirect_then_cat() {
        let mut shell = scenario_shell().await;
        let result = shell.execute("echo a > f.txt && cat f.txt").await;
        assert_eq!(result.stdout, "a\n");
        assert_eq!(result.exit_code, 0);
        assert_eq!(
            shell.fs.read_file("/home/user/f.txt").await.unwrap(),
            "a\n"
        );
    }

    #[tokio::test]
    async fn test_scenario_pipe_to_wc() {
        let mut shell = scenario_shell().await;
        let result = shell.execute(r#"echo "line1\nline2" | wc -l"#).await;
        // The backslash-n is not expanded, so there is a single line.
        assert_eq!(result.stdout, "       1\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_scenario_if_test() {
        let mut shell = scenario_shell().await;
        let result = shell
            .execute("X=1; if test $X -eq 1; then echo yes; else echo no; fi")
            .await;
        assert_eq!(result.stdout, "yes\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_scenario_for_loop() {
        let mut shell = scenario_shell().await;
        let result = shell.execute("for i in a b c; do echo $i; done").await;
        assert_eq!(result.stdout, "a\nb\nc\n");
        assert_eq!(result.exit_code, 0);
        assert_eq!(shell.get_env("i"), Some("c"));
    }

    #[tokio::test]
    async fn test_scenario_subshell_cd() {
        let mut shell = scenario_shell().await;
        let result = shell
            .execute("mkdir -p a/b && ( cd a/b && pwd ) && pwd")
            .await;
        assert_eq!(result.stdout, "/home/user/a/b\n/home/user\n");
        assert_eq!(result.exit_code, 0);
        assert_eq!(shell.get_cwd(), "/home/user");
    }

    #[tokio::test]
    async fn test_parse_error_returns_two() {
        let mut shell = scenario_shell().await;
        let result = shell.execute("if then").await;
        assert_eq!(result.exit_code, 2);
        assert!(result.stderr.starts_with("mrsh: "));
        assert_eq!(shell.get_last_exit_code(), 2);
    }

    #[tokio::test]
    async fn test_exit_shuts_shell_down() {
        let mut shell = scenario_shell().await;
        let result = shell.execute("exit 5").await;
        assert_eq!(result.exit_code, 5);
        assert!(!shell.is_running());
        // Further scripts are not executed.
        let result = shell.execute("echo ignored").await;
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 5);
    }

    #[tokio::test]
    async fn test_host_exit() {
        let mut shell = scenario_shell().await;
        shell.exit(9);
        assert!(!shell.is_running());
        assert_eq!(shell.get_last_exit_code(), 9);
    }

    #[tokio::test]
    async fn test_prompt_expansion() {
        let mut shell = scenario_shell().await;
        shell.set_env("PS1", r"\u@\h:\w\$ ");
        assert_eq!(shell.get_prompt(), "u@h:~$ ");

        shell.execute("mkdir -p docs && cd docs").await;
        assert_eq!(shell.get_prompt(), "u@h:~/docs$ ");
    }

    #[tokio::test]
    async fn test_cwd_stays_normalized() {
        let mut shell = scenario_shell().await;
        shell.execute("mkdir -p a/b").await;
        shell.execute("cd a/b && cd ..").await;
        assert_eq!(shell.get_cwd(), "/home/user/a");
        shell.set_cwd("/home/user/a/../../user");
        assert_eq!(shell.get_cwd(), "/home/user");
    }

    #[tokio::test]
    async fn test_cd_dash_uses_oldpwd() {
        let mut shell = scenario_shell().await;
        let result = shell.execute("mkdir -p a; cd a; cd -; pwd").await;
        assert_eq!(result.stdout, "/home/user\n/home/user\n");
    }

    #[tokio::test]
    async fn test_alias_surface() {
        let mut shell = scenario_shell().await;
        shell.set_alias("greet", "echo hi");
        let result = shell.execute("greet there").await;
        assert_eq!(result.stdout, "hi there\n");
        shell.unset_alias("greet");
        let result = shell.execute("greet").await;
        assert_eq!(result.exit_code, 127);
    }

    #[tokio::test]
    async fn test_define_function_surface() {
        let mut shell = scenario_shell().await;
        shell
            .define_function("where", "{ pwd; echo $USER; }")
            .unwrap();
        let result = shell.execute("where").await;
        assert_eq!(result.stdout, "/home/user\nu\n");
    }

    #[tokio::test]
    async fn test_registry_surface() {
        let shell = scenario_shell().await;
        assert!(shell.get_command("echo").is_some());
        assert!(shell.get_command("dir").is_some()); // alias of ls
        let all = shell.list_commands();
        let visible = shell.list_visible_commands();
        assert!(all.len() > visible.len());
        assert!(visible.iter().all(|c| !c.hidden));
    }

    #[tokio::test]
    async fn test_alias_and_env_commands() {
        let mut shell = scenario_shell().await;
        shell.execute("alias ll='ls -a'").await;
        let result = shell.execute("alias").await;
        assert!(result.stdout.contains("alias ll='ls -a'"));

        shell.execute("export NEW=value").await;
        assert_eq!(shell.get_env("NEW"), Some("value"));
        shell.execute("unset NEW").await;
        assert_eq!(shell.get_env("NEW"), None);
    }

    #[tokio::test]
    async fn test_custom_shell_name_in_diagnostics() {
        let mut shell = Shell::new(ShellOptions {
            shell_name: Some("websh".to_string()),
            ..Default::default()
        })
        .await;
        let result = shell.execute("no_such_thing").await;
        assert_eq!(result.stderr, "websh: no_such_thing: command not found\n");
    }

    #[tokio::test]
    async fn test_exit_codes_contract() {
        let mut shell = scenario_shell().await;
        assert_eq!(shell.execute("true").await.exit_code, 0);
        assert_eq!(shell.execute("false").await.exit_code, 1);
        assert_eq!(shell.execute("missing_cmd").await.exit_code, 127);
        assert_eq!(shell.execute("if oops").await.exit_code, 2);
    }

    #[tokio::test]
    async fn test_custom_cwd_skips_default_layout() {
        let shell = Shell::new(ShellOptions {
            cwd: Some("/work".to_string()),
            ..Default::default()
        })
        .await;
        assert_eq!(shell.get_cwd(), "/work");
        assert!(shell.fs.access("/work").await.is_ok());
        assert!(shell.fs.access("/tmp").await.is_err());
    }
}
