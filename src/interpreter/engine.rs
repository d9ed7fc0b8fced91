//! Execution Engine
//!
//! Tree-walking evaluator over the parsed program:
//!
//! execute_program -> execute_command_list -> execute_pipeline -> execute_command
//!
//! Output is captured into string buffers and accumulated up the tree;
//! pipelines stage each command's stdout into the state's pipe buffer as
//! the next command's stdin. Command handlers are async and awaited
//! sequentially.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::ast::types::{
    AndOrList, AndOrOp, CaseCommand, Command, CommandList, ForCommand, IfCommand, LoopCommand,
    Pipeline, Program, RedirectOp, SimpleCommand,
};
use crate::commands::args::parse_args;
use crate::commands::registry::CommandRegistry;
use crate::commands::types::{CommandContext, ShellEffect};
use crate::fs::FileSystem;
use crate::interpreter::pattern::glob_match;
use crate::interpreter::state::{ExecResult, ExecutionLimits, ShellState};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The evaluator. Borrows the registry and limits from the shell; state is
/// threaded through every call.
pub struct ExecutionEngine<'a> {
    pub limits: &'a ExecutionLimits,
    pub fs: Arc<dyn FileSystem>,
    pub registry: &'a CommandRegistry,
    pub shell_name: &'a str,
}

/// A redirect whose target word has been expanded.
struct PreparedRedirect {
    io_number: i32,
    op: RedirectOp,
    target: String,
}

impl<'a> ExecutionEngine<'a> {
    /// Execute a complete program; the exit code is the last list's.
    pub fn execute_program<'b>(
        &'b self,
        state: &'b mut ShellState,
        program: &'b Program,
    ) -> BoxFuture<'b, ExecResult> {
        Box::pin(async move {
            let mut result = ExecResult::ok();
            for list in &program.commands {
                if !state.running {
                    break;
                }
                let child = self.execute_command_list(state, list).await;
                result.absorb(child);
            }
            result
        })
    }

    /// A sequence of lists, as found in compound-command bodies.
    async fn execute_body(&self, state: &mut ShellState, lists: &[CommandList]) -> ExecResult {
        let mut result = ExecResult::ok();
        for list in lists {
            if !state.running {
                break;
            }
            let child = self.execute_command_list(state, list).await;
            result.absorb(child);
        }
        result
    }

    /// `&` is recorded by the parser but execution stays synchronous.
    async fn execute_command_list(
        &self,
        state: &mut ShellState,
        list: &CommandList,
    ) -> ExecResult {
        self.execute_and_or(state, &list.list).await
    }

    async fn execute_and_or(&self, state: &mut ShellState, list: &AndOrList) -> ExecResult {
        let mut result = ExecResult::ok();
        let first = self.execute_pipeline(state, &list.first).await;
        let mut exit_code = result.absorb(first);
        state.last_exit_code = exit_code;

        for item in &list.rest {
            if !state.running {
                break;
            }
            let skip = match item.op {
                AndOrOp::And => exit_code != 0,
                AndOrOp::Or => exit_code == 0,
            };
            if skip {
                continue;
            }
            let child = self.execute_pipeline(state, &item.pipeline).await;
            exit_code = result.absorb(child);
            state.last_exit_code = exit_code;
        }

        result
    }

    /// Stage stdout through the pipe buffer; stderr passes through from
    /// every stage. The pipeline's exit code is the last command's.
    async fn execute_pipeline(&self, state: &mut ShellState, pipeline: &Pipeline) -> ExecResult {
        let mut stderr = String::new();
        let mut stdout = String::new();
        let mut exit_code = 0;

        for (i, command) in pipeline.commands.iter().enumerate() {
            if i > 0 {
                state.pipe_buffer = std::mem::take(&mut stdout);
            }
            let child = self.execute_command(state, command).await;
            stdout = child.stdout;
            stderr.push_str(&child.stderr);
            exit_code = child.exit_code;
        }
        state.pipe_buffer.clear();

        if pipeline.negation {
            exit_code = if exit_code == 0 { 1 } else { 0 };
        }

        ExecResult::new(stdout, stderr, exit_code)
    }

    fn execute_command<'b>(
        &'b self,
        state: &'b mut ShellState,
        command: &'b Command,
    ) -> BoxFuture<'b, ExecResult> {
        Box::pin(async move {
            state.command_count += 1;
            if state.command_count > self.limits.max_commands {
                state.running = false;
                return ExecResult::new(
                    String::new(),
                    format!(
                        "{}: maximum command count ({}) exceeded\n",
                        self.shell_name, self.limits.max_commands
                    ),
                    126,
                );
            }

            match command {
                Command::Simple(simple) => self.execute_simple(state, simple).await,
                Command::BraceGroup(group) => self.execute_body(state, &group.body).await,
                Command::Subshell(subshell) => {
                    // Env and cwd mutations must not escape the body.
                    let saved_env = state.env.clone();
                    let saved_cwd = state.cwd.clone();
                    let result = self.execute_body(state, &subshell.body).await;
                    state.env = saved_env;
                    state.cwd = saved_cwd;
                    result
                }
                Command::If(node) => self.execute_if(state, node).await,
                Command::For(node) => self.execute_for(state, node).await,
                Command::Loop(node) => self.execute_loop(state, node).await,
                Command::Case(node) => self.execute_case(state, node).await,
                Command::Function(def) => {
                    state
                        .functions
                        .insert(def.name.clone(), (*def.body).clone());
                    ExecResult::ok()
                }
            }
        })
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    async fn execute_if(&self, state: &mut ShellState, node: &IfCommand) -> ExecResult {
        let mut result = ExecResult::ok();
        let condition = self.execute_body(state, &node.condition).await;
        let code = result.absorb(condition);

        let branch = if code == 0 {
            Some(&node.body)
        } else {
            node.else_clause.as_ref()
        };

        match branch {
            Some(body) => {
                let child = self.execute_body(state, body).await;
                result.absorb(child);
            }
            None => result.exit_code = 0,
        }
        result
    }

    async fn execute_for(&self, state: &mut ShellState, node: &ForCommand) -> ExecResult {
        let mut result = ExecResult::ok();

        let mut values = Vec::new();
        for word in &node.words {
            let expanded = self.expand_word(state, word).await;
            result.stderr.push_str(&expanded.stderr);
            values.push(expanded.value);
        }

        result.exit_code = 0;
        for (iteration, value) in values.into_iter().enumerate() {
            if !state.running {
                break;
            }
            if iteration as u64 >= self.limits.max_loop_iterations {
                return self.loop_limit_breached(state, result);
            }
            state.set_env(&node.name, &value);
            let child = self.execute_body(state, &node.body).await;
            result.absorb(child);
        }

        result
    }

    async fn execute_loop(&self, state: &mut ShellState, node: &LoopCommand) -> ExecResult {
        let mut result = ExecResult::ok();
        result.exit_code = 0;
        let mut iterations: u64 = 0;

        loop {
            if !state.running {
                break;
            }
            if iterations >= self.limits.max_loop_iterations {
                return self.loop_limit_breached(state, result);
            }
            iterations += 1;

            let condition = self.execute_body(state, &node.condition).await;
            let code = {
                result.stdout.push_str(&condition.stdout);
                result.stderr.push_str(&condition.stderr);
                condition.exit_code
            };
            let proceed = if node.is_until { code != 0 } else { code == 0 };
            if !proceed {
                break;
            }

            let child = self.execute_body(state, &node.body).await;
            result.absorb(child);
        }

        result
    }

    async fn execute_case(&self, state: &mut ShellState, node: &CaseCommand) -> ExecResult {
        let mut result = ExecResult::ok();
        let word = self.expand_word(state, &node.word).await;
        result.stderr.push_str(&word.stderr);

        for item in &node.items {
            for pattern in &item.patterns {
                let expanded = self.expand_word(state, pattern).await;
                result.stderr.push_str(&expanded.stderr);
                if glob_match(&expanded.value, &word.value) {
                    let child = self.execute_body(state, &item.body).await;
                    result.absorb(child);
                    return result;
                }
            }
        }

        result.exit_code = 0;
        result
    }

    fn loop_limit_breached(&self, state: &mut ShellState, mut result: ExecResult) -> ExecResult {
        state.running = false;
        result.stderr.push_str(&format!(
            "{}: maximum loop iterations ({}) exceeded\n",
            self.shell_name, self.limits.max_loop_iterations
        ));
        result.exit_code = 126;
        result
    }

    // =========================================================================
    // Simple commands
    // =========================================================================

    async fn execute_simple(&self, state: &mut ShellState, cmd: &SimpleCommand) -> ExecResult {
        let mut out = ExecResult::ok();

        // 1. Expand redirect targets and wire up the input side.
        let mut prepared = Vec::with_capacity(cmd.redirects.len());
        for redirect in &cmd.redirects {
            let expanded = self.expand_word(state, &redirect.name).await;
            out.stderr.push_str(&expanded.stderr);
            prepared.push(PreparedRedirect {
                io_number: redirect.io_number,
                op: redirect.op,
                target: expanded.value,
            });
        }

        for redirect in prepared.iter().filter(|r| r.op == RedirectOp::Less) {
            let path = self.fs.resolve_path(&state.cwd, &redirect.target);
            match self.fs.read_file(&path).await {
                Ok(contents) => state.pipe_buffer = contents,
                Err(_) => {
                    out.stderr.push_str(&format!(
                        "{}: {}: No such file or directory\n",
                        self.shell_name, redirect.target
                    ));
                    out.exit_code = 1;
                    return out;
                }
            }
        }

        // 2. Assignments; their effects are visible to the command.
        let mut expansion_failed = false;
        let mut assignments = Vec::with_capacity(cmd.assignments.len());
        for assignment in &cmd.assignments {
            let expanded = self.expand_word(state, &assignment.value).await;
            out.stderr.push_str(&expanded.stderr);
            expansion_failed |= expanded.failed;
            assignments.push((assignment.name.clone(), expanded.value));
        }
        if expansion_failed {
            out.exit_code = 1;
            return self.commit_redirects(state, out, &prepared).await;
        }
        for (name, value) in assignments {
            state.set_env(&name, &value);
        }

        let name_word = match &cmd.name {
            Some(word) => word,
            None => {
                out.exit_code = 0;
                return self.commit_redirects(state, out, &prepared).await;
            }
        };

        // 3. Command name, then arguments.
        let name_expanded = self.expand_word(state, name_word).await;
        out.stderr.push_str(&name_expanded.stderr);
        expansion_failed |= name_expanded.failed;
        let name = name_expanded.value;

        let mut argv = Vec::with_capacity(cmd.args.len());
        for arg in &cmd.args {
            let expanded = self.expand_word(state, arg).await;
            out.stderr.push_str(&expanded.stderr);
            expansion_failed |= expanded.failed;
            argv.push(expanded.value);
        }

        if expansion_failed {
            out.exit_code = 1;
            return self.commit_redirects(state, out, &prepared).await;
        }
        if name.is_empty() {
            out.exit_code = 0;
            return self.commit_redirects(state, out, &prepared).await;
        }

        // 4. Alias resolution: one textual pass, then re-parse and re-run.
        if state.alias_depth == 0 {
            if let Some(alias_value) = state.aliases.get(&name).cloned() {
                let mut source = alias_value;
                for arg in &argv {
                    source.push(' ');
                    source.push_str(arg);
                }
                match crate::parser::parse(&source) {
                    Ok(program) => {
                        state.alias_depth += 1;
                        let child = self.execute_program(state, &program).await;
                        state.alias_depth -= 1;
                        out.absorb(child);
                    }
                    Err(err) => {
                        out.stderr
                            .push_str(&format!("{}: {}\n", self.shell_name, err));
                        out.exit_code = 2;
                    }
                }
                return self.commit_redirects(state, out, &prepared).await;
            }
        }

        // 5. User functions.
        if let Some(body) = state.functions.get(&name).cloned() {
            let child = self.execute_command(state, &body).await;
            out.absorb(child);
            return self.commit_redirects(state, out, &prepared).await;
        }

        // 6. Registry lookup.
        let command = match self.registry.get(&name) {
            Some(command) => command,
            None => {
                state.pipe_buffer.clear();
                out.stderr.push_str(&format!(
                    "{}: {}: command not found\n",
                    self.shell_name, name
                ));
                out.exit_code = 127;
                return self.commit_redirects(state, out, &prepared).await;
            }
        };

        // 7. Schema parsing, then the handler.
        let parsed = match parse_args(command.params(), &argv) {
            Ok(parsed) => parsed,
            Err(err) => {
                state.pipe_buffer.clear();
                out.stderr.push_str(&format!("{}: {}\n", name, err));
                out.exit_code = 2;
                return self.commit_redirects(state, out, &prepared).await;
            }
        };

        let mut ctx = CommandContext::new(
            std::mem::take(&mut state.pipe_buffer),
            state.cwd.clone(),
            state.env.clone(),
            state.aliases.clone(),
            state.last_exit_code,
            self.shell_name.to_string(),
            self.fs.clone(),
            self.registry.list(),
        );

        let outcome = command.execute(parsed, &mut ctx).await;
        let (stdout, stderr, effects) = ctx.into_parts();
        out.stdout.push_str(&stdout);
        out.stderr.push_str(&stderr);
        out.exit_code = match outcome {
            Ok(code) => code,
            Err(err) => {
                out.stderr.push_str(&format!("{}: {}\n", name, err));
                1
            }
        };

        for effect in effects {
            match effect {
                ShellEffect::SetEnv(key, value) => state.set_env(&key, &value),
                ShellEffect::UnsetEnv(key) => state.unset_env(&key),
                ShellEffect::SetCwd(path) => state.set_cwd(&path),
                ShellEffect::SetAlias(key, value) => {
                    state.aliases.insert(key, value);
                }
                ShellEffect::UnsetAlias(key) => {
                    state.aliases.shift_remove(&key);
                }
                ShellEffect::Exit(code) => state.request_exit(code),
            }
        }

        // 8. Commit output redirections.
        self.commit_redirects(state, out, &prepared).await
    }

    /// Apply `>&` rebinding, then write captured buffers to file targets.
    /// When several redirects aim at the same stream, the last one receives
    /// the content and the earlier ones just create or truncate.
    async fn commit_redirects(
        &self,
        state: &mut ShellState,
        mut out: ExecResult,
        prepared: &[PreparedRedirect],
    ) -> ExecResult {
        for redirect in prepared.iter().filter(|r| r.op == RedirectOp::GreatAnd) {
            match redirect.target.as_str() {
                "2" => {
                    let stdout = std::mem::take(&mut out.stdout);
                    out.stderr.push_str(&stdout);
                }
                _ => {} // "1" and anything else leave the binding alone
            }
        }

        let is_stderr = |r: &PreparedRedirect| r.io_number == 2;
        let last_stdout = prepared
            .iter()
            .rposition(|r| r.op.is_output_file() && !is_stderr(r));
        let last_stderr = prepared
            .iter()
            .rposition(|r| r.op.is_output_file() && is_stderr(r));

        for (index, redirect) in prepared.iter().enumerate() {
            if !redirect.op.is_output_file() {
                continue;
            }
            let (content, is_last) = if is_stderr(redirect) {
                (out.stderr.clone(), Some(index) == last_stderr)
            } else {
                (out.stdout.clone(), Some(index) == last_stdout)
            };
            let data = if is_last { content } else { String::new() };

            let path = self.fs.resolve_path(&state.cwd, &redirect.target);
            let write = match redirect.op {
                RedirectOp::DGreat => self.fs.append_file(&path, &data).await,
                _ => self.fs.write_file(&path, &data).await,
            };
            if let Err(err) = write {
                out.stderr.push_str(&format!(
                    "{}: {}: {}\n",
                    self.shell_name, redirect.target, err.reason()
                ));
                out.exit_code = 1;
                return out;
            }
        }

        if last_stdout.is_some() {
            out.stdout.clear();
        }
        if last_stderr.is_some() {
            out.stderr.clear();
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::default_registry;
    use crate::fs::{MemFs, MkdirOptions};
    use crate::parser::parse;

    async fn setup() -> (Arc<MemFs>, CommandRegistry, ExecutionLimits, ShellState) {
        let fs = Arc::new(MemFs::new());
        fs.mkdir("/home/user", &MkdirOptions { recursive: true })
            .await
            .unwrap();
        let registry = default_registry();
        let limits = ExecutionLimits::default();

        let mut state = ShellState::default();
        state.cwd = "/home/user".to_string();
        state.set_env("HOME", "/home/user");
        state.set_env("PWD", "/home/user");
        (fs, registry, limits, state)
    }

    async fn run_in(
        fs: &Arc<MemFs>,
        registry: &CommandRegistry,
        limits: &ExecutionLimits,
        state: &mut ShellState,
        script: &str,
    ) -> ExecResult {
        let fs: Arc<dyn FileSystem> = fs.clone();
        let engine = ExecutionEngine {
            limits,
            fs,
            registry,
            shell_name: "mrsh",
        };
        let program = parse(script).unwrap();
        engine.execute_program(state, &program).await
    }

    async fn run(script: &str) -> ExecResult {
        let (fs, registry, limits, mut state) = setup().await;
        run_in(&fs, &registry, &limits, &mut state, script).await
    }

    #[tokio::test]
    async fn test_echo() {
        let result = run("echo hello world").await;
        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_and_or_short_circuit() {
        assert_eq!(run("true && echo yes").await.stdout, "yes\n");
        assert_eq!(run("false && echo no").await.stdout, "");
        assert_eq!(run("true || echo no").await.stdout, "");
        assert_eq!(run("false || echo yes").await.stdout, "yes\n");
    }

    #[tokio::test]
    async fn test_negation() {
        assert_eq!(run("! false").await.exit_code, 0);
        assert_eq!(run("! true").await.exit_code, 1);
        assert_eq!(run("! echo hi").await.exit_code, 1);
    }

    #[tokio::test]
    async fn test_pipeline_stages_stdout() {
        let result = run("echo hello | cat").await;
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_pipeline_exit_code_is_last() {
        assert_eq!(run("false | true").await.exit_code, 0);
        assert_eq!(run("true | false").await.exit_code, 1);
    }

    #[tokio::test]
    async fn test_command_not_found() {
        let result = run("definitely_missing").await;
        assert_eq!(result.exit_code, 127);
        assert!(result
            .stderr
            .contains("mrsh: definitely_missing: command not found"));
    }

    #[tokio::test]
    async fn test_variable_assignment_and_expansion() {
        let result = run("X=hi; echo $X").await;
        assert_eq!(result.stdout, "hi\n");
    }

    #[tokio::test]
    async fn test_assignment_visible_to_command() {
        let result = run("GREETING=hello echo $GREETING").await;
        // The assignment is committed before the name and args expand.
        assert_eq!(result.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_if_branches() {
        assert_eq!(run("if true; then echo a; else echo b; fi").await.stdout, "a\n");
        assert_eq!(run("if false; then echo a; else echo b; fi").await.stdout, "b\n");
        assert_eq!(run("if false; then echo a; fi").await.exit_code, 0);
    }

    #[tokio::test]
    async fn test_elif() {
        let script = "X=2; if test $X -eq 1; then echo one; elif test $X -eq 2; then echo two; else echo other; fi";
        assert_eq!(run(script).await.stdout, "two\n");
    }

    #[tokio::test]
    async fn test_for_loop() {
        let (fs, registry, limits, mut state) = setup().await;
        let result = run_in(&fs, &registry, &limits, &mut state, "for i in a b c; do echo $i; done").await;
        assert_eq!(result.stdout, "a\nb\nc\n");
        assert_eq!(result.exit_code, 0);
        // The loop variable stays set to the last value.
        assert_eq!(state.get_env("i"), Some("c"));
    }

    #[tokio::test]
    async fn test_for_empty_list() {
        assert_eq!(run("for i in; do echo $i; done").await.exit_code, 0);
        assert_eq!(run("for i; do echo $i; done").await.stdout, "");
    }

    #[tokio::test]
    async fn test_while_loop_counts() {
        let script = "X=0; while test $X -lt 3; do echo $X; X=$(($X + 1)); done";
        let result = run(script).await;
        assert_eq!(result.stdout, "0\n1\n2\n");
    }

    #[tokio::test]
    async fn test_until_loop() {
        let script = "X=0; until test $X -ge 2; do echo $X; X=$(($X + 1)); done";
        assert_eq!(run(script).await.stdout, "0\n1\n");
    }

    #[tokio::test]
    async fn test_case_first_match_wins() {
        let script = "case hello in h*) echo glob ;; hello) echo exact ;; esac";
        assert_eq!(run(script).await.stdout, "glob\n");
    }

    #[tokio::test]
    async fn test_case_no_match_is_zero() {
        let result = run("case x in a) echo a ;; b) echo b ;; esac").await;
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_subshell_isolation() {
        let (fs, registry, limits, mut state) = setup().await;
        state.set_env("X", "outer");
        let result = run_in(
            &fs,
            &registry,
            &limits,
            &mut state,
            "(X=inner; cd /; echo $X); echo $X",
        )
        .await;
        assert_eq!(result.stdout, "inner\nouter\n");
        assert_eq!(state.cwd, "/home/user");
        assert_eq!(state.get_env("X"), Some("outer"));
    }

    #[tokio::test]
    async fn test_brace_group_shares_state() {
        let (fs, registry, limits, mut state) = setup().await;
        run_in(&fs, &registry, &limits, &mut state, "{ X=inner; }").await;
        assert_eq!(state.get_env("X"), Some("inner"));
    }

    #[tokio::test]
    async fn test_output_redirect() {
        let (fs, registry, limits, mut state) = setup().await;
        let result = run_in(&fs, &registry, &limits, &mut state, "echo data > f.txt").await;
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/home/user/f.txt").await.unwrap(), "data\n");
    }

    #[tokio::test]
    async fn test_append_redirect() {
        let (fs, registry, limits, mut state) = setup().await;
        run_in(&fs, &registry, &limits, &mut state, "echo one > f; echo two >> f").await;
        assert_eq!(fs.read_file("/home/user/f").await.unwrap(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_input_redirect() {
        let (fs, registry, limits, mut state) = setup().await;
        fs.write_file("/home/user/in.txt", "contents\n").await.unwrap();
        let result = run_in(&fs, &registry, &limits, &mut state, "cat < in.txt").await;
        assert_eq!(result.stdout, "contents\n");
    }

    #[tokio::test]
    async fn test_input_redirect_missing_file() {
        let result = run("cat < missing.txt").await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("mrsh: missing.txt: No such file or directory"));
    }

    #[tokio::test]
    async fn test_stderr_file_redirect() {
        let (fs, registry, limits, mut state) = setup().await;
        let result = run_in(&fs, &registry, &limits, &mut state, "nope_cmd 2> err.txt").await;
        assert_eq!(result.exit_code, 127);
        assert_eq!(result.stderr, "");
        assert!(fs
            .read_file("/home/user/err.txt")
            .await
            .unwrap()
            .contains("command not found"));
    }

    #[tokio::test]
    async fn test_dup_stdout_to_stderr() {
        let result = run("echo oops >&2").await;
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_assignment_only_with_redirect_creates_file() {
        let (fs, registry, limits, mut state) = setup().await;
        run_in(&fs, &registry, &limits, &mut state, "X=1 > marker").await;
        assert_eq!(fs.read_file("/home/user/marker").await.unwrap(), "");
        assert_eq!(state.get_env("X"), Some("1"));
    }

    #[tokio::test]
    async fn test_failed_assignment_still_commits_redirects() {
        let (fs, registry, limits, mut state) = setup().await;
        let result = run_in(
            &fs,
            &registry,
            &limits,
            &mut state,
            "X=${Y:?boom} > marker",
        )
        .await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("Y: boom"));
        // The redirect target is created even though the command never ran.
        assert_eq!(fs.read_file("/home/user/marker").await.unwrap(), "");
        assert_eq!(state.get_env("X"), None);
    }

    #[tokio::test]
    async fn test_command_substitution() {
        let result = run("echo $(echo inner)").await;
        assert_eq!(result.stdout, "inner\n");
    }

    #[tokio::test]
    async fn test_backquote_substitution() {
        let result = run("echo `echo old`").await;
        assert_eq!(result.stdout, "old\n");
    }

    #[tokio::test]
    async fn test_arithmetic_expansion() {
        assert_eq!(run("echo $((2 + 3 * 4))").await.stdout, "14\n");
        assert_eq!(run("X=5; echo $(($X * 2))").await.stdout, "10\n");
        assert_eq!(run("echo $((1 / 0))").await.stdout, "0\n");
    }

    #[tokio::test]
    async fn test_alias_expansion() {
        let (fs, registry, limits, mut state) = setup().await;
        state
            .aliases
            .insert("greet".to_string(), "echo hello".to_string());
        let result = run_in(&fs, &registry, &limits, &mut state, "greet world").await;
        assert_eq!(result.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn test_alias_does_not_recurse() {
        let (fs, registry, limits, mut state) = setup().await;
        // An alias that names itself must expand exactly once and then fall
        // through to command lookup.
        state
            .aliases
            .insert("selfy".to_string(), "selfy".to_string());
        let result = run_in(&fs, &registry, &limits, &mut state, "selfy").await;
        assert_eq!(result.exit_code, 127);
    }

    #[tokio::test]
    async fn test_function_definition_and_call() {
        let script = "greet() { echo hi $NAME; }\nNAME=world; greet";
        let result = run(script).await;
        assert_eq!(result.stdout, "hi world\n");
    }

    #[tokio::test]
    async fn test_exit_stops_execution() {
        let (fs, registry, limits, mut state) = setup().await;
        let result = run_in(
            &fs,
            &registry,
            &limits,
            &mut state,
            "echo before; exit 3; echo after",
        )
        .await;
        assert_eq!(result.stdout, "before\n");
        assert_eq!(result.exit_code, 3);
        assert!(!state.running);
        assert!(state.exit_requested);
    }

    #[tokio::test]
    async fn test_exit_inside_loop_stops_loop() {
        let result = run("while true; do echo x; exit 7; done; echo after").await;
        assert_eq!(result.stdout, "x\n");
        assert_eq!(result.exit_code, 7);
    }

    #[tokio::test]
    async fn test_loop_limit() {
        let fs = Arc::new(MemFs::new());
        let registry = default_registry();
        let limits = ExecutionLimits {
            max_loop_iterations: 10,
            ..Default::default()
        };
        let mut state = ShellState::default();
        let result = run_in(&fs, &registry, &limits, &mut state, "while true; do true; done").await;
        assert_eq!(result.exit_code, 126);
        assert!(result.stderr.contains("maximum loop iterations"));
    }

    #[tokio::test]
    async fn test_command_limit() {
        let fs = Arc::new(MemFs::new());
        let registry = default_registry();
        let limits = ExecutionLimits {
            max_commands: 5,
            max_loop_iterations: 1_000,
        };
        let mut state = ShellState::default();
        let result = run_in(
            &fs,
            &registry,
            &limits,
            &mut state,
            "true; true; true; true; true; true",
        )
        .await;
        assert_eq!(result.exit_code, 126);
        assert!(result.stderr.contains("maximum command count"));
    }

    #[tokio::test]
    async fn test_qmark_expansion_blocks_command() {
        let result = run("echo ${MISSING:?not set}").await;
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("MISSING: not set"));
    }

    #[tokio::test]
    async fn test_expansion_defaults() {
        assert_eq!(run("echo ${X:-fallback}").await.stdout, "fallback\n");
        assert_eq!(run("X=v; echo ${X:-fallback}").await.stdout, "v\n");
        assert_eq!(run("X=; echo ${X:-fallback}").await.stdout, "fallback\n");
        // Without the colon, an empty-but-set variable wins.
        assert_eq!(run("X=; echo ${X-fallback}").await.stdout, "\n");
    }

    #[tokio::test]
    async fn test_assign_default_persists() {
        let result = run("echo ${X:=d}; echo $X").await;
        assert_eq!(result.stdout, "d\nd\n");
    }

    #[tokio::test]
    async fn test_plus_alternative() {
        assert_eq!(run("X=v; echo ${X:+alt}").await.stdout, "alt\n");
        assert_eq!(run("echo ${X:+alt}").await.stdout, "\n");
    }

    #[tokio::test]
    async fn test_length_expansion() {
        assert_eq!(run("X=hello; echo ${#X}").await.stdout, "5\n");
        assert_eq!(run("echo ${#UNSET}").await.stdout, "0\n");
    }

    #[tokio::test]
    async fn test_pattern_strip_expansions() {
        assert_eq!(run("X=a.b.c; echo ${X%.*}").await.stdout, "a.b\n");
        assert_eq!(run("X=a.b.c; echo ${X%%.*}").await.stdout, "a\n");
        assert_eq!(run("X=a.b.c; echo ${X#*.}").await.stdout, "b.c\n");
        assert_eq!(run("X=a.b.c; echo ${X##*.}").await.stdout, "c\n");
    }

    #[tokio::test]
    async fn test_special_parameters() {
        assert_eq!(run("false; echo $?").await.stdout, "1\n");
        assert_eq!(run("true; echo $?").await.stdout, "0\n");
        assert_eq!(run("echo $0").await.stdout, "mrsh\n");
        assert_eq!(run("echo $#").await.stdout, "0\n");
    }

    #[tokio::test]
    async fn test_single_quotes_suppress_expansion() {
        let result = run("X=v; echo '$X'").await;
        assert_eq!(result.stdout, "$X\n");
    }

    #[tokio::test]
    async fn test_double_quotes_expand() {
        let result = run(r#"X=v; echo "value: $X""#).await;
        assert_eq!(result.stdout, "value: v\n");
    }

    #[tokio::test]
    async fn test_determinism_rerun_same_exit() {
        let script = "X=1; if test $X -eq 1; then echo yes; fi";
        let first = run(script).await;
        let second = run(script).await;
        assert_eq!(first, second);
    }
}
