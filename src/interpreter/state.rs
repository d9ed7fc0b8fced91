//! Shell State
//!
//! The mutable runtime state of one shell instance: environment, working
//! directory, aliases, functions, exit status, and the string pipe buffer
//! that stands in for stdin.

use indexmap::IndexMap;

use crate::ast::types::Command;
use crate::fs::normalize_path;

/// Execution limits so an embedded script cannot spin the host.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Maximum number of commands per `execute()` call.
    pub max_commands: u64,
    /// Maximum iterations of any single loop.
    pub max_loop_iterations: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_commands: 100_000,
            max_loop_iterations: 1_000_000,
        }
    }
}

/// Result of executing a script: captured output plus the exit code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self { stdout, stderr, exit_code }
    }

    pub fn ok() -> Self {
        Self::default()
    }

    pub fn code(exit_code: i32) -> Self {
        Self { exit_code, ..Default::default() }
    }

    /// Merge a child result into this one, keeping the child's exit code.
    pub fn absorb(&mut self, other: ExecResult) -> i32 {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
        self.exit_code = other.exit_code;
        other.exit_code
    }
}

/// Mutable interpreter state, owned by the shell for its whole lifetime.
#[derive(Debug, Clone)]
pub struct ShellState {
    /// Absolute normalized working directory.
    pub cwd: String,
    /// Environment variables, in insertion order.
    pub env: IndexMap<String, String>,
    /// Textual aliases expanded during command resolution.
    pub aliases: IndexMap<String, String>,
    /// User functions, stored by name rather than by node pointer.
    pub functions: IndexMap<String, Command>,
    pub last_exit_code: i32,
    /// Cleared by `exit` (or a limit breach); composite constructs check it
    /// between statements and stop early.
    pub running: bool,
    /// Set only when `exit` was requested, so limit unwinds can be told
    /// apart from a real shutdown.
    pub exit_requested: bool,
    /// String stdin for the next command; pipelines stage stdout here.
    pub pipe_buffer: String,
    /// Commands executed in the current `execute()` call.
    pub command_count: u64,
    /// Depth of in-flight alias re-execution, to bound alias expansion to a
    /// single pass.
    pub alias_depth: u32,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            cwd: "/".to_string(),
            env: IndexMap::new(),
            aliases: IndexMap::new(),
            functions: IndexMap::new(),
            last_exit_code: 0,
            running: true,
            exit_requested: false,
            pipe_buffer: String::new(),
            command_count: 0,
            alias_depth: 0,
        }
    }
}

impl ShellState {
    /// Change directory, keeping `PWD`/`OLDPWD` in sync. The stored cwd is
    /// always absolute and normalized.
    pub fn set_cwd(&mut self, path: &str) {
        let normalized = normalize_path(path);
        let old = std::mem::replace(&mut self.cwd, normalized.clone());
        self.env.insert("OLDPWD".to_string(), old);
        self.env.insert("PWD".to_string(), normalized);
    }

    pub fn get_env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(|s| s.as_str())
    }

    pub fn set_env(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_string(), value.to_string());
    }

    pub fn unset_env(&mut self, name: &str) {
        self.env.shift_remove(name);
    }

    /// Record an exit request and stop the interpreter loops.
    pub fn request_exit(&mut self, code: i32) {
        self.last_exit_code = code;
        self.running = false;
        self.exit_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cwd_normalizes_and_tracks_pwd() {
        let mut state = ShellState::default();
        state.set_cwd("/home/user");
        state.set_cwd("/home/user/../user/docs/");
        assert_eq!(state.cwd, "/home/user/docs");
        assert_eq!(state.get_env("PWD"), Some("/home/user/docs"));
        assert_eq!(state.get_env("OLDPWD"), Some("/home/user"));
    }

    #[test]
    fn test_env_roundtrip() {
        let mut state = ShellState::default();
        state.set_env("A", "1");
        assert_eq!(state.get_env("A"), Some("1"));
        state.unset_env("A");
        assert_eq!(state.get_env("A"), None);
    }

    #[test]
    fn test_env_preserves_insertion_order() {
        let mut state = ShellState::default();
        state.set_env("Z", "1");
        state.set_env("A", "2");
        state.set_env("M", "3");
        let keys: Vec<&String> = state.env.keys().collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_request_exit() {
        let mut state = ShellState::default();
        state.request_exit(3);
        assert!(!state.running);
        assert!(state.exit_requested);
        assert_eq!(state.last_exit_code, 3);
    }

    #[test]
    fn test_exec_result_absorb() {
        let mut result = ExecResult::new("a".into(), "".into(), 0);
        let code = result.absorb(ExecResult::new("b".into(), "err".into(), 4));
        assert_eq!(code, 4);
        assert_eq!(result.stdout, "ab");
        assert_eq!(result.stderr, "err");
        assert_eq!(result.exit_code, 4);
    }
}
