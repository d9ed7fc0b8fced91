//! Prompt Expansion
//!
//! Interprets the PS1 escapes the facade supports: `\w`, `\W`, `\u`, `\h`,
//! `\$`, and `\\`. Unknown escapes pass through unchanged.

use crate::interpreter::state::ShellState;

pub fn expand_prompt(state: &ShellState, ps1: &str) -> String {
    let mut result = String::new();
    let mut chars = ps1.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('w') => result.push_str(&tilde_cwd(state)),
            Some('W') => {
                let cwd = state.cwd.as_str();
                let segment = cwd.rsplit('/').next().unwrap_or("");
                result.push_str(if segment.is_empty() { "/" } else { segment });
            }
            Some('u') => result.push_str(state.get_env("USER").unwrap_or("")),
            Some('h') => result.push_str(state.get_env("HOSTNAME").unwrap_or("")),
            Some('$') => result.push('$'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

/// cwd with a `$HOME` prefix replaced by `~`.
fn tilde_cwd(state: &ShellState) -> String {
    let cwd = state.cwd.as_str();
    if let Some(home) = state.get_env("HOME") {
        if cwd == home {
            return "~".to_string();
        }
        if let Some(rest) = cwd.strip_prefix(&format!("{}/", home)) {
            return format!("~/{}", rest);
        }
    }
    cwd.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(cwd: &str) -> ShellState {
        let mut state = ShellState::default();
        state.set_env("HOME", "/home/user");
        state.set_env("USER", "u");
        state.set_env("HOSTNAME", "h");
        state.cwd = cwd.to_string();
        state
    }

    #[test]
    fn test_tilde_collapse() {
        let state = state_with("/home/user");
        assert_eq!(expand_prompt(&state, r"\w"), "~");

        let state = state_with("/home/user/docs");
        assert_eq!(expand_prompt(&state, r"\w"), "~/docs");

        let state = state_with("/etc");
        assert_eq!(expand_prompt(&state, r"\w"), "/etc");
    }

    #[test]
    fn test_basename_escape() {
        let state = state_with("/home/user/docs");
        assert_eq!(expand_prompt(&state, r"\W"), "docs");
        let state = state_with("/");
        assert_eq!(expand_prompt(&state, r"\W"), "/");
    }

    #[test]
    fn test_user_host_dollar() {
        let state = state_with("/home/user");
        assert_eq!(expand_prompt(&state, r"\u@\h:\w\$ "), "u@h:~$ ");
    }

    #[test]
    fn test_unknown_escape_passes_through() {
        let state = state_with("/");
        assert_eq!(expand_prompt(&state, r"\x"), r"\x");
    }
}
