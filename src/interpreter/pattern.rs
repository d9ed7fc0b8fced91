//! Pattern Matching
//!
//! Shell glob patterns are compiled to regexes for `case` matching and the
//! `${var#pattern}` family: `*` becomes `.*`, `?` becomes `.`, everything
//! else that regex treats specially is escaped.

use regex_lite::Regex;

/// Convert a glob pattern to an (unanchored) regex string.
pub fn pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '\\' => {
                // Literal next character.
                if let Some(next) = chars.next() {
                    push_escaped(&mut regex, next);
                } else {
                    regex.push_str("\\\\");
                }
            }
            _ => push_escaped(&mut regex, c),
        }
    }

    regex
}

fn push_escaped(out: &mut String, c: char) {
    if "\\.+*?()|[]{}^$".contains(c) {
        out.push('\\');
    }
    out.push(c);
}

/// Whole-string glob match, as used by `case`.
pub fn glob_match(pattern: &str, value: &str) -> bool {
    let regex = format!("^{}$", pattern_to_regex(pattern));
    match Regex::new(&regex) {
        Ok(re) => re.is_match(value),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripSide {
    Prefix,
    Suffix,
}

/// Remove the shortest or longest match of `pattern` from one end of
/// `value`. Candidate split points are scanned in code points, so the
/// shortest/longest distinction is exact rather than relying on regex
/// greediness.
pub fn strip_pattern(value: &str, pattern: &str, side: StripSide, longest: bool) -> String {
    let regex = format!("^{}$", pattern_to_regex(pattern));
    let re = match Regex::new(&regex) {
        Ok(re) => re,
        Err(_) => return value.to_string(),
    };

    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();

    match side {
        StripSide::Prefix => {
            let candidates: Vec<usize> = if longest {
                (0..=len).rev().collect()
            } else {
                (0..=len).collect()
            };
            for i in candidates {
                let head: String = chars[..i].iter().collect();
                if re.is_match(&head) {
                    return chars[i..].iter().collect();
                }
            }
            value.to_string()
        }
        StripSide::Suffix => {
            let candidates: Vec<usize> = if longest {
                (0..=len).collect()
            } else {
                (0..=len).rev().collect()
            };
            for i in candidates {
                let tail: String = chars[i..].iter().collect();
                if re.is_match(&tail) {
                    return chars[..i].iter().collect();
                }
            }
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_to_regex() {
        assert_eq!(pattern_to_regex("*.txt"), ".*\\.txt");
        assert_eq!(pattern_to_regex("a?c"), "a.c");
        assert_eq!(pattern_to_regex("a+b"), "a\\+b");
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.txt", "file.txt"));
        assert!(!glob_match("*.txt", "file.txt.bak"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "abbc"));
        assert!(glob_match("*", ""));
        assert!(glob_match("hello", "hello"));
    }

    #[test]
    fn test_strip_prefix_shortest_and_longest() {
        // value "aabbcc", pattern "a*" matches many prefixes.
        assert_eq!(strip_pattern("aabbcc", "a*", StripSide::Prefix, false), "abbcc");
        assert_eq!(strip_pattern("aabbcc", "a*", StripSide::Prefix, true), "");
    }

    #[test]
    fn test_strip_suffix_shortest_and_longest() {
        assert_eq!(strip_pattern("a.b.c", ".*", StripSide::Suffix, false), "a.b");
        assert_eq!(strip_pattern("a.b.c", ".*", StripSide::Suffix, true), "a");
    }

    #[test]
    fn test_strip_no_match_returns_value() {
        assert_eq!(strip_pattern("hello", "x*", StripSide::Prefix, false), "hello");
        assert_eq!(strip_pattern("hello", "*x", StripSide::Suffix, true), "hello");
    }

    #[test]
    fn test_strip_whole_value() {
        assert_eq!(strip_pattern("abc", "*", StripSide::Suffix, true), "");
        // Shortest match of `*` as a suffix is the empty string.
        assert_eq!(strip_pattern("abc", "*", StripSide::Suffix, false), "abc");
    }
}
