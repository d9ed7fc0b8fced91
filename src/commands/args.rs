//! Argument Parsing
//!
//! Schema-driven parsing of an expanded argv against a command's declared
//! parameters. Long options come as `--name=value` or `--name`; single
//! characters resolve through the schema's short aliases; everything else
//! lands in the positional list.

use crate::commands::types::{ParamSpec, ParamType, ParamValue, ParsedArgs};

/// Error text for a schema violation; the caller reports it on stderr and
/// returns exit 2.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgError(pub String);

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn find_spec<'a>(specs: &'a [ParamSpec], name: &str) -> Option<&'a ParamSpec> {
    specs.iter().find(|s| s.name == name).or_else(|| {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => specs.iter().find(|s| s.short == Some(c)),
            _ => None,
        }
    })
}

fn convert(spec: &ParamSpec, raw: &str) -> Result<ParamValue, ArgError> {
    match spec.param_type {
        ParamType::String => Ok(ParamValue::Str(raw.to_string())),
        ParamType::Boolean => Ok(ParamValue::Bool(!matches!(raw, "false" | "0" | "no"))),
        ParamType::Number => raw
            .parse::<i64>()
            .map(ParamValue::Num)
            .map_err(|_| ArgError(format!("option --{} expects a number, got '{}'", spec.name, raw))),
        ParamType::Array => Ok(ParamValue::List(vec![raw.to_string()])),
    }
}

fn store(args: &mut ParsedArgs, spec: &ParamSpec, value: ParamValue) {
    // Array options accumulate across repetitions; everything else
    // overwrites.
    if spec.param_type == ParamType::Array {
        if let (Some(ParamValue::List(existing)), ParamValue::List(new)) =
            (args.options.get_mut(spec.name), &value)
        {
            existing.extend(new.iter().cloned());
            return;
        }
    }
    args.options.insert(spec.name.to_string(), value);
}

/// Parse argv left to right against the schema, apply defaults, and
/// validate.
pub fn parse_args(specs: &[ParamSpec], argv: &[String]) -> Result<ParsedArgs, ArgError> {
    let mut args = ParsedArgs {
        raw: argv.to_vec(),
        ..Default::default()
    };

    let mut i = 0;
    while i < argv.len() {
        let arg = &argv[i];

        if let Some(rest) = arg.strip_prefix("--") {
            if rest.is_empty() {
                args.positionals.push(arg.clone());
                i += 1;
                continue;
            }
            if let Some((name, value)) = rest.split_once('=') {
                match find_spec(specs, name) {
                    Some(spec) => store(&mut args, spec, convert(spec, value)?),
                    // Undeclared options are still recorded; validation only
                    // checks declared constraints.
                    None => {
                        args.options
                            .insert(name.to_string(), ParamValue::Str(value.to_string()));
                    }
                }
            } else {
                match find_spec(specs, rest) {
                    Some(spec) => {
                        if spec.param_type == ParamType::Boolean {
                            store(&mut args, spec, ParamValue::Bool(true));
                        } else {
                            i += 1;
                            let value = argv.get(i).ok_or_else(|| {
                                ArgError(format!("option --{} requires a value", spec.name))
                            })?;
                            store(&mut args, spec, convert(spec, value)?);
                        }
                    }
                    None => {
                        args.options.insert(rest.to_string(), ParamValue::Bool(true));
                    }
                }
            }
            i += 1;
            continue;
        }

        // Single-character flags resolve through short aliases; an
        // undeclared character is still recorded as a boolean.
        let mut chars = arg.chars();
        if chars.next() == Some('-') {
            if let (Some(c), None) = (chars.next(), chars.next()) {
                match specs.iter().find(|s| s.short == Some(c) || s.name == c.to_string()) {
                    Some(spec) => {
                        if spec.param_type == ParamType::Boolean {
                            store(&mut args, spec, ParamValue::Bool(true));
                        } else {
                            i += 1;
                            let value = argv.get(i).ok_or_else(|| {
                                ArgError(format!("option -{} requires a value", c))
                            })?;
                            store(&mut args, spec, convert(spec, value)?);
                        }
                    }
                    None => {
                        args.options.insert(c.to_string(), ParamValue::Bool(true));
                    }
                }
                i += 1;
                continue;
            }
        }

        args.positionals.push(arg.clone());
        i += 1;
    }

    // Defaults, then required-ness.
    for spec in specs {
        if !args.options.contains_key(spec.name) {
            if let Some(default) = &spec.default {
                args.options.insert(spec.name.to_string(), default.clone());
            } else if spec.required {
                return Err(ArgError(format!("missing required option --{}", spec.name)));
            }
        }
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    const SPECS: &[ParamSpec] = &[
        ParamSpec::flag("verbose", 'v', "more output"),
        ParamSpec {
            name: "out",
            param_type: ParamType::String,
            short: Some('o'),
            required: false,
            default: None,
            description: "output path",
        },
        ParamSpec {
            name: "count",
            param_type: ParamType::Number,
            short: Some('n'),
            required: false,
            default: Some(ParamValue::Num(10)),
            description: "how many",
        },
        ParamSpec {
            name: "include",
            param_type: ParamType::Array,
            short: Some('I'),
            required: false,
            default: None,
            description: "paths",
        },
    ];

    #[test]
    fn test_long_with_equals() {
        let args = parse_args(SPECS, &argv(&["--out=f.txt"])).unwrap();
        assert_eq!(args.get_str("out"), Some("f.txt"));
    }

    #[test]
    fn test_long_consumes_next() {
        let args = parse_args(SPECS, &argv(&["--out", "f.txt", "rest"])).unwrap();
        assert_eq!(args.get_str("out"), Some("f.txt"));
        assert_eq!(args.positionals, vec!["rest"]);
    }

    #[test]
    fn test_long_boolean_does_not_consume() {
        let args = parse_args(SPECS, &argv(&["--verbose", "x"])).unwrap();
        assert!(args.flag("verbose"));
        assert_eq!(args.positionals, vec!["x"]);
    }

    #[test]
    fn test_short_alias_maps_to_canonical() {
        let args = parse_args(SPECS, &argv(&["-v", "-o", "f.txt"])).unwrap();
        assert!(args.flag("verbose"));
        assert_eq!(args.get_str("out"), Some("f.txt"));
    }

    #[test]
    fn test_undeclared_short_recorded_as_flag() {
        let args = parse_args(SPECS, &argv(&["-z"])).unwrap();
        assert!(args.flag("z"));
    }

    #[test]
    fn test_multichar_dash_is_positional() {
        let args = parse_args(SPECS, &argv(&["-eq", "1"])).unwrap();
        assert_eq!(args.positionals, vec!["-eq", "1"]);
    }

    #[test]
    fn test_defaults_applied() {
        let args = parse_args(SPECS, &argv(&[])).unwrap();
        assert_eq!(args.get_num("count"), Some(10));
    }

    #[test]
    fn test_number_validation() {
        assert!(parse_args(SPECS, &argv(&["--count=abc"])).is_err());
        let args = parse_args(SPECS, &argv(&["--count=7"])).unwrap();
        assert_eq!(args.get_num("count"), Some(7));
    }

    #[test]
    fn test_array_accumulates() {
        let args = parse_args(SPECS, &argv(&["-I", "a", "--include=b"])).unwrap();
        assert_eq!(
            args.options.get("include"),
            Some(&ParamValue::List(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn test_unknown_long_recorded() {
        let args = parse_args(SPECS, &argv(&["--nope", "--label=x"])).unwrap();
        assert!(args.flag("nope"));
        assert_eq!(args.get_str("label"), Some("x"));
    }

    #[test]
    fn test_missing_value_is_error() {
        assert!(parse_args(SPECS, &argv(&["--out"])).is_err());
    }

    #[test]
    fn test_required_option() {
        const REQ: &[ParamSpec] = &[ParamSpec {
            name: "target",
            param_type: ParamType::String,
            short: None,
            required: true,
            default: None,
            description: "",
        }];
        assert!(parse_args(REQ, &argv(&[])).is_err());
        assert!(parse_args(REQ, &argv(&["--target=x"])).is_ok());
    }

    #[test]
    fn test_raw_preserved() {
        let input = argv(&["-v", "--out=f", "pos"]);
        let args = parse_args(SPECS, &input).unwrap();
        assert_eq!(args.raw, input);
    }
}
