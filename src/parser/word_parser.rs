//! Word Reconstruction
//!
//! The lexer hands the parser raw word fragments with all quoting syntax
//! intact. This module re-scans a fragment into a `Word` tree: literal
//! chunks, quoted regions, parameter expansions, command substitutions, and
//! arithmetic expansions.
//!
//! Command substitution bodies are parsed eagerly here and cached in the
//! node, so the evaluator never re-enters the parser at expansion time.

use crate::ast::types::{
    ArithmeticWord, CommandWord, ListWord, ParamOp, ParameterWord, StrWord, Word,
};
use crate::parser::types::ParseException;

/// Build a `Word` tree from the raw value of a Word token.
pub fn parse_word(raw: &str) -> Result<Word, ParseException> {
    // Fragments without quoting or expansion syntax stay a single literal.
    if !raw.chars().any(|c| matches!(c, '$' | '`' | '"' | '\'')) {
        return Ok(Word::Str(StrWord {
            value: raw.to_string(),
            single_quoted: false,
            split_fields: true,
        }));
    }

    let chars: Vec<char> = raw.chars().collect();
    let mut children = Vec::new();
    let mut i = 0;
    scan(&chars, &mut i, false, &mut children)?;

    let double_quoted = chars.len() >= 2 && chars[0] == '"' && chars[chars.len() - 1] == '"';

    Ok(match children.len() {
        0 => Word::Str(StrWord {
            value: String::new(),
            single_quoted: false,
            split_fields: false,
        }),
        // A list of one collapses to its single child.
        1 => children.pop().unwrap(),
        _ => Word::List(ListWord { children, double_quoted }),
    })
}

/// Left-to-right scan of a fragment. When `in_dquote` is set the scan runs
/// inside a `"..."` region and returns at the closing quote.
fn scan(
    chars: &[char],
    i: &mut usize,
    in_dquote: bool,
    children: &mut Vec<Word>,
) -> Result<(), ParseException> {
    let mut buf = String::new();

    macro_rules! flush {
        () => {
            if !buf.is_empty() {
                children.push(Word::Str(StrWord {
                    value: std::mem::take(&mut buf),
                    single_quoted: false,
                    split_fields: !in_dquote,
                }));
            }
        };
    }

    while *i < chars.len() {
        let c = chars[*i];
        match c {
            '\'' if !in_dquote => {
                flush!();
                *i += 1;
                let start = *i;
                while *i < chars.len() && chars[*i] != '\'' {
                    *i += 1;
                }
                let value: String = chars[start..*i].iter().collect();
                if *i < chars.len() {
                    *i += 1; // closing quote
                }
                children.push(Word::Str(StrWord {
                    value,
                    single_quoted: true,
                    split_fields: false,
                }));
            }
            '"' if !in_dquote => {
                *i += 1;
                flush!();
                scan(chars, i, true, children)?;
            }
            '"' => {
                *i += 1;
                flush!();
                return Ok(());
            }
            '\\' => {
                *i += 1;
                match chars.get(*i) {
                    None => buf.push('\\'),
                    Some('\n') => {
                        // Line continuation disappears entirely.
                        *i += 1;
                    }
                    Some(&next) if in_dquote => {
                        // Inside double quotes only these four are escapes.
                        if matches!(next, '$' | '`' | '"' | '\\') {
                            buf.push(next);
                        } else {
                            buf.push('\\');
                            buf.push(next);
                        }
                        *i += 1;
                    }
                    Some(&next) => {
                        buf.push(next);
                        *i += 1;
                    }
                }
            }
            '$' => {
                scan_dollar(chars, i, &mut buf, children, in_dquote)?;
            }
            '`' => {
                flush!();
                *i += 1;
                let mut body = String::new();
                while *i < chars.len() && chars[*i] != '`' {
                    if chars[*i] == '\\' && *i + 1 < chars.len() {
                        let next = chars[*i + 1];
                        if matches!(next, '$' | '`' | '\\') {
                            body.push(next);
                            *i += 2;
                            continue;
                        }
                    }
                    body.push(chars[*i]);
                    *i += 1;
                }
                if *i < chars.len() {
                    *i += 1; // closing backquote
                }
                let program = crate::parser::parse(&body)?;
                children.push(Word::Command(CommandWord {
                    program: Some(program),
                    back_quoted: true,
                }));
            }
            _ => {
                buf.push(c);
                *i += 1;
            }
        }
    }

    flush!();
    Ok(())
}

/// Dispatch on the character after `$`. `buf` receives a literal dollar
/// when nothing expandable follows; otherwise the pending literal is
/// flushed and an expansion child is pushed.
fn scan_dollar(
    chars: &[char],
    i: &mut usize,
    buf: &mut String,
    children: &mut Vec<Word>,
    in_dquote: bool,
) -> Result<(), ParseException> {
    *i += 1; // $

    let mut flush = |buf: &mut String, children: &mut Vec<Word>| {
        if !buf.is_empty() {
            children.push(Word::Str(StrWord {
                value: std::mem::take(buf),
                single_quoted: false,
                split_fields: !in_dquote,
            }));
        }
    };

    match (chars.get(*i).copied(), chars.get(*i + 1).copied()) {
        (Some('('), Some('(')) => {
            flush(buf, children);
            *i += 2;
            let body = take_balanced_parens(chars, i, 2);
            let body_word = parse_word(&body)?;
            children.push(Word::Arithmetic(ArithmeticWord {
                body: Box::new(body_word),
            }));
        }
        (Some('('), _) => {
            flush(buf, children);
            *i += 1;
            let body = take_balanced_parens(chars, i, 1);
            let program = crate::parser::parse(&body)?;
            children.push(Word::Command(CommandWord {
                program: Some(program),
                back_quoted: false,
            }));
        }
        (Some('{'), _) => {
            flush(buf, children);
            *i += 1;
            let mut depth = 1;
            let mut body = String::new();
            // Quoted braces must not close the parameter, so the depth scan
            // skips over quoted spans the same way the lexer's did.
            while *i < chars.len() {
                let c = chars[*i];
                match c {
                    '\'' => {
                        copy_single_quoted(chars, i, &mut body);
                        continue;
                    }
                    '"' => {
                        copy_double_quoted(chars, i, &mut body);
                        continue;
                    }
                    '\\' if *i + 1 < chars.len() => {
                        body.push('\\');
                        body.push(chars[*i + 1]);
                        *i += 2;
                        continue;
                    }
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            *i += 1;
                            break;
                        }
                    }
                    _ => {}
                }
                body.push(c);
                *i += 1;
            }
            children.push(parse_parameter(&body)?);
        }
        (Some(c), _) if is_special_parameter(c) => {
            flush(buf, children);
            *i += 1;
            children.push(Word::Parameter(ParameterWord {
                name: c.to_string(),
                op: ParamOp::None,
                colon: false,
                arg: None,
            }));
        }
        (Some(c), _) if is_name_char(c) => {
            flush(buf, children);
            let start = *i;
            while *i < chars.len() && is_name_char(chars[*i]) {
                *i += 1;
            }
            let name: String = chars[start..*i].iter().collect();
            children.push(Word::Parameter(ParameterWord {
                name,
                op: ParamOp::None,
                colon: false,
                arg: None,
            }));
        }
        _ => buf.push('$'),
    }

    Ok(())
}

/// Copy a `'...'` span, quotes included, advancing past the closing quote.
/// Entered with `chars[*i]` on the opening quote.
fn copy_single_quoted(chars: &[char], i: &mut usize, out: &mut String) {
    out.push('\'');
    *i += 1;
    while *i < chars.len() {
        out.push(chars[*i]);
        *i += 1;
        if chars[*i - 1] == '\'' {
            return;
        }
    }
}

/// Copy a `"..."` span with backslash escapes, quotes included.
fn copy_double_quoted(chars: &[char], i: &mut usize, out: &mut String) {
    out.push('"');
    *i += 1;
    while *i < chars.len() {
        let c = chars[*i];
        if c == '\\' && *i + 1 < chars.len() {
            out.push(c);
            out.push(chars[*i + 1]);
            *i += 2;
            continue;
        }
        out.push(c);
        *i += 1;
        if c == '"' {
            return;
        }
    }
}

/// Consume up to the paren that brings `depth` to zero; the closers are not
/// part of the returned body. Nested quotes inside the span were already
/// balanced by the lexer.
fn take_balanced_parens(chars: &[char], i: &mut usize, mut depth: usize) -> String {
    let mut body = String::new();
    let extra_closer = depth > 1;
    while *i < chars.len() {
        let c = chars[*i];
        match c {
            '\'' => {
                copy_single_quoted(chars, i, &mut body);
                continue;
            }
            '"' => {
                copy_double_quoted(chars, i, &mut body);
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    *i += 1;
                    if extra_closer && body.ends_with(')') {
                        body.pop();
                    }
                    return body;
                }
            }
            _ => {}
        }
        body.push(c);
        *i += 1;
    }
    body
}

/// Parse the inside of `${...}` into a Parameter word.
fn parse_parameter(inner: &str) -> Result<Word, ParseException> {
    let chars: Vec<char> = inner.chars().collect();

    // ${#name} yields the length of the value. A lone `#` is the special
    // argument-count parameter.
    if chars.first() == Some(&'#') && chars.len() > 1 {
        let name: String = chars[1..].iter().collect();
        if name.chars().all(is_name_char) {
            return Ok(Word::Parameter(ParameterWord {
                name,
                op: ParamOp::LeadingHash,
                colon: false,
                arg: None,
            }));
        }
    }

    let mut i = 0;
    if i < chars.len() && is_special_parameter(chars[i]) && !is_name_char(chars[i]) {
        i += 1;
    } else {
        while i < chars.len() && is_name_char(chars[i]) {
            i += 1;
        }
    }
    let name: String = chars[..i].iter().collect();

    if i >= chars.len() {
        return Ok(Word::Parameter(ParameterWord {
            name,
            op: ParamOp::None,
            colon: false,
            arg: None,
        }));
    }

    let mut colon = false;
    if chars[i] == ':' && i + 1 < chars.len() && matches!(chars[i + 1], '-' | '=' | '?' | '+') {
        colon = true;
        i += 1;
    }

    let op = match chars[i] {
        '-' => ParamOp::Minus,
        '=' => ParamOp::Equal,
        '?' => ParamOp::QMark,
        '+' => ParamOp::Plus,
        '%' if chars.get(i + 1) == Some(&'%') => {
            i += 1;
            ParamOp::DPercent
        }
        '%' => ParamOp::Percent,
        '#' if chars.get(i + 1) == Some(&'#') => {
            i += 1;
            ParamOp::DHash
        }
        '#' => ParamOp::Hash,
        _ => {
            // Unknown suffix; keep the name and ignore the rest.
            return Ok(Word::Parameter(ParameterWord {
                name,
                op: ParamOp::None,
                colon: false,
                arg: None,
            }));
        }
    };
    i += 1;

    let arg_text: String = chars[i..].iter().collect();
    let arg = parse_word(&arg_text)?;

    Ok(Word::Parameter(ParameterWord {
        name,
        op,
        colon,
        arg: Some(Box::new(arg)),
    }))
}

fn is_special_parameter(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '-' | '$' | '!' | '0'..='9')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
