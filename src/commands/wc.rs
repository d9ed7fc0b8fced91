//! wc - line, word, and character counts

use async_trait::async_trait;

use crate::commands::types::{
    Command, CommandContext, CommandError, ParamSpec, ParsedArgs,
};

pub struct WcCommand;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::flag("lines", 'l', "print the newline counts"),
    ParamSpec::flag("words", 'w', "print the word counts"),
    ParamSpec::flag("chars", 'c', "print the character counts"),
];

#[derive(Default, Clone, Copy)]
struct Counts {
    lines: usize,
    words: usize,
    chars: usize,
}

impl Counts {
    fn add(&mut self, other: Counts) {
        self.lines += other.lines;
        self.words += other.words;
        self.chars += other.chars;
    }
}

fn count(content: &str) -> Counts {
    let mut counts = Counts::default();
    let mut in_word = false;

    for c in content.chars() {
        counts.chars += 1;
        if c == '\n' {
            counts.lines += 1;
        }
        if c.is_whitespace() {
            if in_word {
                counts.words += 1;
                in_word = false;
            }
        } else {
            in_word = true;
        }
    }
    if in_word {
        counts.words += 1;
    }
    counts
}

fn format_line(counts: Counts, selected: (bool, bool, bool), label: Option<&str>) -> String {
    let (lines, words, chars) = selected;
    let mut out = String::new();
    if lines {
        out.push_str(&format!("{:>8}", counts.lines));
    }
    if words {
        out.push_str(&format!("{:>8}", counts.words));
    }
    if chars {
        out.push_str(&format!("{:>8}", counts.chars));
    }
    if let Some(label) = label {
        out.push(' ');
        out.push_str(label);
    }
    out.push('\n');
    out
}

#[async_trait]
impl Command for WcCommand {
    fn name(&self) -> &'static str {
        "wc"
    }

    fn description(&self) -> &'static str {
        "print newline, word, and character counts"
    }

    fn category(&self) -> Option<&'static str> {
        Some("text")
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(
        &self,
        args: ParsedArgs,
        ctx: &mut CommandContext,
    ) -> Result<i32, CommandError> {
        let mut lines = args.flag("lines");
        let mut words = args.flag("words");
        let mut chars = args.flag("chars");
        if !lines && !words && !chars {
            lines = true;
            words = true;
            chars = true;
        }
        let selected = (lines, words, chars);

        if args.positionals.is_empty() {
            let counts = count(&ctx.stdin);
            ctx.stdout(&format_line(counts, selected, None));
            return Ok(0);
        }

        let mut exit_code = 0;
        let mut total = Counts::default();
        for file in &args.positionals {
            let path = ctx.resolve(file);
            match ctx.fs.read_file(&path).await {
                Ok(contents) => {
                    let counts = count(&contents);
                    total.add(counts);
                    ctx.stdout(&format_line(counts, selected, Some(file)));
                }
                Err(err) => {
                    ctx.stderr(&format!("wc: {}: {}\n", file, err.reason()));
                    exit_code = 1;
                }
            }
        }
        if args.positionals.len() > 1 {
            ctx.stdout(&format_line(total, selected, Some("total")));
        }
        Ok(exit_code)
    }
}
