use std::io::Read;

use clap::Parser;

use mrsh::{Shell, ShellOptions};

#[derive(Parser)]
#[command(name = "mrsh")]
#[command(about = "An embeddable POSIX-style shell with a sandboxed filesystem")]
#[command(version)]
struct Cli {
    /// Execute the script from the command line
    #[arg(short = 'c')]
    script: Option<String>,

    /// Working directory within the sandbox
    #[arg(long = "cwd")]
    cwd: Option<String>,

    /// Output results as JSON (stdout, stderr, exitCode)
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let script = if let Some(script) = cli.script {
        script
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(contents) => contents,
            Err(err) => {
                eprintln!("mrsh: cannot read script file '{}': {}", file, err);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("mrsh: no script provided; use -c 'script', a script file, or stdin");
            std::process::exit(2);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    let mut shell = Shell::new(ShellOptions {
        cwd: cli.cwd,
        ..Default::default()
    })
    .await;

    let result = shell.execute(&script).await;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "stdout": result.stdout,
                "stderr": result.stderr,
                "exitCode": result.exit_code,
            })
        );
    } else {
        print!("{}", result.stdout);
        eprint!("{}", result.stderr);
    }

    std::process::exit(result.exit_code);
}
