use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser as ClapParser;

use rox::interpreter::Interpreter;
use rox::session::Session;
use rox::PhaseTimings;

/// Writes per-phase wall times here when set (file mode only).
const ENV_PROFILE: &str = "COLLECT_PROFILE";

/// Non-empty enables internal debug logging, e.g. `LOG_LEVEL=debug`.
const ENV_LOG: &str = "LOG_LEVEL";

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Lox script to run; omit for an interactive prompt.
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli: Cli = match Cli::try_parse() {
        Ok(cli) => cli,

        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            err.print()?;
            return Ok(());
        }

        Err(_) => {
            eprintln!("usage: rox [script]");
            process::exit(64);
        }
    };

    match cli.script {
        Some(script) => run_file(&script),

        None => run_prompt(),
    }
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let source: String = match fs::read_to_string(path) {
        Ok(source) => source,

        Err(err) => {
            eprintln!("Error reading file {}: {}", path.display(), err);
            process::exit(1);
        }
    };

    let session = Session::new();
    let mut interpreter = Interpreter::new();

    let timings: PhaseTimings = rox::run(&source, &mut interpreter, &session);

    if let Ok(profile_path) = std::env::var(ENV_PROFILE) {
        write_profile(&profile_path, &timings)?;
    }

    if session.had_runtime_error() {
        process::exit(70);
    }

    if session.had_error() {
        process::exit(65);
    }

    Ok(())
}

fn run_prompt() -> anyhow::Result<()> {
    let session = Session::new();
    let mut interpreter = Interpreter::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF.
            break;
        }

        let line: &str = line.trim_end_matches(|c| c == '\n' || c == '\r');
        if line == "quit" {
            break;
        }

        rox::run(line, &mut interpreter, &session);

        // One bad line must not poison the next.
        session.reset();
    }

    Ok(())
}

fn init_logging() {
    let filter: String = std::env::var(ENV_LOG).unwrap_or_default();
    if filter.is_empty() {
        return;
    }

    env_logger::Builder::new()
        .parse_filters(&filter)
        .target(env_logger::Target::Stdout)
        .init();
}

fn write_profile(path: &str, timings: &PhaseTimings) -> io::Result<()> {
    let mut file = fs::File::create(path)?;

    writeln!(file, "scan {}us", timings.scan.as_micros())?;
    writeln!(file, "parse {}us", timings.parse.as_micros())?;
    writeln!(file, "resolve {}us", timings.resolve.as_micros())?;
    writeln!(file, "interpret {}us", timings.interpret.as_micros())?;

    Ok(())
}
