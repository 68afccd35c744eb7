#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![warn(clippy::nursery)]

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};

use jsstyle::config::{CONFIG_FILE, Config};
use jsstyle::grammar::JsParser;
use jsstyle::linter::{FileReport, FixOutcome};
use jsstyle::render::{self, Format};
use jsstyle::{Diagnostic, Linter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Stylish,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "jsstyle", version, about)]
struct Args {
    /// Files or glob patterns. Reads stdin when empty.
    paths: Vec<String>,

    /// Apply fixes. Files are rewritten; stdin input is printed fixed.
    #[arg(long)]
    fix: bool,

    /// Config file (default: ./jsstyle.toml if present, else the recommended set).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_passes: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Stylish)]
    format: OutputFormat,

    /// Report errors only.
    #[arg(long)]
    quiet: bool,

    #[arg(long)]
    no_color: bool,

    /// Print the parse tree of the input and exit.
    #[cfg(feature = "debug-tree")]
    #[arg(long)]
    print_tree: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("JSSTYLE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("jsstyle: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None if Path::new(CONFIG_FILE).is_file() => Config::load(Path::new(CONFIG_FILE))?,
        None => Config::recommended(),
    };
    if let Some(n) = args.max_passes {
        config.max_passes = n;
    }
    Ok(config)
}

fn read_stdin() -> Result<String> {
    let mut s = String::new();
    io::stdin()
        .read_to_string(&mut s)
        .context("cannot read stdin")?;
    Ok(s)
}

fn expand(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        let before = paths.len();
        for entry in glob::glob(pattern).with_context(|| format!("bad pattern `{pattern}`"))? {
            let path = entry?;
            if path.is_file() {
                paths.push(path);
            }
        }
        if paths.len() == before {
            bail!("no files match `{pattern}`");
        }
    }
    Ok(paths)
}

fn run(args: &Args) -> Result<ExitCode> {
    #[cfg(feature = "debug-tree")]
    if args.print_tree {
        let src = match args.paths.first() {
            Some(p) => fs::read_to_string(p)?,
            None => read_stdin()?,
        };
        println!("{}", JsParser::new().dump_tree(&src)?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(args)?;
    let linter = Linter::from_config(JsParser::new(), &config)?;

    let from_stdin = args.paths.is_empty();
    let mut reports = if from_stdin {
        let src = read_stdin()?;
        let outcome = if args.fix {
            linter.verify_and_fix(&src)
        } else {
            FixOutcome::unfixed(&src, linter.verify(&src))
        };
        vec![FileReport {
            path: PathBuf::from("<stdin>"),
            source: Some(src),
            outcome,
        }]
    } else {
        linter.lint_paths(&expand(&args.paths)?, args.fix)
    };

    if args.fix && !from_stdin {
        for report in reports.iter().filter(|r| r.changed()) {
            fs::write(&report.path, &report.outcome.output)
                .with_context(|| format!("cannot write {}", report.path.display()))?;
        }
    }
    if args.quiet {
        for report in &mut reports {
            report.outcome.diagnostics.retain(Diagnostic::is_error);
        }
    }

    let format = match args.format {
        OutputFormat::Stylish => Format::Stylish,
        OutputFormat::Json => Format::Json,
    };
    let printing_fixed = args.fix && from_stdin;
    let color = !args.no_color && !printing_fixed && io::stdout().is_terminal();
    let rendered = render::render(format, &reports, color)?;
    if printing_fixed {
        print!("{}", reports[0].outcome.output);
        eprint!("{rendered}");
    } else {
        print!("{rendered}");
    }

    let mut tooling = false;
    for err in reports.iter().flat_map(|r| &r.outcome.tooling_errors) {
        eprintln!("jsstyle: {err}");
        tooling = true;
    }
    Ok(if tooling {
        ExitCode::from(2)
    } else if reports.iter().any(|r| r.outcome.error_count() > 0) {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
