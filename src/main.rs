//! `vectorl` command line front end

use anyhow::{bail, Context};
use clap::Parser as ClapParser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vectorl::{FileSources, Parser, RunOptions, Scanner, StdoutSink};

/// Compile and run a VectorL model
#[derive(Debug, ClapParser)]
#[command(name = "vectorl", version, about)]
struct Cli {
    /// Main module: a `.vl` file or a module name on the search path
    #[arg(value_name = "SRC")]
    source: String,

    /// Extra module directories, separated by ':'
    #[arg(short = 'p', long = "path", value_delimiter = ':')]
    path: Vec<PathBuf>,

    /// Stop before events due after this time
    #[arg(short, long)]
    until: Option<f64>,

    /// Stop after this many dispatched events
    #[arg(short, long)]
    steps: Option<u64>,

    /// Compile only
    #[arg(short = 'c', long = "compile")]
    compile_only: bool,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Print the parsed AST of SRC as JSON and exit
    #[arg(long)]
    dump_ast: bool,
}

/// Search path and module name for a SRC argument
fn locate(source: &str, extra: &[PathBuf]) -> (FileSources, String) {
    let mut sources = FileSources::with_paths(extra);
    let path = Path::new(source);
    let module = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.strip_suffix(".vl").unwrap_or(name).to_string(),
        None => source.to_string(),
    };
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => sources.add(dir),
        _ => sources.add("."),
    }
    (sources, module)
}

fn dump_ast(source: &str) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(source).with_context(|| format!("cannot read {}", source))?;
    let tokens = Scanner::new(&text).scan_tokens()?;
    let module = Parser::new(tokens).parse()?;
    println!("{}", serde_json::to_string_pretty(&module)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vectorl=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.dump_ast {
        return dump_ast(&cli.source);
    }

    let (sources, module) = locate(&cli.source, &cli.path);
    let options = RunOptions {
        until: cli.until,
        steps: cli.steps,
        trace: cli.trace,
        compile_only: cli.compile_only,
    };
    let report = vectorl::run(sources, &module, &options, StdoutSink);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for message in &report.messages {
            eprintln!("{}", message);
        }
        if report.success && report.pending_events > 0 {
            println!(
                "Finished at time={} after {} steps, unprocessed events={}",
                report.final_now, report.step_count, report.pending_events
            );
        }
    }

    if !report.success {
        bail!("{} failed", cli.source);
    }
    Ok(())
}
