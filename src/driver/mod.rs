use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{
    compiler::{CompileError, Compiler},
    ir::Executable,
    parser::DocumentSource,
};

use config::{Config, OutputFormat};

pub mod config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CompilerArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a script document.
    Compile(CompileArgs),
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// The input document.
    input: PathBuf,

    /// Config file. Defaults to scriptc.toml in the working directory, if present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logical id of the grammar to compile against.
    #[arg(short, long)]
    grammar: Option<String>,

    /// Artifact format.
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Where to write the artifact.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only report diagnostics, write nothing.
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Disable coloured diagnostics.
    #[arg(long, default_value_t = false)]
    no_color: bool,
}

pub fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CompilerArgs::parse();

    match args.command {
        Command::Compile(args) => compile(args),
    }
}

fn compile(args: CompileArgs) -> anyhow::Result<ExitCode> {
    let start_time = Instant::now();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&std::env::current_dir()?)?,
    };
    let grammar_id = args.grammar.as_deref().unwrap_or(config.grammar_id());
    let compiler = Compiler::new(&config.resolver(), grammar_id)
        .with_context(|| format!("failed to load grammar {grammar_id:?}"))?;
    tracing::debug!("compiling against grammar {:?}", compiler.grammar().id);

    let source = DocumentSource::read(&args.input)?;
    let color = !args.no_color && std::io::stderr().is_terminal();

    let executable = match compiler.compile_source(&source) {
        Ok(executable) => executable,
        Err(CompileError::Document(error)) => {
            eprint!("{}", error.render(&source, color));
            return Ok(ExitCode::FAILURE);
        }
        Err(error) => {
            eprint!("{}", compiler.diagnostics().render(color));
            eprintln!("{error}");
            return Ok(ExitCode::FAILURE);
        }
    };

    if compiler.warning_count() > 0 {
        eprint!("{}", compiler.diagnostics().render(color));
    }

    if !args.check {
        let format = args.format.unwrap_or(config.output.format);
        let rendered = render(&executable, format)?;
        match output_path(&args, &config, format) {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, rendered)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::debug!("Output file: {:?}", path);
            }
            None => print!("{rendered}"),
        }
    }

    let elapsed = start_time.elapsed();
    tracing::debug!("Done in {:?}", elapsed);

    Ok(ExitCode::SUCCESS)
}

fn render(executable: &Executable, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Listing => executable.to_string(),
        OutputFormat::Json => executable.to_json()? + "\n",
    })
}

/// An explicit `--output` wins; otherwise the configured directory gets a
/// file named after the input.
fn output_path(args: &CompileArgs, config: &Config, format: OutputFormat) -> Option<PathBuf> {
    if let Some(path) = &args.output {
        return Some(path.clone());
    }
    let directory = config.output.directory.as_deref()?;
    Some(artifact_path(directory, &args.input, format))
}

fn artifact_path(directory: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_else(|| "out".into());
    directory.join(format!("{stem}.{}", format.extension()))
}
