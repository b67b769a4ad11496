//! kolint CLI tool.
//!
//! Usage:
//! ```bash
//! kolint check [OPTIONS] [PATHS]...
//! kolint format [OPTIONS] [PATHS]...
//! kolint list-rules
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Linter and formatter for Kotlin source files
#[derive(Parser)]
#[command(name = "kolint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "KOLINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report style violations
    Check {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        overrides: Overrides,

        /// Output format
        #[arg(short, long, default_value = "plain")]
        format: OutputFormat,
    },

    /// Fix style violations in place
    Format {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        overrides: Overrides,

        /// Output format for violations that could not be fixed
        #[arg(short, long, default_value = "plain")]
        format: OutputFormat,

        /// Report files that would change without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// List available rules
    ListRules,
}

/// Files to process.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Files or directories to process (default: current directory)
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Exclude patterns (can be specified multiple times)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Read source from stdin and write results to stdout
    #[arg(long, conflicts_with = "paths")]
    pub stdin: bool,
}

/// Command line settings that take precedence over the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Rule preset: standard, experimental or all
    #[arg(long)]
    pub preset: Option<String>,

    /// Enable experimental rules
    #[arg(long)]
    pub experimental: bool,

    /// Maximum line length
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Kotlin parser used to read source files
    #[arg(long, default_value = "kotlin")]
    pub parser: ParserKind,
}

/// Parser frontend selectable on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ParserKind {
    /// Built-in recursive descent parser.
    #[default]
    Kotlin,
    /// The tree-sitter Kotlin grammar.
    TreeSitter,
}

impl ParserKind {
    /// Returns the frontend for this kind.
    pub fn frontend(self) -> Box<dyn kolint::Frontend> {
        match self {
            Self::Kotlin => Box::new(kolint::KotlinParser::new()),
            Self::TreeSitter => Box::new(kolint::TreeSitterFrontend::new()),
        }
    }
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Violations grouped by file with a summary.
    #[default]
    Plain,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
    /// Source excerpts with labelled violations.
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let clean = match cli.command {
        Commands::Check {
            input,
            overrides,
            format,
        } => commands::check::run(&input, &overrides, format, cli.config.as_deref())?,
        Commands::Format {
            input,
            overrides,
            format,
            dry_run,
        } => commands::format::run(&input, &overrides, format, dry_run, cli.config.as_deref())?,
        Commands::ListRules => {
            commands::list_rules::run();
            true
        }
    };

    if !clean {
        std::process::exit(1);
    }
    Ok(())
}
