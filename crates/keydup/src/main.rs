use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;

use keydup_core::check::{evaluate, CheckPolicy};
use keydup_core::config::{Config, CONFIG_FILE};
use keydup_core::pipeline::AnalysisPipeline;
use keydup_core::types::SourceKind;
use keydup_report::{json, markdown, text};

#[derive(Parser)]
#[command(name = "keydup")]
#[command(about = "Profile natural-key duplication in history tables")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a data file and print the duplication report
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Analyze and exit with code 0 (pass) or 1 (fail)
    Check {
        #[command(flatten)]
        source: SourceArgs,
        /// Fail when the reduction rate (percent) is above this value
        #[arg(long)]
        max_reduction_rate: Option<f64>,
        /// Fail when more keys than this have more than one record
        #[arg(long)]
        max_duplicate_keys: Option<u64>,
    },
    /// Create a default .keydup.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// SQLite database or CSV export to analyze
    path: PathBuf,
    /// Source backend (inferred from the file extension by default)
    #[arg(long)]
    kind: Option<SourceKind>,
    /// Table to read from a SQLite database
    #[arg(long)]
    table: Option<String>,
    /// Config file path (defaults to .keydup.toml next to the data file or above it)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Single-line JSON output
    #[arg(long)]
    compact: bool,
    /// Number of rows in each ranked list
    #[arg(long)]
    top_n: Option<usize>,
    /// Maximum characters of the shipping mark name shown per key
    #[arg(long)]
    name_width: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze { source } => cmd_analyze(&source),
        Commands::Check {
            source,
            max_reduction_rate,
            max_duplicate_keys,
        } => cmd_check(&source, max_reduction_rate, max_duplicate_keys),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_analyze(args: &SourceArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let report = AnalysisPipeline::new(config).analyze(&args.path)?;

    let output = match args.format {
        OutputFormat::Text => text::format_report(&report),
        OutputFormat::Json => json::format_report(&report, args.compact)? + "\n",
        OutputFormat::Markdown => markdown::format_report(&report),
    };
    print!("{output}");
    Ok(())
}

fn cmd_check(
    args: &SourceArgs,
    max_reduction_rate: Option<f64>,
    max_duplicate_keys: Option<u64>,
) -> Result<()> {
    let config = resolve_config(args)?;
    let mut policy = CheckPolicy::from(&config.check);
    if max_reduction_rate.is_some() {
        policy.max_reduction_rate = max_reduction_rate;
    }
    if max_duplicate_keys.is_some() {
        policy.max_duplicate_keys = max_duplicate_keys;
    }

    let report = AnalysisPipeline::new(config).analyze(&args.path)?;
    let outcome = evaluate(&report, &policy);

    let (output, passed) = match args.format {
        OutputFormat::Text => text::format_check(&report, &outcome),
        OutputFormat::Json => {
            let (json, passed) = json::format_check(&report, &outcome, args.compact)?;
            (json + "\n", passed)
        }
        OutputFormat::Markdown => markdown::format_check(&report, &outcome),
    };
    print!("{output}");
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

/// Built-in defaults, then the config file, then command-line flags.
fn resolve_config(args: &SourceArgs) -> Result<Config> {
    let mut config = load_config(&args.path, args.config.as_deref())?;
    if let Some(kind) = args.kind {
        config.source.kind = Some(kind);
    }
    if let Some(ref table) = args.table {
        config.source.table = table.clone();
    }
    if let Some(top_n) = args.top_n {
        config.report.top_n = top_n;
    }
    if let Some(name_width) = args.name_width {
        config.report.name_width = name_width;
    }
    Ok(config)
}

fn load_config(data_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => {
            let dir = match data_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            Ok(Config::load_or_default(dir))
        }
    }
}
