use anyhow::{bail, Context};
use clap::Parser;
use code_insight::{OpenAiClient, Operation, Pipeline, Settings};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "code-insight",
    version,
    about = "Stream AI code analysis and rewrites for every source file in a tree",
    long_about = "Recursively scans a folder and, for each eligible source file, asks a \
    text-completion service for an analysis report, an improved rewrite, or both. \
    Results are streamed into a sibling output directory next to each file.\n\n\
    OPERATIONS:\n  \
      analyze              generate an analysis report per file\n  \
      improve              generate an improved rewrite per file\n  \
      analyze-and-improve  generate both, analysis first\n  \
      clear-analysis       remove previously generated output directories\n\n\
    USAGE EXAMPLES:\n  \
      # Analyze a project\n  \
      code-insight analyze ./my-project\n\n  \
      # Generate both artifacts with a custom settings file\n  \
      code-insight analyze-and-improve ./src --config ./settings.json\n\n  \
      # Remove everything a prior run produced\n  \
      code-insight clear-analysis ./my-project"
)]
struct Cli {
    /// Operation to run (analyze, improve, analyze-and-improve, clear-analysis)
    #[arg(value_name = "OPERATION")]
    operation: String,

    /// Root folder to scan
    #[arg(value_name = "FOLDER")]
    folder: PathBuf,

    /// Path to the JSON settings file
    #[arg(short, long, default_value = "settings.json", value_name = "FILE")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    // Operation names are matched case-sensitively.
    let operation: Operation = cli
        .operation
        .parse()
        .context("Invalid operation. Please provide a valid operation")?;

    if !cli.folder.is_dir() {
        bail!(
            "Folder path {} does not exist. Please provide a valid folder path",
            cli.folder.display()
        );
    }

    // Fatal on any missing or malformed value: no file is touched with a
    // broken configuration.
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    let client = OpenAiClient::new(&settings);
    let pipeline = Pipeline::new(settings, Box::new(client))
        .context("Failed to create pipeline")?;

    let stats = pipeline.run(&cli.folder, operation);
    stats.print_summary();

    println!("Operation executed");
    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("code_insight=info"),
        1 => EnvFilter::new("code_insight=debug"),
        _ => EnvFilter::new("code_insight=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();

    Ok(())
}
