use anyhow::Context;
use clap::Parser;
use cogbat_analysis::{ResponseFilter, SUMMARY_FILE, analyze, write_summary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Summarize every subject workbook in a data directory into one CSV.
#[derive(Parser, Debug)]
#[command(name = "cogbat-analysis", version)]
struct Cli {
    /// Directory holding the per-subject workbooks
    #[arg(long, default_value = "data")]
    data: PathBuf,

    /// Output CSV file, or a directory to write battery_data.csv into
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Trials used for RT and regression measures
    #[arg(long, value_enum, default_value_t = ResponseFilter::Full)]
    responses: ResponseFilter,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cogbat_analysis=info")),
        )
        .init();

    let cli = Cli::parse();
    let output = if cli.output.is_dir() {
        cli.output.join(SUMMARY_FILE)
    } else {
        cli.output
    };

    let table = analyze(&cli.data, cli.responses)
        .with_context(|| format!("summarizing workbooks in {}", cli.data.display()))?;
    write_summary(&table, &output).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}
