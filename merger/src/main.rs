use anyhow::Result;
use clap::{Parser, Subcommand};
use merger::{merge_summary, parse_assignment, run_courselets, run_csv, run_merge, run_report, CsvOptions};
use merge_core::config::DEFAULT_SENTINELS;
use merge_core::index::DEFAULT_NWORD;
use merge_core::MergeConfig;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "merger")]
#[command(about = "Merge legacy response logs into canonical course content", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy legacy responses into content files, writing <stem>merge.json for each
    Merge {
        /// Legacy export (JSON object with a "questions" list)
        #[arg(long)]
        legacy: PathBuf,
        /// Content files (JSON block lists); later files shadow earlier ones
        #[arg(required = true)]
        content: Vec<PathBuf>,
        /// Words per phrase used for title and error matching
        #[arg(long, default_value_t = DEFAULT_NWORD)]
        nword: usize,
        /// Belief markers passed through without matching (repeatable)
        #[arg(long = "sentinel")]
        sentinels: Vec<String>,
        /// Also write the skipped records and warnings as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Add courselets concept ids to content files in place
    Courselets {
        /// Title export rows, [concept, ..., title]
        #[arg(long)]
        titles: PathBuf,
        /// Error export rows, [concept, ..., error text]
        #[arg(long)]
        errors: PathBuf,
        #[arg(required = true)]
        content: Vec<PathBuf>,
    },
    /// Export the responses of a merged content file as <stem>.csv
    Csv {
        input: PathBuf,
        /// Generic error model rows, [concept, isAbort, isFail, text]
        #[arg(long)]
        generic_em: Option<PathBuf>,
        /// Comma separated field paths, e.g. q.rustID,r.answer
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Extra row value as key=value, usable as a column (repeatable)
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, serde_json::Value)>,
        /// Omit the header row
        #[arg(long, default_value_t = false)]
        no_header: bool,
    },
    /// Print id, title, response count and date of every legacy question
    Report {
        legacy: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge { legacy, content, nword, sentinels, report } => {
            let sentinels = if sentinels.is_empty() {
                DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect()
            } else {
                sentinels
            };
            let config = MergeConfig { nword, sentinels };
            let (written, report) = run_merge(&legacy, &content, config, report.as_deref())?;
            println!("{}", merge_summary(&written, &report));
            Ok(())
        }
        Commands::Courselets { titles, errors, content } => {
            let (counts, _report) = run_courselets(&titles, &errors, &content)?;
            println!("Saved {} courseletsUL and {} courseletsError mappings", counts.titles, counts.errors);
            Ok(())
        }
        Commands::Csv { input, generic_em, columns, set, no_header } => {
            let opts = CsvOptions { generic_em, columns, extra: set.into_iter().collect(), header: !no_header };
            let (out, _report) = run_csv(&input, &opts)?;
            println!("wrote {}", out.display());
            Ok(())
        }
        Commands::Report { legacy } => {
            run_report(&legacy, std::io::stdout().lock())?;
            Ok(())
        }
    }
}
