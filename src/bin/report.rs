// One-shot report: refresh once, aggregate, print YAML.

use anyhow::{Context, Result};
use clap::Parser;
use salesboard::{
    aggregate::{aggregate, FilterState},
    config::{Config, SourceKind},
};
use std::{env, path::PathBuf, process::exit};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Refresh the sales sheet once and print the dashboard view as YAML
#[derive(Parser, Debug, PartialEq)]
struct Args {
    /// YAML config file (defaults to $SALESBOARD_CONFIG, then built-ins)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read a local CSV export instead of the configured source
    #[arg(long)]
    csv: Option<PathBuf>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    district: Option<String>,

    #[arg(long)]
    owner: Option<String>,

    #[arg(long)]
    result: Option<String>,

    #[arg(long)]
    reason: Option<String>,

    /// Case-insensitive match on site name and notes
    #[arg(long)]
    search: Option<String>,

    /// Print the normalized records instead of the summary
    #[arg(long)]
    records: bool,
}

impl Args {
    fn filters(&self) -> FilterState {
        FilterState {
            region: self.region.clone(),
            district: self.district.clone(),
            owner: self.owner.clone(),
            result: self.result.clone(),
            reason: self.reason.clone(),
            search: self.search.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::WARN.into())),
        )
        .init();

    // usage errors exit 2, --help exits 0
    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(csv) = &args.csv {
        cfg.source.kind = SourceKind::File;
        cfg.source.path = Some(csv.clone());
    }
    let pipeline = cfg.pipeline().context("building pipeline")?;

    let records = match pipeline.refresh().await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("{}: {}", e.kind_tag(), e);
            exit(1);
        }
    };
    info!(records = records.len(), "refreshed");

    let yaml = if args.records {
        serde_yaml::to_string(&records)?
    } else {
        serde_yaml::to_string(&aggregate(&records, &args.filters(), &cfg.aggregate))?
    };
    print!("{yaml}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("report").chain(args.iter().copied()))
    }

    #[test]
    fn parses_filters_and_switches() {
        let args = parse(&[
            "--csv", "sales.csv", "--region=강원", "--search", "솔숲", "--records",
        ])
        .unwrap();
        assert_eq!(args.csv, Some(PathBuf::from("sales.csv")));
        assert!(args.records);
        assert!(args.config.is_none());
        let filters = args.filters();
        assert_eq!(filters.region.as_deref(), Some("강원"));
        assert_eq!(filters.search.as_deref(), Some("솔숲"));
    }

    #[test]
    fn no_args_means_unfiltered_summary() {
        let args = parse(&[]).unwrap();
        assert!(!args.records);
        assert!(args.filters().is_empty());
    }

    #[test]
    fn a_flag_is_never_taken_as_a_value() {
        let err = parse(&["--search", "--records"]).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::DisplayHelp);
        assert!(parse(&["--owner"]).is_err());
    }

    #[test]
    fn rejects_unknown_flags_and_offers_help() {
        assert_eq!(
            parse(&["--colour", "red"]).unwrap_err().kind(),
            ErrorKind::UnknownArgument
        );
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }
}
