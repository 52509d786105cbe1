//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Language;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    /// Log debug events
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the DOCX report for one region and date
    Report(ReportArgs),
    /// Precompute daily regional means into a Parquet table
    Series(SeriesArgs),
    /// Download and unpack a data bundle
    Fetch {
        /// URL of a .tar.gz bundle
        #[arg(long)]
        url: String,
        /// Directory the bundle is unpacked into
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
}

/// Data locations shared by `report` and `series`.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Root of the GeoTIFF store
    #[arg(long)]
    pub rasters: Option<PathBuf>,
    /// GeoJSON with the region polygons
    #[arg(long)]
    pub regions: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Gas identifiers, repeated or comma separated
    #[arg(long = "gas", required = true, value_delimiter = ',')]
    pub gases: Vec<String>,
    /// Report date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
    /// Region id or name
    #[arg(long)]
    pub region: String,
    /// Days covered by the charts
    #[arg(long, default_value_t = 30)]
    pub period_days: u32,
    /// Output document, defaults to ~/airrep-<date>-<region>.docx
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub data: DataArgs,
    /// GeoJSON with district outlines
    #[arg(long)]
    pub districts: Option<PathBuf>,
    /// Parquet table written by `series`
    #[arg(long)]
    pub series: Option<PathBuf>,
    /// JSON gas catalog
    #[arg(long)]
    pub gas_catalog: Option<PathBuf>,
    /// Copy the intermediate PNGs into this directory
    #[arg(long)]
    pub keep_images: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub language: Option<Language>,
}

#[derive(Args, Debug, Clone)]
pub struct SeriesArgs {
    /// Gas identifiers, repeated or comma separated
    #[arg(long = "gas", required = true, value_delimiter = ',')]
    pub gases: Vec<String>,
    /// Region id or name
    #[arg(long)]
    pub region: String,
    #[arg(long)]
    pub start: NaiveDate,
    #[arg(long)]
    pub end: NaiveDate,
    /// Output table, defaults to ~/airrep-series-<start>-<end>.parquet
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub data: DataArgs,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size)
        .with_message(message)
        .with_style(bar_style("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}"))
}

/// Template style with the crate's progress characters; a bad template
/// falls back to the plain bar.
pub fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_parse_report_command() {
        let cli = Cli::try_parse_from([
            "airrep", "report", "--gas", "no2,co", "--gas", "SO2", "--date", "2024-01-15",
            "--region", "North", "--language", "en", "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.gases, vec!["no2", "co", "SO2"]);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(args.period_days, 30);
        assert_eq!(args.language, Some(Language::En));
        assert!(args.output.is_none());
    }

    #[test]
    fn should_require_gas_and_valid_date() {
        assert!(Cli::try_parse_from(["airrep", "report", "--date", "2024-01-15", "--region", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "airrep", "report", "--gas", "CO", "--date", "15.01.2024", "--region", "1"
        ])
        .is_err());
    }

    #[test]
    fn should_parse_series_and_fetch_commands() {
        let cli = Cli::try_parse_from([
            "airrep", "series", "--gas", "CO", "--region", "1", "--start", "2024-01-01",
            "--end", "2024-01-31", "--rasters", "/srv/ads",
        ])
        .unwrap();
        let Commands::Series(args) = cli.command else {
            panic!("expected series command");
        };
        assert_eq!(args.data.rasters, Some(PathBuf::from("/srv/ads")));

        let cli = Cli::try_parse_from(["airrep", "fetch", "--url", "http://localhost/b.tar.gz"]).unwrap();
        assert!(matches!(cli.command, Commands::Fetch { ref data_dir, .. } if data_dir == &PathBuf::from(".")));
    }

    #[test]
    fn should_count_progress() {
        let bar = create_progress_bar(3, "Rendering".to_string());
        bar.inc(2);

        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(3));
    }
}
