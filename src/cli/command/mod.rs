pub mod fetch;
pub mod report;
pub mod series;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use crate::config::ReportConfig;

use super::DataArgs;

pub use fetch::fetch;
pub use report::report;
pub use series::series;

/// `~/airrep-<date>-<region>.docx`
pub fn make_report_file_name(date: NaiveDate, region: &str) -> Result<PathBuf> {
    let file_name = format!("airrep-{}-{}.docx", date.format("%Y-%m-%d"), file_safe(region));

    Ok(home_dir()?.join(file_name))
}

/// `~/airrep-series-<start>-<end>.parquet`
pub fn make_series_file_name(start: NaiveDate, end: NaiveDate) -> Result<PathBuf> {
    let file_name = format!(
        "airrep-series-{}-{}.parquet",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );

    Ok(home_dir()?.join(file_name))
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("cannot determine the home directory; pass --output"))
}

// Region names may contain spaces or apostrophes
fn file_safe(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Loads the config file, then applies the data flags on top.
pub fn load_config(data: &DataArgs) -> Result<ReportConfig> {
    let mut config =
        ReportConfig::load(data.config.as_deref()).context("loading configuration")?;

    if let Some(rasters) = &data.rasters {
        config.data.rasters_root.clone_from(rasters);
    }
    if let Some(regions) = &data.regions {
        config.data.regions.clone_from(regions);
    }

    Ok(config)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::*;
    use crate::fixtures::date;

    #[test]
    fn should_make_report_file_name() {
        let path = make_report_file_name(date("2024-01-15"), "Toshkent sh.").unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "airrep-2024-01-15-Toshkent_sh_.docx"
        );
    }

    #[test]
    fn should_make_series_file_name() {
        let path = make_series_file_name(date("2024-01-01"), date("2024-01-31")).unwrap();

        assert!(path.ends_with("airrep-series-2024-01-01-2024-01-31.parquet"));
    }

    #[test]
    fn should_override_config_with_flags() {
        let data = DataArgs {
            config: None,
            rasters: Some(PathBuf::from("/srv/ads")),
            regions: None,
        };

        let config = load_config(&data).unwrap();

        assert_eq!(config.data.rasters_root, Path::new("/srv/ads"));
        assert_eq!(config.data.regions, Path::new("regions.geojson"));
    }
}
