//! Precompute daily regional means and save them to Parquet.

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::{
    boundary::BoundarySet,
    cli::{create_progress_bar, SeriesArgs},
    gas::{check_gas_id, normalize_gas, GasCatalog},
    parquet,
    raster::GeoTiffStore,
    series::{RasterSeriesSource, SeriesSource, TimeSeriesPoint},
};

use super::{load_config, make_series_file_name};

pub fn series(args: &SeriesArgs) -> Result<String> {
    if args.end < args.start {
        bail!("--end {} precedes --start {}", args.end, args.start);
    }

    let config = load_config(&args.data)?;
    let data = &config.data;
    let regions = BoundarySet::load(&data.regions, &data.region_id_field, &data.region_name_field)?;
    let region = regions.resolve(&args.region)?;
    let catalog = GasCatalog::load(data.gas_catalog.as_deref())?;
    let source = RasterSeriesSource::new(GeoTiffStore::new(&data.rasters_root));

    let file_path = match &args.output {
        Some(path) => path.clone(),
        None => make_series_file_name(args.start, args.end)?,
    };

    let bar = create_progress_bar(args.gases.len() as u64, "Clipping rasters".to_string());
    let mut points: Vec<TimeSeriesPoint> = Vec::new();
    for gas in &args.gases {
        let gas = normalize_gas(gas);
        check_gas_id(&gas)?;
        let profile = catalog.profile(&gas);
        bar.set_message(profile.id.clone());
        let gas_points = source
            .daily_means(&profile, region, args.start, args.end)
            .with_context(|| format!("{} means for `{}`", profile.id, region.name))?;
        info!(gas = %profile.id, region = %region.name, days = gas_points.len(), "daily means");
        points.extend(gas_points);
        bar.inc(1);
    }
    bar.finish_with_message("Daily means computed");

    parquet::save_series(&points, &file_path)
        .with_context(|| format!("writing `{}`", file_path.display()))?;

    Ok(file_path.to_string_lossy().to_string())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        cli::{Cli, Commands},
        fixtures::{date, Dataset},
    };

    fn args_fixture(dataset: &Dataset, output: &str, start: &str, end: &str) -> SeriesArgs {
        let rasters = dataset.rasters_root.to_string_lossy().to_string();
        let regions = dataset.regions.to_string_lossy().to_string();
        let argv = [
            "airrep", "series", "--gas", "co,NO2", "--region", "North", "--start", start, "--end", end,
            "--rasters", rasters.as_str(), "--regions", regions.as_str(), "--output", output,
        ];
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Series(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn should_save_means_for_every_gas() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO", "NO2"], date("2024-01-15"), 4);
        let output = tmp.path().join("series.parquet");

        series(&args_fixture(&dataset, &output.to_string_lossy(), "2024-01-01", "2024-01-31")).unwrap();

        let points = parquet::load_series(&output).unwrap();
        assert_eq!(points.len(), 8);
        assert!(points.iter().all(|p| p.region == "1"));
        assert_eq!(points.iter().filter(|p| p.gas == "NO2").count(), 4);
    }

    #[test]
    fn should_reject_reversed_range() {
        let tmp = TempDir::new().unwrap();
        let dataset = Dataset::build(tmp.path(), &["CO"], date("2024-01-15"), 1);
        let output = tmp.path().join("series.parquet");

        let err = series(&args_fixture(&dataset, &output.to_string_lossy(), "2024-01-31", "2024-01-01"))
            .unwrap_err();

        assert!(err.to_string().contains("precedes"));
        assert!(!output.exists());
    }
}
