//! Dated GeoTIFF frames on disk, one directory per gas.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    error::{ReportError, Result},
    gas::normalize_gas,
};

use super::RasterFrame;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%d-%m-%Y"];

/// Where raster frames come from.
pub trait RasterSource {
    /// Full-extent frame for the gas and day.
    fn frame(&self, gas: &str, date: NaiveDate) -> Result<RasterFrame>;

    /// Days with a frame for `gas` within `[start, end]`.
    fn available_dates(&self, gas: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<NaiveDate>>;

    /// Earliest day with a frame for `gas`.
    fn earliest_date(&self, gas: &str) -> Result<Option<NaiveDate>>;
}

/// `<root>/<GAS>/<GAS>_<YYYY-MM-DD>.tif`, as written by the CAMS downloader.
#[derive(Debug, Clone)]
pub struct GeoTiffStore {
    root: PathBuf,
}

impl GeoTiffStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        GeoTiffStore { root: root.into() }
    }

    fn gas_dir(&self, gas: &str) -> PathBuf {
        self.root.join(normalize_gas(gas))
    }

    /// Conventional file names first, then any dated file for that day.
    pub fn frame_path(&self, gas: &str, date: NaiveDate) -> Result<Option<PathBuf>> {
        let gas = normalize_gas(gas);
        let dir = self.gas_dir(&gas);
        let day = date.format("%Y-%m-%d");

        for candidate in [format!("{gas}_{day}.tif"), format!("{gas}_{day}_ADS.tif")] {
            let path = dir.join(candidate);
            if path.is_file() {
                return Ok(Some(path));
            }
        }

        Ok(self.dated_files(&gas)?.remove(&date))
    }

    /// Every parseable frame for `gas`, one path per day. When a day has
    /// several files the last one in path order wins.
    pub fn dated_files(&self, gas: &str) -> Result<BTreeMap<NaiveDate, PathBuf>> {
        let dir = self.gas_dir(gas);
        if !dir.is_dir() {
            return Ok(BTreeMap::new());
        }

        let mut paths = fs::read_dir(&dir)
            .map_err(|e| ReportError::io(&dir, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| ReportError::io(&dir, e))?;
        paths.retain(|p| is_tiff(p));
        paths.sort();

        let mut by_day = BTreeMap::new();
        for path in paths {
            match date_from_file_name(&path) {
                Some(date) => {
                    by_day.insert(date, path);
                }
                None => debug!(path = %path.display(), "skipping raster without a date"),
            }
        }

        Ok(by_day)
    }
}

impl RasterSource for GeoTiffStore {
    fn frame(&self, gas: &str, date: NaiveDate) -> Result<RasterFrame> {
        let path = self
            .frame_path(gas, date)?
            .ok_or_else(|| ReportError::RasterUnavailable {
                gas: normalize_gas(gas),
                date,
            })?;
        debug!(path = %path.display(), "loading raster frame");

        RasterFrame::open(&path)
    }

    fn available_dates(
        &self,
        gas: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        Ok(self
            .dated_files(gas)?
            .range(start..=end)
            .map(|(date, _)| *date)
            .collect())
    }

    fn earliest_date(&self, gas: &str) -> Result<Option<NaiveDate>> {
        Ok(self.dated_files(gas)?.keys().next().copied())
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

/// Takes the last `_`-separated token of the stem that parses as a date, so
/// both `CO_2024-01-15.tif` and `CO_2024-01-15_ADS.tif` resolve.
pub fn date_from_file_name(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit('_').find_map(|token| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
    })
}

// -- Tests -------------------------------------------------------------------
