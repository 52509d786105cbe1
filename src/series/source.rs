//! Where daily regional means come from.

use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    boundary::Region,
    error::Result,
    gas::GasProfile,
    parquet,
    raster::RasterSource,
};

use super::TimeSeriesPoint;

pub trait SeriesSource {
    /// Scaled daily means for the days in `[start, end]` that have data.
    fn daily_means(
        &self,
        profile: &GasProfile,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeSeriesPoint>>;

    /// Earliest day with data for the gas and region.
    fn earliest_date(&self, profile: &GasProfile, region: &Region) -> Result<Option<NaiveDate>>;
}

/// Clips each day's raster frame to the region polygon.
pub struct RasterSeriesSource<S> {
    rasters: S,
}

impl<S: RasterSource> RasterSeriesSource<S> {
    pub fn new(rasters: S) -> Self {
        RasterSeriesSource { rasters }
    }
}

impl<S: RasterSource> SeriesSource for RasterSeriesSource<S> {
    fn daily_means(
        &self,
        profile: &GasProfile,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeSeriesPoint>> {
        let mut points = Vec::new();
        for date in self.rasters.available_dates(&profile.id, start, end)? {
            let frame = self.rasters.frame(&profile.id, date)?;
            match frame.regional_mean(&region.geometry) {
                Some(raw) => points.push(TimeSeriesPoint {
                    date,
                    gas: profile.id.clone(),
                    region: region.id.clone(),
                    mean_value: profile.scale_mean(raw),
                }),
                None => debug!(gas = %profile.id, region = %region.id, %date, "no data cells"),
            }
        }

        Ok(points)
    }

    fn earliest_date(&self, profile: &GasProfile, _region: &Region) -> Result<Option<NaiveDate>> {
        self.rasters.earliest_date(&profile.id)
    }
}

/// Precomputed means read from a Parquet table written by `airrep series`.
pub struct ParquetSeriesSource {
    points: Vec<TimeSeriesPoint>,
}

impl ParquetSeriesSource {
    pub fn open(path: &Path) -> Result<Self> {
        let points = parquet::load_series(path)?;
        debug!(path = %path.display(), rows = points.len(), "loaded series table");

        Ok(ParquetSeriesSource { points })
    }

    fn matching<'a>(
        &'a self,
        profile: &'a GasProfile,
        region: &'a Region,
    ) -> impl Iterator<Item = &'a TimeSeriesPoint> + 'a {
        self.points
            .iter()
            .filter(move |p| p.gas == profile.id && p.region == region.id)
    }
}

impl SeriesSource for ParquetSeriesSource {
    fn daily_means(
        &self,
        profile: &GasProfile,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeSeriesPoint>> {
        Ok(self
            .matching(profile, region)
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect())
    }

    fn earliest_date(&self, profile: &GasProfile, region: &Region) -> Result<Option<NaiveDate>> {
        Ok(self.matching(profile, region).map(|p| p.date).min())
    }
}

// -- Tests -------------------------------------------------------------------
