//! Line chart of a regional time series.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::{
    artifact::{GeneratedImage, ImageKind},
    boundary::Region,
    config::{parse_hex_color, ChartStyle, Language},
    error::{ReportError, Result},
    fonts,
    gas::GasProfile,
    report::locale::Locale,
};

use super::{window_start, SeriesSource, TimeSeries};

/// At most this many date labels on long windows.
const MAX_DATE_LABELS: u32 = 15;

/// Draws a time series into a PNG file and returns its pixel size.
pub trait ChartRenderer {
    fn render(&self, series: &TimeSeries, profile: &GasProfile, path: &Path) -> Result<(u32, u32)>;
}

/// Retrieves the daily means of the window ending on `end_date` and renders
/// them as a line chart.
pub fn render_timeseries(
    source: &dyn SeriesSource,
    renderer: &dyn ChartRenderer,
    profile: &GasProfile,
    region: &Region,
    end_date: NaiveDate,
    period_days: u32,
    out_dir: &Path,
) -> Result<GeneratedImage> {
    if period_days == 0 {
        return Err(ReportError::InvalidRequest(
            "period must be at least one day".to_string(),
        ));
    }

    let start = window_start(end_date, period_days).ok_or_else(|| {
        ReportError::InvalidRequest(format!(
            "a {period_days}-day period ending on {end_date} is outside the supported dates"
        ))
    })?;
    let unavailable = || ReportError::DataUnavailable {
        gas: profile.id.clone(),
        region: region.name.clone(),
        start,
        end: end_date,
    };

    match source.earliest_date(profile, region)? {
        Some(earliest) if earliest <= end_date => {}
        _ => return Err(unavailable()),
    }

    let points = source.daily_means(profile, region, start, end_date)?;
    let series = TimeSeries::new(&profile.id, &region.name, start, end_date, points);
    if series.points.is_empty() {
        return Err(unavailable());
    }
    let missing = series.days() as usize - series.points.len();
    if missing > 0 {
        warn!(gas = %profile.id, region = %region.name, missing, "days without data are left as gaps");
    }

    let kind = ImageKind::TimeseriesChart;
    let path = out_dir.join(kind.file_name(&profile.id, end_date));
    let (width, height) = renderer.render(&series, profile, &path)?;

    Ok(GeneratedImage {
        path,
        kind,
        gas: profile.id.clone(),
        width,
        height,
    })
}

/// Every day up to a week, every other day up to 15 days, then a step that
/// keeps the label count bounded.
pub fn label_step(days: u32) -> u32 {
    match days {
        0..=7 => 1,
        8..=15 => 2,
        n => n.div_ceil(MAX_DATE_LABELS),
    }
}

pub struct PlottersChartRenderer {
    style: ChartStyle,
    locale: Locale,
    line_color: RGBColor,
}

impl PlottersChartRenderer {
    pub fn new(style: ChartStyle, language: Language) -> Result<Self> {
        Ok(PlottersChartRenderer {
            line_color: parse_hex_color(&style.line_color)?,
            locale: Locale::new(language),
            style,
        })
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        series: &TimeSeries,
        profile: &GasProfile,
    ) -> Result<()> {
        root.fill(&WHITE).map_err(ReportError::render)?;

        let days = series.days() as i32;
        let (y_min, y_max) = value_range(series);
        let title = self
            .locale
            .chart_title(&series.gas, &series.region_name, series.end.year());

        let mut chart = ChartBuilder::on(root)
            .caption(title, (fonts::FAMILY, 26))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(90)
            .build_cartesian_2d(-1..days, y_min..y_max)
            .map_err(ReportError::render)?;

        let step = label_step(series.days()) as i32;
        let x_label = |x: &i32| {
            // anchored on the end date so it is always labelled
            if *x < 0 || *x >= days || (days - 1 - *x) % step != 0 {
                return String::new();
            }
            series
                .date_at(*x)
                .format(&self.style.date_format)
                .to_string()
        };
        let y_label = |y: &f64| format!("{y:.3}");

        chart
            .configure_mesh()
            .x_labels(days as usize + 2)
            .y_labels(8)
            .x_label_formatter(&x_label)
            .y_label_formatter(&y_label)
            .y_desc(self.locale.chart_y_label(&profile.chart_unit))
            .label_style((fonts::FAMILY, 15))
            .axis_desc_style((fonts::FAMILY, 17))
            .bold_line_style(BLACK.mix(0.12))
            .light_line_style(TRANSPARENT)
            .draw()
            .map_err(ReportError::render)?;

        let line = self.line_color.stroke_width(self.style.line_width);
        for segment in series.segments() {
            chart
                .draw_series(LineSeries::new(
                    segment
                        .iter()
                        .map(|p| (series.offset(p.date), p.mean_value)),
                    line,
                ))
                .map_err(ReportError::render)?;
        }

        chart
            .draw_series(series.points.iter().map(|p| {
                Circle::new(
                    (series.offset(p.date), p.mean_value),
                    self.style.marker_size,
                    self.line_color.filled(),
                )
            }))
            .map_err(ReportError::render)?;

        Ok(())
    }
}

impl ChartRenderer for PlottersChartRenderer {
    fn render(&self, series: &TimeSeries, profile: &GasProfile, path: &Path) -> Result<(u32, u32)> {
        fonts::ensure_registered()?;

        let (width, height) = (self.style.width.max(64), self.style.height.max(64));
        let mut buf = vec![255u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            self.draw(&root, series, profile)?;
            root.present().map_err(ReportError::render)?;
        }

        let image = RgbImage::from_raw(width, height, buf)
            .ok_or_else(|| ReportError::Render("chart buffer size mismatch".to_string()))?;
        image.save_with_format(path, ImageFormat::Png)?;
        debug!(path = %path.display(), points = series.points.len(), "chart written");

        Ok((width, height))
    }
}

/// Data range padded by a tenth of its span; flat series get a small band.
fn value_range(series: &TimeSeries) -> (f64, f64) {
    let (min, max) = series
        .points
        .iter()
        .map(|p| p.mean_value)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let pad = if max > min {
        (max - min) * 0.1
    } else {
        (max.abs() * 0.1).max(1e-3)
    };

    (min - pad, max + pad)
}

// -- Tests -------------------------------------------------------------------
