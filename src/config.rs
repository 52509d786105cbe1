//! Report configuration.
//!
//! Every component receives the pieces of [`ReportConfig`] it needs; there is
//! no global state. Defaults reproduce the layout of the daily air-quality
//! bulletin and can be overridden from a JSON file and then from the command
//! line.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub data: DataConfig,
    pub map: MapStyle,
    pub chart: ChartStyle,
    pub document: DocumentStyle,
    /// Directory that receives copies of the intermediate PNGs. When unset
    /// they are removed together with the run's scratch directory.
    pub keep_images: Option<PathBuf>,
}

impl ReportConfig {
    /// Loads a config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(ReportConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of the GeoTIFF store, one sub-directory per gas.
    pub rasters_root: PathBuf,
    /// GeoJSON FeatureCollection with the region polygons.
    pub regions: PathBuf,
    /// Optional GeoJSON with district outlines drawn as the base layer.
    pub districts: Option<PathBuf>,
    pub region_id_field: String,
    pub region_name_field: String,
    /// Optional JSON catalog with gas display names, units and texts.
    pub gas_catalog: Option<PathBuf>,
    /// Optional Parquet table of precomputed daily means.
    pub series: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            rasters_root: PathBuf::from("rasters"),
            regions: PathBuf::from("regions.geojson"),
            districts: None,
            region_id_field: "parent_cod".to_string(),
            region_name_field: "region_nam".to_string(),
            gas_catalog: None,
            series: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapStyle {
    /// Output width in pixels; the height follows the extent's aspect.
    pub width: u32,
    /// Height of the legend strip under the map.
    pub legend_height: u32,
    /// Fraction of the extent added on each side.
    pub zoom_pad: f64,
    pub clip_low_percentile: f64,
    pub clip_high_percentile: f64,
    pub base_color: String,
    pub base_width_overview: u32,
    pub base_width_zoomed: u32,
    pub highlight_color: String,
    pub highlight_width: u32,
    pub nodata_color: String,
    pub legend_ticks: usize,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            width: 1600,
            legend_height: 110,
            zoom_pad: 0.10,
            clip_low_percentile: 2.0,
            clip_high_percentile: 98.0,
            base_color: "#111111".to_string(),
            base_width_overview: 2,
            base_width_zoomed: 1,
            highlight_color: "#FFFFFF".to_string(),
            highlight_width: 3,
            nodata_color: "#FF00FF".to_string(),
            legend_ticks: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub line_color: String,
    pub line_width: u32,
    pub marker_size: u32,
    pub date_format: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 640,
            line_color: "#1F77B4".to_string(),
            line_width: 2,
            marker_size: 4,
            date_format: "%m.%d".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStyle {
    pub font: String,
    pub font_size_pt: u32,
    /// Width of every embedded picture, in inches.
    pub image_width_in: f64,
    pub language: Language,
}

impl Default for DocumentStyle {
    fn default() -> Self {
        Self {
            font: "Times New Roman".to_string(),
            font_size_pt: 14,
            image_width_in: 6.5,
            language: Language::Uz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Uz,
    En,
}

/// Parses `#RRGGBB` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Result<RGBColor> {
    let hex = value.trim().trim_start_matches('#');
    let invalid = || ReportError::InvalidRequest(format!("invalid colour `{value}`"));

    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());

    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

// -- Tests -------------------------------------------------------------------
