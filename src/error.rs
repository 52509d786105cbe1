//! Errors raised while building a report.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Request parameters failed validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No boundary polygon for the requested region
    #[error("unknown region `{region}`: no boundary definition found")]
    UnknownRegion { region: String },

    /// No time-series values inside the requested window
    #[error("no {gas} data for region `{region}` between {start} and {end}")]
    DataUnavailable {
        gas: String,
        region: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// No raster frame stored for the gas and date
    #[error("no {gas} raster frame for {date}")]
    RasterUnavailable { gas: String, date: NaiveDate },

    #[error("I/O failure on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid raster `{}`: {reason}", path.display())]
    InvalidRaster { path: PathBuf, reason: String },

    #[error("invalid boundary file `{}`: {reason}", path.display())]
    InvalidBoundary { path: PathBuf, reason: String },

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document packaging error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ReportError {
    /// Taxonomy bucket shown to the user.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::InvalidRequest(_) => "InvalidRequest",
            ReportError::UnknownRegion { .. } => "UnknownRegion",
            ReportError::DataUnavailable { .. } => "DataUnavailable",
            ReportError::RasterUnavailable { .. } => "RasterUnavailable",
            ReportError::Io { .. } | ReportError::Zip(_) | ReportError::Image(_) => "IOFailure",
            ReportError::InvalidRaster { .. } | ReportError::Tiff(_) => "RasterUnavailable",
            ReportError::Parquet(_) | ReportError::Arrow(_) => "DataUnavailable",
            ReportError::InvalidBoundary { .. } | ReportError::Json(_) => "InvalidRequest",
            ReportError::Render(_) => "IOFailure",
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn render(err: impl std::fmt::Display) -> Self {
        ReportError::Render(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

// -- Tests -------------------------------------------------------------------
