//! Intermediate images produced while building a report.

use std::path::PathBuf;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    OverviewMap,
    ZoomedMap,
    TimeseriesChart,
}

impl ImageKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            ImageKind::OverviewMap => "overview",
            ImageKind::ZoomedMap => "zoomed",
            ImageKind::TimeseriesChart => "chart",
        }
    }

    /// `<GAS>_<date>_<kind>.png`
    pub fn file_name(&self, gas: &str, date: NaiveDate) -> String {
        format!("{}_{}_{}.png", gas, date.format("%Y-%m-%d"), self.suffix())
    }
}

/// A PNG on disk together with its pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub path: PathBuf,
    pub kind: ImageKind,
    pub gas: String,
    pub width: u32,
    pub height: u32,
}
