//! Handles serialising and loading the daily mean table in the _parquet_ file format.

pub mod series;

pub use series::{load_series, save_series};
