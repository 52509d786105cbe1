//! Download a data bundle and unpack it into the data directory.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::{
    cli::create_spinner,
    download::{archive_path, download_tar_with_progress, extract_tar_with_progress},
};

pub async fn fetch(url: &str, data_dir: &Path) -> Result<String> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create `{}`", data_dir.display()))?;
    let tmp_dir = TempDir::new()?;
    let archive = archive_path(tmp_dir.path(), url);

    let bar = create_spinner("Downloading bundle...".to_string());
    download_tar_with_progress(url, &archive, &bar).await?;
    bar.finish_with_message("Bundle downloaded");

    let bar = create_spinner("Unpacking bundle...".to_string());
    let count = extract_tar_with_progress(&archive, data_dir, &bar)?;
    bar.finish_with_message(format!("Unpacked {count} files"));

    Ok(data_dir.to_string_lossy().to_string())
}
