//! Downloads and extracts data bundles.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Error, Result};
use flate2::read::GzDecoder;
use futures::StreamExt;
use indicatif::ProgressBar;
use tar::Archive;
use tracing::debug;

use crate::cli::bar_style;

/// Downloads with progress bar based on content length
pub async fn download_tar_with_progress(
    url: &str,
    file_path: &Path,
    progress_bar: &ProgressBar,
) -> Result<(), Error> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to download `{url}`"))?;

    if !response.status().is_success() {
        bail!("Failed to download `{url}`: {}", response.status());
    }

    // Switch from spinner to bar once the size is known
    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        progress_bar.set_style(bar_style(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
        ));
    }

    let mut file = File::create(file_path)
        .with_context(|| format!("Failed to create `{}`", file_path.display()))?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.context("Error reading chunk")?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }
    debug!(url, bytes = downloaded, path = %file_path.display(), "download complete");

    Ok(())
}

/// Extracts the tarball with progress tracking by counting entries
pub fn extract_tar_with_progress(
    tar_gz_path: &Path,
    working_dir: &Path,
    progress_bar: &ProgressBar,
) -> Result<u64, Error> {
    // First pass: count entries
    let total_entries = open_archive(tar_gz_path)?.entries()?.count() as u64;

    progress_bar.set_length(total_entries);
    progress_bar.set_style(bar_style(
        "{msg} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {eta}",
    ));

    // Second pass: extract
    let mut archive = open_archive(tar_gz_path)?;
    let mut count = 0u64;
    for entry in archive.entries()? {
        let mut entry = entry?;
        entry
            .unpack_in(working_dir)
            .with_context(|| format!("Failed to unpack into `{}`", working_dir.display()))?;
        count += 1;
        progress_bar.set_position(count);
    }

    Ok(count)
}

fn open_archive(tar_gz_path: &Path) -> Result<Archive<GzDecoder<File>>> {
    let tar_gz = File::open(tar_gz_path)
        .with_context(|| format!("Failed to open `{}`", tar_gz_path.display()))?;

    Ok(Archive::new(GzDecoder::new(tar_gz)))
}

/// Last path segment of the URL, without any query string.
pub fn archive_file_name(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("bundle.tar.gz")
        .to_string()
}

/// Path of the archive inside `dir`.
pub fn archive_path(dir: &Path, url: &str) -> PathBuf {
    dir.join(archive_file_name(url))
}

// -- Tests -------------------------------------------------------------------
