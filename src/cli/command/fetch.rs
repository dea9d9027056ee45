//! Downloads a single URL into an existing directory.

use std::{path::Path, time::Duration};

use anyhow::Result;

use crate::{
    cli::create_spinner,
    download::{Fetch, FetchConfig, HttpFetcher},
    enumerate::PlannedDownload,
};

pub async fn fetch(url: &str, dir: &Path, timeout: u64) -> Result<String> {
    let planned = PlannedDownload::from_url(url, dir);
    let fetcher = HttpFetcher::new(&FetchConfig {
        request_timeout: Duration::from_secs(timeout),
        ..FetchConfig::default()
    })?;

    let bar = create_spinner(format!("Downloading {}...", planned.resource.basename()));
    let written = fetcher.fetch(&planned.resource, &planned.artifact).await?;
    bar.finish_with_message("Download complete");

    Ok(format!(
        "File saved to `{}` ({} bytes)",
        planned.artifact.path().display(),
        written
    ))
}

// -- Tests -------------------------------------------------------------------
