//! Decompresses downloaded `.bz2` files next to the compressed original.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bzip2::read::MultiBzDecoder;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("`{}` is not a .bz2 file", .0.display())]
    NotCompressed(PathBuf),
    #[error("could not decompress `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Decompresses a downloaded file, returning the decompressed path.
#[async_trait]
pub trait Extract: Send + Sync {
    async fn extract(&self, file: &Path) -> Result<PathBuf, ExtractError>;
}

/// `foo.grib2.bz2` → `foo.grib2`.
pub fn decompressed_path(file: &Path) -> Result<PathBuf, ExtractError> {
    match file.extension() {
        Some(ext) if ext == "bz2" => Ok(file.with_extension("")),
        _ => Err(ExtractError::NotCompressed(file.to_path_buf())),
    }
}

/// In-process bzip2. The original is kept and an existing target is replaced.
#[derive(Debug, Clone, Default)]
pub struct Bunzip;

// Same commit discipline as the fetcher: a hidden `.partial` file that only
// becomes `target` once fully written and synced.
fn decompress(file: &Path, target: &Path) -> io::Result<u64> {
    let directory = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut decoder = MultiBzDecoder::new(BufReader::new(File::open(file)?));
    let mut partial = tempfile::Builder::new()
        .prefix(".")
        .suffix(".partial")
        .tempfile_in(directory)?;

    let written = io::copy(&mut decoder, partial.as_file_mut())?;
    partial.as_file().sync_all()?;
    partial.persist(target).map_err(|e| e.error)?;

    Ok(written)
}

#[async_trait]
impl Extract for Bunzip {
    async fn extract(&self, file: &Path) -> Result<PathBuf, ExtractError> {
        let target = decompressed_path(file)?;
        let (source, destination) = (file.to_path_buf(), target.clone());

        let written = tokio::task::spawn_blocking(move || decompress(&source, &destination))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result)
            .map_err(|source| ExtractError::Io {
                path: file.to_path_buf(),
                source,
            })?;
        debug!(file = %file.display(), target = %target.display(), bytes = written, "Decompressed");

        Ok(target)
    }
}

// -- Tests -------------------------------------------------------------------
