//! Streams one remote file to disk.
//!
//! The body goes to a hidden `.partial` file next to its destination and is
//! renamed onto the final name only once complete, so a file with the final
//! name is always a whole download. Each chunk is flushed and synced before
//! the next one is accepted.

use std::{io, path::PathBuf, time::Duration};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, instrument};

use crate::enumerate::{LocalArtifact, RemoteResource};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("destination directory `{}` does not exist", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("server answered {status}")]
    Http { status: u16, body: String },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Server or network trouble that may go away on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Http { .. } | FetchError::Timeout | FetchError::Transport(_)
        )
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Fetches a remote resource into a local artifact, returning the bytes written.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        resource: &RemoteResource,
        artifact: &LocalArtifact,
    ) -> Result<u64, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Bound on a whole request, body included
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Size of each synced write
    pub chunk_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            chunk_size: 8 * 1024,
        }
    }
}

/// [`Fetch`] over HTTP.
pub struct HttpFetcher {
    client: Client,
    chunk_size: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(FetchError::from_reqwest)?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size.max(1),
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(skip_all, fields(url = %resource.url))]
    async fn fetch(
        &self,
        resource: &RemoteResource,
        artifact: &LocalArtifact,
    ) -> Result<u64, FetchError> {
        if !artifact.directory.is_dir() {
            return Err(FetchError::DirectoryNotFound(artifact.directory.clone()));
        }

        let response = self
            .client
            .get(&resource.url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        // Removed on drop unless persisted.
        let partial = tempfile::Builder::new()
            .prefix(&format!(".{}.", artifact.filename))
            .suffix(".partial")
            .tempfile_in(&artifact.directory)?;
        let mut file = File::from_std(partial.as_file().try_clone()?);

        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::from_reqwest)?;
            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece).await?;
                file.flush().await?;
                file.sync_data().await?;
                written += piece.len() as u64;
            }
        }
        drop(file);

        let path = artifact.path();
        partial.persist(&path).map_err(|e| FetchError::Io(e.error))?;
        debug!(path = %path.display(), bytes = written, "Saved");

        Ok(written)
    }
}

// -- Tests -------------------------------------------------------------------
