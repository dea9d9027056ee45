//! Runs the external `grib_dump` tool from the directory of the file it decodes.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::flatten::DumpRecord;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {}: {stderr}", exit_description(.code))]
    Invocation {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("tool output is not valid JSON")]
    MalformedOutput(#[from] serde_json::Error),
    #[error("`{}` has no file name", .0.display())]
    NoFileName(PathBuf),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Turns a grib file into its JSON dump.
#[async_trait]
pub trait Dump: Send + Sync {
    async fn dump(&self, file: &Path) -> Result<DumpRecord, ToolError>;
}

/// A program plus the arguments placed before the per-call ones.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalTool {
    pub fn new(program: impl Into<String>) -> Self {
        ExternalTool {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the tool on `file` from the file's directory and returns stdout.
    async fn run_on(&self, extra: &[&str], file: &Path) -> Result<Vec<u8>, ToolError> {
        let (directory, file_name) = split_file(file)?;

        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        args.extend(extra.iter().map(OsString::from));
        args.push(file_name);
        debug!(program = %self.program, args = ?args, directory = %directory.display(), "Running");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&directory)
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::Invocation {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

fn split_file(file: &Path) -> Result<(PathBuf, OsString), ToolError> {
    let file_name = file
        .file_name()
        .ok_or_else(|| ToolError::NoFileName(file.to_path_buf()))?
        .to_os_string();
    let directory = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((directory, file_name))
}

/// `grib_dump -j <file>` from ecCodes.
#[derive(Debug, Clone)]
pub struct GribDump {
    tool: ExternalTool,
}

impl GribDump {
    pub fn new(tool: ExternalTool) -> Self {
        GribDump { tool }
    }
}

impl Default for GribDump {
    fn default() -> Self {
        GribDump::new(ExternalTool::new("grib_dump"))
    }
}

#[async_trait]
impl Dump for GribDump {
    async fn dump(&self, file: &Path) -> Result<DumpRecord, ToolError> {
        let stdout = self.tool.run_on(&["-j"], file).await?;
        Ok(serde_json::from_slice(&stdout)?)
    }
}

// -- Tests -------------------------------------------------------------------
