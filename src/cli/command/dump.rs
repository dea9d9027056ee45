//! Dumps a grib file to JSON through the external `grib_dump` tool.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::info;

use crate::{
    cli::create_spinner,
    flatten::{write_json, write_pretty, DumpRecord},
    tool::{Dump, ExternalTool, GribDump},
};

/// Without `out` the dump goes to stdout and nothing else is printed there,
/// so the output can be redirected straight into a file for `flatten`.
pub async fn dump(
    file: &Path,
    program: &str,
    tool_args: &[String],
    out: Option<&PathBuf>,
) -> Result<String> {
    let dumper = GribDump::new(ExternalTool::new(program).with_args(tool_args.iter().cloned()));

    let Some(out) = out else {
        let record = dumper.dump(file).await?;
        print_dump(&record, io::stdout().lock())?;
        info!(file = %file.display(), messages = record.messages.len(), "Dumped");
        return Ok(String::new());
    };

    let bar = create_spinner(format!("Dumping {}...", file.display()));
    let record = dumper.dump(file).await?;
    write_json(&record, out)?;
    bar.finish_with_message("Dump complete");

    Ok(format!("Dump saved to `{}`", out.display()))
}

fn print_dump<W: Write>(record: &DumpRecord, mut writer: W) -> Result<()> {
    write_pretty(record, &mut writer)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
