use std::path::Path;

use anyhow::Result;

use crate::flatten::flatten_file;

pub fn flatten(file: &Path) -> Result<String> {
    let target = flatten_file(file)?;

    Ok(format!("Flattened file saved to `{}`", target.display()))
}
