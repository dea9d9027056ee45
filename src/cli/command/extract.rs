use std::path::Path;

use anyhow::Result;

use crate::{
    cli::create_spinner,
    extract::{Bunzip, Extract},
};

pub async fn extract(file: &Path) -> Result<String> {
    let bar = create_spinner(format!("Decompressing {}...", file.display()));
    let extracted = Bunzip.extract(file).await?;
    bar.finish_with_message("Decompressed");

    Ok(format!("File extracted to `{}`", extracted.display()))
}

// -- Tests -------------------------------------------------------------------
