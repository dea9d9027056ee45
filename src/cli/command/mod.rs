pub mod download;
pub mod dump;
pub mod extract;
pub mod fetch;
pub mod flatten;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

pub use download::download;
pub use dump::dump;
pub use extract::extract;
pub use fetch::fetch;
pub use flatten::flatten;

/// `~/icon-d2`, used when no destination root is given.
pub fn default_destination() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join("icon-d2"))
        .ok_or_else(|| anyhow!("no home directory, pass --dest"))
}

/// Retry list written next to the downloads, e.g. `failed-20221114.txt`.
pub fn make_failed_list_name(date: NaiveDate) -> String {
    format!("failed-{}.txt", date.format("%Y%m%d"))
}

// -- Tests -------------------------------------------------------------------
