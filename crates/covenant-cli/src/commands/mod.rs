//! Command implementations.

pub mod compare;
pub mod extract;
pub mod ingest;
pub mod manifest;

pub use self::compare::execute_compare;
pub use self::extract::execute_extract;
pub use self::ingest::execute_ingest;
pub use self::manifest::execute_manifest;

use crate::error::Result;
use std::path::Path;

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}
