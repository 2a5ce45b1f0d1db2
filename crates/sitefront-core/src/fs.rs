//! Filesystem helpers.

use std::path::Path;

use crate::error::Result;

/// Write `data` to `path`, creating missing parent directories first.
pub async fn write_file_create_dirs(path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, data).await?;
    Ok(())
}
