//! Filesystem helpers

use crate::error::{ParleyError, ParleyResult};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Replace `path` with `contents` so readers never see a partial file.
///
/// The data goes to a hidden temp file in the same directory, which is then
/// renamed over the target.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> ParleyResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ParleyError::io_at(path, "path has no parent directory"))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| ParleyError::io_at(path, "path has no file name"))?
        .to_string_lossy();
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| ParleyError::io_at(parent, e.to_string()))?;

    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(ParleyError::io_at(path, e.to_string()));
    }
    Ok(())
}

/// Whether a directory entry is internal bookkeeping (dot files, temp files)
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
