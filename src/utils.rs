use anyhow::Result;
use log::debug;
use std::path::Path;
use tokio::fs;

/// Creates a directory (and its parents) if it does not exist yet.
pub async fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).await?;
        debug!("Created directory at: {:?}", path);
    }
    Ok(())
}
