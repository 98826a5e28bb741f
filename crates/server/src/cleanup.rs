use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delete regular files in `dir` last modified at least `retention` ago.
/// Returns how many were removed.
pub async fn sweep(dir: &Path, retention: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < retention {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("Removed expired file {}", entry.path().display());
                removed += 1;
            }
            Err(e) => warn!("Could not remove {}: {e}", entry.path().display()),
        }
    }
    Ok(removed)
}

/// Run [`sweep`] every `interval` for the life of the process.
pub fn spawn(dir: PathBuf, retention: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sweep(&dir, retention).await {
                Ok(0) => {}
                Ok(n) => info!("Cleanup removed {n} file(s) from {}", dir.display()),
                Err(e) => warn!("Cleanup of {} failed: {e}", dir.display()),
            }
        }
    })
}
