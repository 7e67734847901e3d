//! On-disk storage of cached fragment sequences

use super::key::CacheKey;
use crate::completion::Fragment;
use crate::error::{ParleyError, ParleyResult};
use crate::fs_util::{is_hidden, write_atomic};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const ENTRY_EXTENSION: &str = "json";

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub entries: usize,
    pub total_bytes: u64,
}

/// Flat directory of cache entries, one file per key, holding at most
/// `max_entries` files. Reads refresh an entry's modification time so
/// eviction removes the least recently used entries first.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    max_entries: usize,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            dir: dir.into(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Look up an entry. Missing, unreadable and corrupt entries are misses.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<Fragment>> {
        let path = self.entry_path(key);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<Vec<Fragment>>(&content) {
            Ok(fragments) => {
                if let Err(e) = touch(&path).await {
                    tracing::debug!("Failed to refresh cache entry time: {}", e);
                }
                Some(fragments)
            }
            Err(e) => {
                tracing::warn!("Discarding corrupt cache entry {}: {}", path.display(), e);
                let _ = tokio::fs::remove_file(&path).await;
                None
            }
        }
    }

    /// Store an entry, then evict the oldest entries above the limit
    pub async fn put(&self, key: &CacheKey, fragments: &[Fragment]) -> ParleyResult<()> {
        let content = serde_json::to_vec(fragments)?;
        write_atomic(&self.entry_path(key), &content)
            .await
            .map_err(|e| ParleyError::cache(format!("Failed to write entry {}: {}", key, e)))?;
        tracing::debug!("Cached {} fragments under {}", fragments.len(), key);
        self.evict().await
    }

    /// Remove entries beyond `max_entries`, least recently used first
    pub async fn evict(&self) -> ParleyResult<()> {
        let mut entries = self.entries().await?;
        if entries.len() <= self.max_entries {
            return Ok(());
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let excess = entries.len() - self.max_entries;
        for (path, _, _) in entries.into_iter().take(excess) {
            tracing::debug!("Evicting cache entry {}", path.display());
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Failed to evict {}: {}", path.display(), e);
            }
        }
        Ok(())
    }

    pub async fn clear(&self) -> ParleyResult<()> {
        for (path, _, _) in self.entries().await? {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    pub async fn statistics(&self) -> ParleyResult<CacheStatistics> {
        let entries = self.entries().await?;
        Ok(CacheStatistics {
            entries: entries.len(),
            total_bytes: entries.iter().map(|(_, _, len)| len).sum(),
        })
    }

    /// Entry files with their modification time and size
    async fn entries(&self) -> ParleyResult<Vec<(PathBuf, SystemTime, u64)>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ParleyError::io_at(&self.dir, e.to_string())),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name)
                || path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION)
            {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((path, modified, metadata.len()));
        }
        Ok(entries)
    }
}

async fn touch(path: &Path) -> std::io::Result<()> {
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await?
        .into_std()
        .await;
    tokio::task::spawn_blocking(move || file.set_modified(SystemTime::now()))
        .await
        .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionRequest, Message};
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(prompt: &str) -> CacheKey {
        CacheKey::for_request(&CompletionRequest::new("m", vec![Message::user(prompt)])).unwrap()
    }

    fn fragments(text: &str) -> Vec<Fragment> {
        vec![Fragment::Text(text.to_string())]
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path(), 10);
        let k = key("a");

        assert!(cache.get(&k).await.is_none());
        cache.put(&k, &fragments("hello")).await.unwrap();
        assert_eq!(cache.get(&k).await.unwrap(), fragments("hello"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path(), 10);
        let k = key("a");
        tokio::fs::write(temp_dir.path().join(format!("{}.json", k)), b"[{\"kind\":")
            .await
            .unwrap();

        assert!(cache.get(&k).await.is_none());
        assert_eq!(cache.statistics().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_eviction_keeps_most_recently_used() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path(), 2);
        let (a, b, c) = (key("a"), key("b"), key("c"));

        cache.put(&a, &fragments("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.put(&b, &fragments("b")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        // reading `a` makes `b` the least recently used
        assert!(cache.get(&a).await.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.put(&c, &fragments("c")).await.unwrap();

        assert!(cache.get(&a).await.is_some());
        assert!(cache.get(&b).await.is_none());
        assert!(cache.get(&c).await.is_some());
        assert_eq!(cache.statistics().await.unwrap().entries, 2);
    }

    #[tokio::test]
    async fn test_clear_ignores_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path(), 10);
        cache.put(&key("a"), &fragments("a")).await.unwrap();
        tokio::fs::write(temp_dir.path().join("notes.txt"), b"keep").await.unwrap();

        cache.clear().await.unwrap();
        assert_eq!(cache.statistics().await.unwrap().entries, 0);
        assert!(temp_dir.path().join("notes.txt").exists());
    }
}
