//! File-backed counter store
//!
//! One JSON document per key, named by the SHA-256 of the key:
//!
//! ```text
//! {dir}/{sha256_hex(key)}.json = {"requests": [ms, ...], "last_updated": ms}
//! ```
//!
//! Every hit holds an exclusive OS lock (`fs4`) on the file for the whole
//! read-modify-write, so processes sharing the directory serialize per key.
//!
//! ## Known race
//! [`FileCounterStore::purge_stale`] unlinks files it considers dead. A hit
//! that opened the same file just before the unlink writes into the orphaned
//! inode and its request is forgotten. The window only opens for keys idle for
//! longer than the purge age, so the worst case is one request under-counted.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::RateLimitConfig;
use super::store::{CounterStore, StoreError, StoreResult};
use super::window::{self, WindowSnapshot};
use crate::crypto::sha256_hex;

/// On-disk record for one key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CounterRecord {
    requests: Vec<i64>,
    last_updated: i64,
}

#[derive(Debug, Clone)]
pub struct FileCounterStore {
    dir: PathBuf,
}

impl FileCounterStore {
    /// Open (and create if needed) the counter directory
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sha256_hex(key.as_bytes())))
    }

    /// Delete records not updated within `max_age_ms`
    ///
    /// Files locked by an in-flight hit are skipped.
    pub async fn purge_stale(&self, now_ms: i64, max_age_ms: i64) -> StoreResult<usize> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || purge_blocking(&dir, now_ms - max_age_ms))
            .await
            .map_err(|e| StoreError::Unavailable(format!("purge task failed: {e}")))?
    }
}

impl CounterStore for FileCounterStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        let path = self.path_for(key);
        let config = *config;
        tokio::task::spawn_blocking(move || hit_blocking(&path, now_ms, &config))
            .await
            .map_err(|e| StoreError::Unavailable(format!("file store task failed: {e}")))?
    }

    async fn peek(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        let path = self.path_for(key);
        let config = *config;
        tokio::task::spawn_blocking(move || peek_blocking(&path, now_ms, &config))
            .await
            .map_err(|e| StoreError::Unavailable(format!("file store task failed: {e}")))?
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

// ============================================================================
// Blocking helpers
// ============================================================================

fn hit_blocking(path: &Path, now_ms: i64, config: &RateLimitConfig) -> StoreResult<WindowSnapshot> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    FileExt::lock_exclusive(&file)?;
    let result = read_modify_write(&mut file, path, now_ms, config);
    if let Err(e) = FileExt::unlock(&file) {
        debug!(path = %path.display(), error = %e, "Counter file unlock failed (closing releases it)");
    }
    result
}

fn read_modify_write(
    file: &mut File,
    path: &Path,
    now_ms: i64,
    config: &RateLimitConfig,
) -> StoreResult<WindowSnapshot> {
    let mut record = read_record(file, path)?;
    let snapshot = window::hit(&mut record.requests, now_ms, config);
    record.last_updated = now_ms;

    let body = serde_json::to_vec(&record)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&body)?;
    file.flush()?;

    Ok(snapshot)
}

fn peek_blocking(path: &Path, now_ms: i64, config: &RateLimitConfig) -> StoreResult<WindowSnapshot> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(window::peek(&[], now_ms, config));
        }
        Err(e) => return Err(e.into()),
    };

    FileExt::lock_shared(&file)?;
    let record = read_record(&mut file, path);
    let _ = FileExt::unlock(&file);

    Ok(window::peek(&record?.requests, now_ms, config))
}

/// Read the record; an empty or unreadable document starts a fresh window
fn read_record(file: &mut File, path: &Path) -> StoreResult<CounterRecord> {
    let mut raw = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut raw)?;

    if raw.trim().is_empty() {
        return Ok(CounterRecord::default());
    }

    match serde_json::from_str(&raw) {
        Ok(record) => Ok(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt rate limit record, resetting");
            Ok(CounterRecord::default())
        }
    }
}

fn purge_blocking(dir: &Path, cutoff_ms: i64) -> StoreResult<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let mut file = match OpenOptions::new().read(true).open(&path) {
            Ok(file) => file,
            Err(_) => continue,
        };

        // Busy files are live by definition
        if !FileExt::try_lock_exclusive(&file).unwrap_or(false) {
            continue;
        }

        let stale = read_record(&mut file, &path)
            .map(|record| record.last_updated <= cutoff_ms)
            .unwrap_or(true);

        if stale && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
        let _ = FileExt::unlock(&file);
    }

    if removed > 0 {
        debug!(dir = %dir.display(), removed, "Purged stale rate limit records");
    }
    Ok(removed)
}
