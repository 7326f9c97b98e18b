//! Hash-sharded local filesystem backend.
//!
//! Each identity is addressed by the MD5 hex digest of its identity string
//! and stored at `<root>/<hash[0..2]>/<hash[2..4]>/<hash>.json`. The backend
//! keeps no index of its own; enumeration walks the tree.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use memostore_core::config::backend::FileBackendConfig;
use memostore_core::error::{AppError, ErrorKind};
use memostore_core::result::AppResult;
use memostore_core::traits::backend::{Lookup, StorageBackend};
use memostore_core::types::entry::{Entry, STORAGE_PATH};

/// Length of an MD5 hex digest.
const HASH_LEN: usize = 32;

/// Suffix of entry files.
const ENTRY_SUFFIX: &str = ".json";

/// Age after which an orphaned temp file is removed by `list`.
const STALE_TEMP_AGE: Duration = Duration::from_secs(15 * 60);

/// Where an identity lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLocation {
    /// Hex digest of the identity string.
    pub hash: String,
    /// Two-level shard directory holding the entry.
    pub shard_dir: PathBuf,
    /// Entry path without extension. Generators may place sibling files
    /// under this base name.
    pub base_path: PathBuf,
    /// The `.json` entry file.
    pub entry_file: PathBuf,
}

/// Local filesystem backend.
#[derive(Debug, Clone)]
pub struct FileBackend {
    /// Root directory of the shard tree.
    root: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at the given path. The root is created
    /// lazily by the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "Initializing file storage backend");
        Self { root }
    }

    /// Create a backend from configuration.
    pub fn from_config(config: &FileBackendConfig) -> Self {
        Self::new(&config.root_path)
    }

    /// Root directory of the shard tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the on-disk location of an identity.
    pub fn locate(&self, identity: &str) -> EntryLocation {
        let hash = format!("{:x}", md5::compute(identity.as_bytes()));
        let shard_dir = self.root.join(&hash[0..2]).join(&hash[2..4]);
        let base_path = shard_dir.join(&hash);
        let entry_file = shard_dir.join(format!("{hash}{ENTRY_SUFFIX}"));
        EntryLocation {
            hash,
            shard_dir,
            base_path,
            entry_file,
        }
    }

    /// Write the entry to a temporary sibling and rename it into place so
    /// readers never observe a partially written file.
    async fn write_atomic(&self, location: &EntryLocation, data: &[u8]) -> AppResult<()> {
        let tmp = location.shard_dir.join(format!(
            "{}{ENTRY_SUFFIX}.{}.tmp",
            location.hash,
            uuid::Uuid::new_v4().simple()
        ));

        let written = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &location.entry_file).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write entry: {}", location.entry_file.display()),
                e,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn backend_type(&self) -> &str {
        "file"
    }

    async fn get(&self, identity: &str) -> AppResult<Lookup> {
        let location = self.locate(identity);

        let data = match fs::read(&location.entry_file).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Generators may write siblings under the base path.
                create_shard_dir(&location).await?;
                let mut extra = Map::new();
                extra.insert(
                    STORAGE_PATH.to_string(),
                    Value::String(location.base_path.to_string_lossy().into_owned()),
                );
                return Ok(Lookup::Miss(extra));
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read entry: {}", location.entry_file.display()),
                    e,
                ));
            }
        };

        let mut entry: Entry = serde_json::from_slice(&data).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Corrupt entry file: {}", location.entry_file.display()),
                e,
            )
        })?;

        // The modification time is the durable form of `last_retrieved`.
        let now = Utc::now();
        if let Err(e) = touch(&location.entry_file, now).await {
            warn!(hash = %location.hash, error = %e, "Failed to touch entry file");
        }
        entry.last_retrieved = now;

        Ok(Lookup::Hit(entry))
    }

    async fn set(&self, identity: &str, entry: &Entry) -> AppResult<()> {
        let location = self.locate(identity);
        create_shard_dir(&location).await?;

        let data = serde_json::to_vec_pretty(entry)?;
        self.write_atomic(&location, &data).await?;

        debug!(hash = %location.hash, bytes = data.len(), "Wrote entry");
        Ok(())
    }

    async fn delete(&self, identity: &str) -> AppResult<()> {
        let location = self.locate(identity);
        fs::remove_file(&location.entry_file).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found("The specified key was not found in the store")
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete entry: {}", location.entry_file.display()),
                    e,
                )
            }
        })?;

        debug!(hash = %location.hash, "Deleted entry");
        Ok(())
    }

    async fn list(
        &self,
        visit: &mut (dyn FnMut(Option<String>, Entry) + Send),
    ) -> AppResult<usize> {
        let mut pending: JoinSet<Option<Entry>> = JoinSet::new();
        let mut dirs = vec![self.root.clone()];
        let mut visited = 0usize;
        let mut walk_error = None;

        while let Some(dir) = dirs.pop() {
            if let Err(e) = scan_dir(&dir, &mut dirs, &mut pending).await {
                walk_error = Some(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to walk storage directory: {}", dir.display()),
                    e,
                ));
                break;
            }
            while let Some(done) = pending.try_join_next() {
                visited += emit(done, visit);
            }
        }

        // Files found late in the walk may still be in flight.
        while let Some(done) = pending.join_next().await {
            visited += emit(done, visit);
        }

        match walk_error {
            Some(e) => Err(e),
            None => Ok(visited),
        }
    }
}

async fn create_shard_dir(location: &EntryLocation) -> AppResult<()> {
    fs::create_dir_all(&location.shard_dir).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!(
                "Failed to create shard directory: {}",
                location.shard_dir.display()
            ),
            e,
        )
    })
}

/// Read one directory, queueing subdirectories and spawning reads for
/// entry files. Temp files left by interrupted writes are removed once
/// stale. A directory that vanished is treated as empty.
async fn scan_dir(
    dir: &Path,
    dirs: &mut Vec<PathBuf>,
    pending: &mut JoinSet<Option<Entry>>,
) -> std::io::Result<()> {
    let mut reader = match fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    while let Some(item) = reader.next_entry().await? {
        let file_type = match item.file_type().await {
            Ok(file_type) => file_type,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        if !file_type.is_file() {
            if file_type.is_dir() {
                dirs.push(item.path());
            }
            continue;
        }

        let name = item.file_name().to_string_lossy().into_owned();
        if is_entry_file_name(&name) {
            pending.spawn(read_listed(item.path()));
        } else if is_temp_file_name(&name) {
            sweep_temp_file(&item.path()).await;
        }
    }
    Ok(())
}

/// Read an entry found by the walk, taking `last_retrieved` from the file's
/// modification time. Vanished or unparsable files yield `None`.
async fn read_listed(path: PathBuf) -> Option<Entry> {
    let data = match fs::read(&path).await {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping unreadable entry file");
            return None;
        }
    };

    let mut entry: Entry = match serde_json::from_slice(&data) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping corrupt entry file");
            return None;
        }
    };

    let modified = fs::metadata(&path).await.and_then(|m| m.modified()).ok()?;
    entry.last_retrieved = DateTime::<Utc>::from(modified);
    Some(entry)
}

fn emit(
    done: Result<Option<Entry>, JoinError>,
    visit: &mut (dyn FnMut(Option<String>, Entry) + Send),
) -> usize {
    match done {
        Ok(Some(entry)) => {
            visit(None, entry);
            1
        }
        Ok(None) => 0,
        Err(e) => {
            warn!(error = %e, "Entry read task failed");
            0
        }
    }
}

/// Set both access and modification time of a file.
async fn touch(path: &Path, at: DateTime<Utc>) -> std::io::Result<()> {
    let path = path.to_path_buf();
    let at = SystemTime::from(at);
    tokio::task::spawn_blocking(move || {
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        file.set_times(
            std::fs::FileTimes::new()
                .set_accessed(at)
                .set_modified(at),
        )
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Remove a temp file older than [`STALE_TEMP_AGE`]. Younger ones may
/// belong to a write in progress.
async fn sweep_temp_file(path: &Path) {
    let age = match fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default(),
        Err(_) => return,
    };
    if age < STALE_TEMP_AGE {
        return;
    }

    match fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Removed stale temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale temp file"),
    }
}

/// Whether a file name is `<hash>.json.<id>.tmp`, as written by
/// `write_atomic`.
fn is_temp_file_name(name: &str) -> bool {
    name.strip_suffix(".tmp")
        .and_then(|rest| rest.split_once('.'))
        .and_then(|(stem, rest)| rest.strip_prefix("json.").map(|id| (stem, id)))
        .is_some_and(|(stem, id)| is_hash(stem) && !id.is_empty())
}

/// Whether a file name is `<32 lowercase hex chars>.json`.
fn is_entry_file_name(name: &str) -> bool {
    name.strip_suffix(ENTRY_SUFFIX).is_some_and(is_hash)
}

fn is_hash(stem: &str) -> bool {
    stem.len() == HASH_LEN && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
