//! On-disk cache storage
//!
//! Layout under the storage root:
//!
//! ```text
//! <sha256(cache name)>/
//!     cache.json              name and creation time
//!     <sha256(url)>.json      response metadata
//!     <sha256(url)>.body      response body
//! ```
//!
//! An entry exists once its `.json` file exists. Both files are written to a
//! uniquely named temporary file and renamed into place, body first. The
//! manifest is linked into place so concurrent `open` calls agree on one.

use super::{Cache, CacheStorage};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::Response;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const MANIFEST_FILE: &str = "cache.json";

/// Hex SHA-256 of a string, used for directory and file names
fn digest(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

/// Contents of `cache.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheManifest {
    name: String,
    created_at: DateTime<Utc>,
}

/// Contents of an entry's `.json` file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    stored_at: DateTime<Utc>,
    response: Response,
}

/// Cache storage persisted in a directory
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    /// Create storage rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, name: &str) -> PathBuf {
        self.root.join(digest(name))
    }

    async fn read_manifest(dir: &Path) -> Option<CacheManifest> {
        let path = dir.join(MANIFEST_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                debug!("Skipping {}: {}", dir.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> PrecacheResult<Box<dyn Cache>> {
        let dir = self.cache_dir(name);
        let open_err = |e: std::io::Error| PrecacheError::CacheOpen {
            name: name.to_string(),
            reason: e.to_string(),
        };

        fs::create_dir_all(&dir).await.map_err(open_err)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if !fs::try_exists(&manifest_path).await.map_err(open_err)? {
            let manifest = CacheManifest {
                name: name.to_string(),
                created_at: Utc::now(),
            };
            if write_new(&manifest_path, serde_json::to_vec_pretty(&manifest)?)
                .await
                .map_err(open_err)?
            {
                debug!("Created cache {} at {}", name, dir.display());
            }
        }

        Ok(Box::new(DiskCache {
            name: name.to_string(),
            dir,
        }))
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PrecacheError::io("reading cache storage directory", e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading cache storage entry", e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| PrecacheError::io("reading cache storage entry", e))?;
            if !file_type.is_dir() {
                continue;
            }
            if let Some(manifest) = Self::read_manifest(&entry.path()).await {
                names.push(manifest.name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn has(&self, name: &str) -> PrecacheResult<bool> {
        let manifest = self.cache_dir(name).join(MANIFEST_FILE);
        fs::try_exists(&manifest)
            .await
            .map_err(|e| PrecacheError::io(format!("checking cache {}", name), e))
    }

    async fn delete(&self, name: &str) -> PrecacheResult<bool> {
        let dir = self.cache_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Removed cache {} at {}", name, dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PrecacheError::CacheDelete {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Handle to one on-disk cache
struct DiskCache {
    name: String,
    dir: PathBuf,
}

impl DiskCache {
    fn meta_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", digest(url)))
    }

    fn body_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.body", digest(url)))
    }

    fn read_err(&self, url: &str, reason: impl ToString) -> PrecacheError {
        PrecacheError::CacheRead {
            name: self.name.clone(),
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Cache for DiskCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_url(&self, url: &str) -> PrecacheResult<Option<Response>> {
        let meta = match fs::read(self.meta_path(url)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.read_err(url, e)),
        };

        let meta: EntryMeta = serde_json::from_slice(&meta).map_err(|e| self.read_err(url, e))?;
        if meta.key != url {
            return Err(self.read_err(url, format!("entry belongs to {}", meta.key)));
        }

        let body = fs::read(self.body_path(url))
            .await
            .map_err(|e| self.read_err(url, e))?;

        Ok(Some(Response {
            body,
            ..meta.response
        }))
    }

    async fn put(&self, url: &str, response: Response) -> PrecacheResult<()> {
        let write_err = |reason: String| PrecacheError::CacheWrite {
            name: self.name.clone(),
            url: url.to_string(),
            reason,
        };

        write_atomic(&self.body_path(url), response.body.clone())
            .await
            .map_err(|e| write_err(e.to_string()))?;

        let meta = EntryMeta {
            key: url.to_string(),
            stored_at: Utc::now(),
            response,
        };
        let content = serde_json::to_vec_pretty(&meta).map_err(|e| write_err(e.to_string()))?;
        write_atomic(&self.meta_path(url), content)
            .await
            .map_err(|e| write_err(e.to_string()))?;

        Ok(())
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| PrecacheError::io(format!("reading cache {}", self.name), e))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io(format!("reading cache {}", self.name), e))?
        {
            let path = entry.path();
            if path.file_name().is_some_and(|f| f == MANIFEST_FILE)
                || path.extension().is_none_or(|ext| ext != "json")
            {
                continue;
            }
            let bytes = fs::read(&path)
                .await
                .map_err(|e| PrecacheError::io(format!("reading {}", path.display()), e))?;
            match serde_json::from_slice::<EntryMeta>(&bytes) {
                Ok(meta) => keys.push(meta.key),
                Err(e) => warn!("Ignoring unreadable entry {}: {}", path.display(), e),
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Temporary sibling of `path`, unique per writer
fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    PathBuf::from(tmp)
}

/// Replace `path` with `contents`; readers see the old or the new file
async fn write_atomic(path: &Path, contents: Vec<u8>) -> std::io::Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Create `path` with `contents` unless it already exists.
///
/// Returns whether this call created the file.
async fn write_new(path: &Path, contents: Vec<u8>) -> std::io::Result<bool> {
    let tmp = temp_path(path);
    fs::write(&tmp, contents).await?;
    let linked = fs::hard_link(&tmp, path).await;
    let _ = fs::remove_file(&tmp).await;
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}
