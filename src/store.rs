use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::HistError;

/// One partition's records: record id to record hash.
pub type Shard = BTreeMap<i32, String>;

/// Union of every local shard, ordered by record id.
pub type MergedRecords = BTreeMap<i32, String>;

const SHARD_EXTENSION: &str = "json";

/// One JSON file per partition key under a fixed root directory.
#[derive(Debug, Clone)]
pub struct ShardStore {
    root: PathBuf,
}

impl ShardStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root if it is missing.
    pub fn ensure_root(&self) -> Result<(), HistError> {
        fs::create_dir_all(&self.root).map_err(|source| HistError::StorageRoot {
            path: self.root.clone(),
            source,
        })
    }

    pub fn shard_path(&self, key: &str) -> Result<PathBuf, HistError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{SHARD_EXTENSION}")))
    }

    pub fn read_shard(&self, key: &str) -> Result<Shard> {
        read_shard_file(&self.shard_path(key)?)
    }

    /// True only when the shard exists, decodes and holds exactly `expected`
    /// records. Every failure mode reads as incomplete.
    pub fn is_complete(&self, key: &str, expected: u64) -> bool {
        match self.read_shard(key) {
            Ok(shard) => shard.len() as u64 == expected,
            Err(_) => false,
        }
    }

    /// Replace the shard for `key` with `body`, byte for byte.
    ///
    /// The body lands in a sibling temporary file first and is renamed into
    /// place, so readers see either the previous shard or the new one.
    pub fn write_raw(&self, key: &str, body: &[u8]) -> Result<PathBuf, HistError> {
        let path = self.shard_path(key)?;
        let tmp = path.with_extension(format!("{SHARD_EXTENSION}.tmp"));
        let write_err = |source: io::Error| HistError::Write {
            key: key.to_string(),
            source,
        };

        fs::write(&tmp, body).map_err(write_err)?;
        set_shard_permissions(&tmp).map_err(write_err)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(err));
        }
        Ok(path)
    }

    /// All shard files under the root, sorted by file name.
    pub fn list_shards(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(SHARD_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Merge every shard into one record space. Later files win on a
    /// duplicate id. Any shard that fails to decode aborts the merge.
    pub fn load_merged(&self) -> Result<MergedRecords> {
        let mut merged = MergedRecords::new();
        for path in self.list_shards()? {
            let shard = read_shard_file(&path)?;
            merged.extend(shard);
        }
        Ok(merged)
    }
}

pub fn read_shard_file(path: &Path) -> Result<Shard> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let shard = serde_json::from_slice(&bytes).map_err(|err| HistError::CorruptShard {
        path: path.to_path_buf(),
        cause: err.to_string(),
    })?;
    Ok(shard)
}

fn validate_key(key: &str) -> Result<(), HistError> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0']);
    if invalid {
        return Err(HistError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(unix)]
fn set_shard_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_shard_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
