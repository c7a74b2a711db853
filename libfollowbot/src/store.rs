//! File-backed relationship snapshots
//!
//! Each [`Role`] is stored in its own plain-text file holding one decimal
//! account id per line. Files are rewritten whole: the new content goes to a
//! temporary file in the same directory which is then renamed over the old
//! one, so a reader never sees a half-written snapshot.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;

use crate::config::SnapshotPaths;
use crate::error::StorageError;
use crate::types::{IdSet, Role, UserId};

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    paths: SnapshotPaths,
}

impl SnapshotStore {
    pub fn new(paths: SnapshotPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &SnapshotPaths {
        &self.paths
    }

    /// Create any missing snapshot file as an empty file
    pub fn ensure_exists(&self) -> Result<()> {
        for role in Role::ALL {
            let path = self.paths.path(role);
            if path.is_file() {
                continue;
            }

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            }

            fs::write(path, "").map_err(|source| StorageError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::debug!("Created empty {} snapshot at {}", role, path.display());
        }
        Ok(())
    }

    /// Read the persisted set for `role`
    pub fn load(&self, role: Role) -> Result<IdSet> {
        let path = self.paths.path(role);
        let content = fs::read_to_string(path).map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_snapshot(path, &content)
    }

    /// Overwrite the snapshot for `role` with exactly `ids`
    pub fn replace(&self, role: Role, ids: &IdSet) -> Result<()> {
        let path = self.paths.path(role);
        write_atomic(path, &render_snapshot(ids))?;
        tracing::debug!("Wrote {} ids to {} snapshot", ids.len(), role);
        Ok(())
    }

    /// Union `ids` into the existing snapshot for `role`
    ///
    /// Returns the merged set. The snapshot never shrinks.
    pub fn append_merge(&self, role: Role, ids: &IdSet) -> Result<IdSet> {
        let mut merged = self.load(role)?;
        let before = merged.len();
        merged.extend(ids.iter().copied());
        self.replace(role, &merged)?;
        tracing::debug!(
            "Merged {} new ids into {} snapshot ({} total)",
            merged.len() - before,
            role,
            merged.len()
        );
        Ok(merged)
    }

    pub fn last_modified(&self, role: Role) -> Result<SystemTime> {
        let path = self.paths.path(role);
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|source| StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Time since `role` was last written, zero if the clock went backwards
    pub fn age(&self, role: Role, now: SystemTime) -> Result<Duration> {
        let modified = self.last_modified(role)?;
        Ok(now.duration_since(modified).unwrap_or(Duration::ZERO))
    }
}

fn parse_snapshot(path: &Path, content: &str) -> Result<IdSet> {
    let mut ids = IdSet::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id: UserId = line.parse().map_err(|_| StorageError::Corrupt {
            path: path.to_path_buf(),
            line: index + 1,
            content: line.to_string(),
        })?;
        ids.insert(id);
    }
    Ok(ids)
}

fn render_snapshot(ids: &IdSet) -> String {
    let mut out = String::with_capacity(ids.len() * 12);
    for id in ids {
        out.push_str(&id.to_string());
        out.push('\n');
    }
    out
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let write_err = |source: std::io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
