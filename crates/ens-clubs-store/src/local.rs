// SPDX-License-Identifier: Apache-2.0

use crate::{
    CategoryName, ClubStore, DirectoryLayout, PathLayout, PathTarget, StoreError, StoreErrorCode,
    JSON_EXTENSION,
};
use ens_clubs_model::{
    CategoryInfo, CategoryRecord, HoldersSnapshot, OwnerIndex, RankedSnapshot, SnapshotDate,
    SnapshotKind,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct LocalFsStore {
    layout: Box<dyn PathLayout>,
}

impl LocalFsStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            layout: Box::new(DirectoryLayout::new(root)),
        }
    }

    #[must_use]
    pub fn with_layout(layout: Box<dyn PathLayout>) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn path_for(&self, category: &CategoryName, target: PathTarget) -> PathBuf {
        self.layout.resolve(category, target)
    }

    fn snapshot_path(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        kind: SnapshotKind,
    ) -> PathBuf {
        self.path_for(category, PathTarget::Snapshot { date, kind })
    }
}

#[derive(Serialize)]
struct HoldersSnapshotRef<'a> {
    info: &'a CategoryInfo,
    data: &'a OwnerIndex,
}

impl ClubStore for LocalFsStore {
    fn list_categories(&self) -> Result<Vec<CategoryName>, StoreError> {
        let dir = self.layout.categories_dir();
        let entries = fs::read_dir(&dir).map_err(|e| {
            StoreError::new(
                StoreErrorCode::NotFound,
                format!("category directory {} unreadable: {e}", dir.display()),
            )
        })?;
        let mut out = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?
                .path();
            if path.extension().and_then(|x| x.to_str()) != Some(JSON_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|x| x.to_str()) {
                out.push(CategoryName::parse(stem)?);
            }
        }
        out.sort();
        Ok(out)
    }

    fn read_category(&self, category: &CategoryName) -> Result<CategoryRecord, StoreError> {
        let path = self.path_for(category, PathTarget::Category);
        read_json_optional(&path)?.ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::NotFound,
                format!("category `{category}` has no file at {}", path.display()),
            )
        })
    }

    fn write_category(
        &self,
        category: &CategoryName,
        record: &CategoryRecord,
    ) -> Result<(), StoreError> {
        write_json_atomic(&self.path_for(category, PathTarget::Category), record)
    }

    fn read_category_snapshot(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
    ) -> Result<Option<CategoryRecord>, StoreError> {
        read_json_optional(&self.snapshot_path(category, date, SnapshotKind::Category))
    }

    fn write_category_snapshot(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        record: &CategoryRecord,
    ) -> Result<(), StoreError> {
        write_json_atomic(
            &self.snapshot_path(category, date, SnapshotKind::Category),
            record,
        )
    }

    fn read_holders(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
    ) -> Result<Option<HoldersSnapshot>, StoreError> {
        read_json_optional(&self.snapshot_path(category, date, SnapshotKind::Holders))
    }

    fn write_holders(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        info: &CategoryInfo,
        index: &OwnerIndex,
    ) -> Result<(), StoreError> {
        write_json_atomic(
            &self.snapshot_path(category, date, SnapshotKind::Holders),
            &HoldersSnapshotRef { info, data: index },
        )
    }

    fn write_ranked(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        ranked: &RankedSnapshot,
    ) -> Result<(), StoreError> {
        write_json_atomic(
            &self.snapshot_path(category, date, SnapshotKind::Ranked),
            ranked,
        )
    }
}

fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::new(
                StoreErrorCode::Io,
                format!("read {} failed: {e}", path.display()),
            ))
        }
    };
    serde_json::from_slice(&raw).map(Some).map_err(|e| {
        StoreError::new(
            StoreErrorCode::Validation,
            format!("parse {} failed: {e}", path.display()),
        )
    })
}

/// Pretty JSON written to a sibling temp file, synced, then renamed over the
/// target so a crash leaves either the old or the new document.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
    let parent = path.parent().ok_or_else(|| {
        StoreError::new(
            StoreErrorCode::Validation,
            format!("{} has no parent directory", path.display()),
        )
    })?;
    fs::create_dir_all(parent).map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;

    let file_name = path
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or("snapshot.json");
    let tmp = parent.join(format!(".{file_name}.{}.tmp", std::process::id()));
    write_and_sync(&tmp, &bytes)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StoreError::new(
            StoreErrorCode::Io,
            format!("rename into {} failed: {e}", path.display()),
        )
    })?;
    sync_dir(parent)?;
    tracing::trace!(path = %path.display(), bytes = bytes.len(), "json document written");
    Ok(())
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut f =
        File::create(path).map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
    f.write_all(bytes)
        .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
    f.sync_all()
        .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    let f = fs::OpenOptions::new()
        .read(true)
        .open(dir)
        .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
    f.sync_all()
        .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}
