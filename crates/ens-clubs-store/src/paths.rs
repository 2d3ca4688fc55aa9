// SPDX-License-Identifier: Apache-2.0

use crate::CategoryName;
use ens_clubs_model::{SnapshotDate, SnapshotKind};
use std::path::{Path, PathBuf};

pub const CATEGORIES_DIR: &str = "categories";
pub const SNAPSHOTS_DIR: &str = "snapshots";
pub const JSON_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTarget {
    Category,
    Snapshot {
        date: SnapshotDate,
        kind: SnapshotKind,
    },
}

/// Maps a category and a target onto a file. Swappable so tests and other
/// deployments can relocate files without touching the pipeline.
pub trait PathLayout: Send + Sync {
    fn resolve(&self, category: &CategoryName, target: PathTarget) -> PathBuf;

    /// Directory whose `*.json` files enumerate the known categories.
    fn categories_dir(&self) -> PathBuf;
}

/// `categories/<name>.json` and `snapshots/<date>/<name>[-<tag>].json`.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    root: PathBuf,
}

impl DirectoryLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathLayout for DirectoryLayout {
    fn resolve(&self, category: &CategoryName, target: PathTarget) -> PathBuf {
        let stem = category.file_stem();
        match target {
            PathTarget::Category => self
                .root
                .join(CATEGORIES_DIR)
                .join(format!("{stem}.{JSON_EXTENSION}")),
            PathTarget::Snapshot { date, kind } => {
                let file = match kind.tag() {
                    Some(tag) => format!("{stem}-{tag}.{JSON_EXTENSION}"),
                    None => format!("{stem}.{JSON_EXTENSION}"),
                };
                self.root
                    .join(SNAPSHOTS_DIR)
                    .join(date.to_string())
                    .join(file)
            }
        }
    }

    fn categories_dir(&self) -> PathBuf {
        self.root.join(CATEGORIES_DIR)
    }
}
