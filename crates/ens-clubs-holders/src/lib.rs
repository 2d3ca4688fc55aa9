// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Holder resolution for ENS clubs.
//!
//! A run loads a category, resolves the owner of each label through the
//! registry (falling back to the public record page), persists the category
//! and holders snapshots after every completion, and reports what happened.
//! Ranking turns a persisted holders snapshot into the ranked view.

mod category;
mod config;
mod job;
mod logging;
mod page;
mod pipeline;
mod ranking;
mod resolver;
mod rpc;
mod walk;

use ens_clubs_model::{Label, SnapshotDate, ValidationError};
use ens_clubs_store::{StoreError, StoreErrorCode};
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "ens-clubs-holders";
pub const DEFAULT_CONCURRENCY: usize = 20;

pub use category::{add_category, parse_names};
pub use config::{HoldersConfig, DEFAULT_CONTRACT, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_RPC_URL};
pub use job::{JobMode, ResolutionJob};
pub use logging::{HoldersEvent, HoldersLog, HoldersStage};
pub use page::{EtherscanPageFetcher, OwnerMarkup, DEFAULT_RECORD_PAGE_BASE};
pub use pipeline::{resolve_category, resolve_only_failures};
pub use ranking::{rank, rank_holders, RankedHolders};
pub use resolver::{
    FailureReason, OwnerResolver, PageError, RecordPageFetcher, RegistryError, RegistryReader,
    Resolution, ResolutionOutcome,
};
pub use rpc::{JsonRpcRegistry, OWNER_OF_SELECTOR};
pub use walk::{walk_categories, WalkOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldersErrorKind {
    /// Malformed or missing input: category file, snapshot, unknown label.
    Input,
    /// Invalid configuration or client setup.
    Config,
    /// A snapshot could not be written.
    Persist,
    Internal,
}

impl HoldersErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input_error",
            Self::Config => "config_error",
            Self::Persist => "persist_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldersError {
    pub kind: HoldersErrorKind,
    pub message: String,
}

impl HoldersError {
    #[must_use]
    pub fn new(kind: HoldersErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(HoldersErrorKind::Input, message)
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(HoldersErrorKind::Config, message)
    }

    #[must_use]
    pub fn persist(message: impl Into<String>) -> Self {
        Self::new(HoldersErrorKind::Persist, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HoldersErrorKind::Internal, message)
    }
}

impl Display for HoldersError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for HoldersError {}

impl From<StoreError> for HoldersError {
    fn from(value: StoreError) -> Self {
        let kind = match value.code {
            StoreErrorCode::NotFound | StoreErrorCode::Validation => HoldersErrorKind::Input,
            StoreErrorCode::Io => HoldersErrorKind::Persist,
            _ => HoldersErrorKind::Internal,
        };
        Self::new(kind, value.to_string())
    }
}

impl From<ValidationError> for HoldersError {
    fn from(value: ValidationError) -> Self {
        Self::input(value.0)
    }
}

/// Per-run knobs. `labels` restricts a run to an explicit subset and switches
/// it to augmentation of the existing holders snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldersOptions {
    pub concurrency: usize,
    pub labels: Option<Vec<Label>>,
    pub snapshot_date: SnapshotDate,
}

impl Default for HoldersOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            labels: None,
            snapshot_date: SnapshotDate::today_utc(),
        }
    }
}

impl HoldersOptions {
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = Some(labels);
        self
    }

    #[must_use]
    pub fn with_snapshot_date(mut self, snapshot_date: SnapshotDate) -> Self {
        self.snapshot_date = snapshot_date;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldersReport {
    pub category: String,
    pub snapshot_date: SnapshotDate,
    pub mode: JobMode,
    pub attempted: usize,
    pub resolved: usize,
    pub failed: usize,
    /// Labels whose registry lookup reverted, whether or not the page
    /// fallback recovered an owner.
    pub expired: usize,
    pub owners: usize,
    pub failed_labels: Vec<Label>,
    pub events: Vec<HoldersEvent>,
}

impl HoldersReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
