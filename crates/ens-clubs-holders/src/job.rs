// SPDX-License-Identifier: Apache-2.0

use crate::{HoldersError, HoldersOptions};
use ens_clubs_model::{CategoryRecord, Label, OwnerIndex, SnapshotDate};
use ens_clubs_store::{CategoryName, ClubStore};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Every label of the category file, fresh owner index.
    Full,
    /// Explicit labels, augmenting the dated snapshots.
    Subset,
    /// Labels still unresolved in the dated snapshot.
    FailureFix,
}

impl JobMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Subset => "subset",
            Self::FailureFix => "failure_fix",
        }
    }

    #[must_use]
    pub const fn augments(self) -> bool {
        !matches!(self, Self::Full)
    }
}

/// Everything a run needs before the first resolution starts. Loading
/// validates the whole input so no work begins on a bad request.
#[derive(Debug, Clone)]
pub struct ResolutionJob {
    pub category: CategoryName,
    pub snapshot_date: SnapshotDate,
    pub mode: JobMode,
    pub labels: Vec<Label>,
    pub record: CategoryRecord,
    pub index: OwnerIndex,
}

impl ResolutionJob {
    pub fn load(
        store: &dyn ClubStore,
        category: &CategoryName,
        options: &HoldersOptions,
        mode: JobMode,
    ) -> Result<Self, HoldersError> {
        let date = options.snapshot_date;
        let record = match mode {
            JobMode::Full => store.read_category(category)?,
            JobMode::Subset => match store.read_category_snapshot(category, date)? {
                Some(snapshot) => snapshot,
                None => store.read_category(category)?,
            },
            JobMode::FailureFix => store
                .read_category_snapshot(category, date)?
                .ok_or_else(|| {
                    HoldersError::input(format!(
                        "category `{category}` has no snapshot for {date}; run holders first"
                    ))
                })?,
        };

        let labels = match mode {
            JobMode::Full => record.labels().cloned().collect(),
            JobMode::FailureFix => record.unresolved_labels(),
            JobMode::Subset => {
                let requested = options.labels.clone().unwrap_or_default();
                let mut labels: Vec<Label> = Vec::with_capacity(requested.len());
                for label in requested {
                    if record.entry(&label).is_none() {
                        return Err(HoldersError::input(format!(
                            "label `{label}` is not part of category `{category}`"
                        )));
                    }
                    if !labels.contains(&label) {
                        labels.push(label);
                    }
                }
                labels
            }
        };

        let index = if mode.augments() {
            store
                .read_holders(category, date)?
                .map(|snapshot| snapshot.data)
                .unwrap_or_default()
        } else {
            OwnerIndex::new()
        };

        Ok(Self {
            category: category.clone(),
            snapshot_date: date,
            mode,
            labels,
            record,
            index,
        })
    }
}
