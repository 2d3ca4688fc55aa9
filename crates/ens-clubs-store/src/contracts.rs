// SPDX-License-Identifier: Apache-2.0

use crate::{StoreError, StoreErrorCode};
use ens_clubs_model::{
    CategoryInfo, CategoryRecord, HoldersSnapshot, OwnerIndex, RankedSnapshot, SnapshotDate,
};
use std::fmt::{Display, Formatter};

/// Category key as given by the operator (`The999`, `4-digit-dates`, ...).
/// Files are keyed by its lowercase form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    pub fn parse(value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "category name must not be empty",
            ));
        }
        if value.contains('/') || value.contains('\\') || value.contains("..") {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                format!("category name `{value}` must be a plain file stem"),
            ));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn file_stem(&self) -> String {
        self.0.to_lowercase()
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistence seam of the holders pipeline. Every write replaces the whole
/// file; readers never observe a partially written document.
pub trait ClubStore: Send + Sync {
    fn list_categories(&self) -> Result<Vec<CategoryName>, StoreError>;

    fn read_category(&self, category: &CategoryName) -> Result<CategoryRecord, StoreError>;

    fn write_category(
        &self,
        category: &CategoryName,
        record: &CategoryRecord,
    ) -> Result<(), StoreError>;

    fn read_category_snapshot(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
    ) -> Result<Option<CategoryRecord>, StoreError>;

    fn write_category_snapshot(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        record: &CategoryRecord,
    ) -> Result<(), StoreError>;

    fn read_holders(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
    ) -> Result<Option<HoldersSnapshot>, StoreError>;

    fn write_holders(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        info: &CategoryInfo,
        index: &OwnerIndex,
    ) -> Result<(), StoreError>;

    fn write_ranked(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        ranked: &RankedSnapshot,
    ) -> Result<(), StoreError>;
}
