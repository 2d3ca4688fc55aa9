// SPDX-License-Identifier: Apache-2.0

use crate::ValidationError;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Day tag of a snapshot directory, `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotDate(NaiveDate);

impl SnapshotDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|e| ValidationError(format!("snapshot date `{s}` must be YYYY-MM-DD: {e}")))
    }

    #[must_use]
    pub fn today_utc() -> Self {
        Self(Utc::now().date_naive())
    }

    #[must_use]
    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }
}

impl Display for SnapshotDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl TryFrom<String> for SnapshotDate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SnapshotDate> for String {
    fn from(value: SnapshotDate) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SnapshotKind {
    Category,
    Holders,
    Ranked,
}

impl SnapshotKind {
    /// File-name suffix; the resolved category itself carries none.
    #[must_use]
    pub const fn tag(self) -> Option<&'static str> {
        match self {
            Self::Category => None,
            Self::Holders => Some("holders"),
            Self::Ranked => Some("ranked"),
        }
    }
}
