// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! ENS clubs model SSOT.
//!
//! A category entry is either still waiting for an owner or resolved; the
//! shape of the JSON value is the discriminator:
//!
//! ```
//! use ens_clubs_model::Entry;
//!
//! let pending: Entry = serde_json::from_str("\"42\"").unwrap();
//! assert!(!pending.is_resolved());
//! ```

mod category;
mod holders;
mod identifier;
mod label;
mod owner;
mod snapshot;

pub use category::{CategoryInfo, CategoryRecord, Entry, ResolvedEntry};
pub use holders::{HoldersSnapshot, OwnerIndex, RankedIndex, RankedSnapshot};
pub use identifier::Identifier;
pub use label::{Label, ENS_SUFFIX, LABEL_MAX_LEN};
pub use owner::OwnerAddress;
pub use snapshot::{SnapshotDate, SnapshotKind};

use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "ens-clubs-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
