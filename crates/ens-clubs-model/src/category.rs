// SPDX-License-Identifier: Apache-2.0

use crate::{Identifier, Label, OwnerAddress};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub supply: usize,
    /// Distinct holders, present once a resolution run has touched the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<usize>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CategoryInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, supply: usize) -> Self {
        Self {
            name: name.into(),
            supply,
            owners: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    pub id: Identifier,
    pub label: Label,
    pub name: String,
    pub owner: OwnerAddress,
}

impl ResolvedEntry {
    #[must_use]
    pub fn new(id: Identifier, label: Label, owner: OwnerAddress) -> Self {
        let name = label.ens_name();
        Self {
            id,
            label,
            name,
            owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Unresolved(Identifier),
    Resolved(ResolvedEntry),
}

impl Entry {
    #[must_use]
    pub fn id(&self) -> &Identifier {
        match self {
            Self::Unresolved(id) => id,
            Self::Resolved(resolved) => &resolved.id,
        }
    }

    #[must_use]
    pub fn owner(&self) -> Option<&OwnerAddress> {
        match self {
            Self::Unresolved(_) => None,
            Self::Resolved(resolved) => Some(&resolved.owner),
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub info: CategoryInfo,
    pub data: IndexMap<Label, Entry>,
}

impl CategoryRecord {
    /// Fresh category with every label unresolved. Repeated labels keep their
    /// first position.
    #[must_use]
    pub fn from_labels(name: impl Into<String>, labels: impl IntoIterator<Item = Label>) -> Self {
        let mut data = IndexMap::new();
        for label in labels {
            if data.contains_key(&label) {
                continue;
            }
            let id = Identifier::from_label(&label);
            data.insert(label, Entry::Unresolved(id));
        }
        Self {
            info: CategoryInfo::new(name, data.len()),
            data,
        }
    }

    #[must_use]
    pub fn entry(&self, label: &Label) -> Option<&Entry> {
        self.data.get(label)
    }

    /// Replaces the entry of a label already in the record; unknown labels
    /// are left out and reported as `false`.
    pub fn set_entry(&mut self, label: &Label, entry: Entry) -> bool {
        match self.data.get_mut(label) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.data.keys()
    }

    #[must_use]
    pub fn unresolved_labels(&self) -> Vec<Label> {
        self.data
            .iter()
            .filter(|(_, entry)| !entry.is_resolved())
            .map(|(label, _)| label.clone())
            .collect()
    }

    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.data.values().filter(|e| e.is_resolved()).count()
    }
}
