// SPDX-License-Identifier: Apache-2.0

use crate::{CategoryInfo, Label, OwnerAddress};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Owner -> labels held. Both the owner order and the label order follow
/// insertion and carry no meaning of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerIndex(IndexMap<OwnerAddress, Vec<Label>>);

impl OwnerIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `label` to `owner`, creating the owner on first sight.
    /// Returns `false` when the pair was already recorded.
    pub fn record(&mut self, owner: OwnerAddress, label: Label) -> bool {
        let labels = self.0.entry(owner).or_default();
        if labels.contains(&label) {
            return false;
        }
        labels.push(label);
        true
    }

    /// Drops `label` from `owner`; an owner left with no labels is removed
    /// while keeping the relative order of the remaining owners.
    pub fn remove_label(&mut self, owner: &OwnerAddress, label: &Label) -> bool {
        let Some(labels) = self.0.get_mut(owner) else {
            return false;
        };
        let before = labels.len();
        labels.retain(|l| l != label);
        let removed = labels.len() != before;
        if labels.is_empty() {
            self.0.shift_remove(owner);
        }
        removed
    }

    /// Drops `label` from whichever owners list it. Used before re-recording
    /// a label so it never appears under two owners.
    pub fn forget_label(&mut self, label: &Label) -> bool {
        let mut removed = false;
        self.0.retain(|_, labels| {
            let before = labels.len();
            labels.retain(|l| l != label);
            removed |= labels.len() != before;
            !labels.is_empty()
        });
        removed
    }

    #[must_use]
    pub fn labels_of(&self, owner: &OwnerAddress) -> Option<&[Label]> {
        self.0.get(owner).map(Vec::as_slice)
    }

    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn label_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OwnerAddress, &Vec<Label>)> {
        self.0.iter()
    }

    pub fn owners(&self) -> impl Iterator<Item = &OwnerAddress> {
        self.0.keys()
    }
}

impl FromIterator<(OwnerAddress, Vec<Label>)> for OwnerIndex {
    fn from_iter<T: IntoIterator<Item = (OwnerAddress, Vec<Label>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Owner -> number of labels held, in ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedIndex(IndexMap<OwnerAddress, usize>);

impl RankedIndex {
    pub fn iter(&self) -> impl Iterator<Item = (&OwnerAddress, &usize)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(OwnerAddress, usize)> for RankedIndex {
    fn from_iter<T: IntoIterator<Item = (OwnerAddress, usize)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldersSnapshot {
    pub info: CategoryInfo,
    pub data: OwnerIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSnapshot {
    pub info: CategoryInfo,
    pub data: RankedIndex,
}
