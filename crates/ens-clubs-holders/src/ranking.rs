// SPDX-License-Identifier: Apache-2.0

use crate::logging::{fields, HoldersEvent, HoldersLog, HoldersStage};
use crate::HoldersError;
use ens_clubs_model::{
    HoldersSnapshot, OwnerAddress, OwnerIndex, RankedIndex, RankedSnapshot, SnapshotDate,
};
use ens_clubs_store::{CategoryName, ClubStore};

#[derive(Debug, Clone, PartialEq)]
pub struct RankedHolders {
    pub holders: HoldersSnapshot,
    pub ranked: RankedSnapshot,
    pub events: Vec<HoldersEvent>,
}

/// Orders owners by label count, largest first.
///
/// Owners are sorted ascending by count with a stable sort and the result is
/// reversed, so owners holding the same count come out in reverse insertion
/// order. `{A:3, B:2, C:3}` ranks as `C, A, B`.
#[must_use]
pub fn rank(index: &OwnerIndex) -> (OwnerIndex, RankedIndex) {
    let mut order: Vec<(&OwnerAddress, &Vec<_>)> = index.iter().collect();
    order.sort_by_key(|(_, labels)| labels.len());
    order.reverse();

    let ranked = order
        .iter()
        .map(|(owner, labels)| ((*owner).clone(), labels.len()))
        .collect();
    let reordered = order
        .into_iter()
        .map(|(owner, labels)| (owner.clone(), labels.clone()))
        .collect();
    (reordered, ranked)
}

/// Re-sorts the dated holders snapshot in place and writes the ranked view
/// next to it.
pub fn rank_holders(
    store: &dyn ClubStore,
    category: &CategoryName,
    date: SnapshotDate,
) -> Result<RankedHolders, HoldersError> {
    let snapshot = store.read_holders(category, date)?.ok_or_else(|| {
        HoldersError::input(format!(
            "category `{category}` has no holders snapshot for {date}"
        ))
    })?;
    let mut log = HoldersLog::default();
    let (reordered, ranked) = rank(&snapshot.data);
    log.emit(
        HoldersStage::Rank,
        "holders.rank.sorted",
        fields([
            ("owners", ranked.len().to_string()),
            ("labels", reordered.label_count().to_string()),
        ]),
    );

    store
        .write_holders(category, date, &snapshot.info, &reordered)
        .map_err(|e| HoldersError::persist(e.to_string()))?;
    let ranked = RankedSnapshot {
        info: snapshot.info.clone(),
        data: ranked,
    };
    store
        .write_ranked(category, date, &ranked)
        .map_err(|e| HoldersError::persist(e.to_string()))?;
    tracing::info!(
        category = %category,
        date = %date,
        owners = ranked.data.len(),
        "holders.ranked"
    );
    log.emit(
        HoldersStage::Persist,
        "holders.ranked",
        fields([("owners", ranked.data.len().to_string())]),
    );

    Ok(RankedHolders {
        holders: HoldersSnapshot {
            info: snapshot.info,
            data: reordered,
        },
        ranked,
        events: log.into_events(),
    })
}
