// SPDX-License-Identifier: Apache-2.0

use crate::HoldersError;
use ens_clubs_model::{CategoryRecord, Label};
use ens_clubs_store::{CategoryName, ClubStore};

/// Splits a names list on commas and whitespace. Blank pieces are dropped;
/// everything else must be a valid label (an `.eth` suffix is accepted).
pub fn parse_names(raw: &str) -> Result<Vec<Label>, HoldersError> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| Label::parse(piece).map_err(HoldersError::from))
        .collect()
}

/// Creates (or replaces) a category file with every label unresolved.
pub fn add_category(
    store: &dyn ClubStore,
    category: &CategoryName,
    names: Vec<Label>,
) -> Result<CategoryRecord, HoldersError> {
    let record = CategoryRecord::from_labels(category.as_str(), names);
    if record.data.is_empty() {
        return Err(HoldersError::input(format!(
            "category `{category}` needs at least one name"
        )));
    }
    store
        .write_category(category, &record)
        .map_err(|e| HoldersError::persist(e.to_string()))?;
    tracing::info!(category = %category, supply = record.info.supply, "category.created");
    Ok(record)
}
