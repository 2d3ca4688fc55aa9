// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldersStage {
    Load,
    Resolve,
    Persist,
    Rank,
    Finalize,
}

impl HoldersStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Resolve => "resolve",
            Self::Persist => "persist",
            Self::Rank => "rank",
            Self::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoldersEvent {
    pub stage: HoldersStage,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Run log returned with every report. Each event is also forwarded to
/// `tracing` so operators see it live.
#[derive(Debug, Default, Clone)]
pub struct HoldersLog {
    events: Vec<HoldersEvent>,
}

impl HoldersLog {
    pub fn emit(
        &mut self,
        stage: HoldersStage,
        name: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) {
        let name = name.into();
        tracing::debug!(
            stage = stage.as_str(),
            event = %name,
            fields = ?fields,
            "holders event"
        );
        self.events.push(HoldersEvent {
            stage,
            name,
            fields,
        });
    }

    #[must_use]
    pub fn into_events(self) -> Vec<HoldersEvent> {
        self.events
    }
}

/// Builds the field map of an event from `(key, value)` pairs.
pub(crate) fn fields<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
