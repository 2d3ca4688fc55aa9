// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use ens_clubs_model::{Identifier, Label, OwnerAddress};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Primary tier failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registrar reverted `ownerOf`, which it does for expired names.
    Reverted(String),
    Transport(String),
    /// Call succeeded but carried no owner (empty result or zero address).
    Empty,
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reverted(msg) => write!(f, "registry reverted: {msg}"),
            Self::Transport(msg) => write!(f, "registry call failed: {msg}"),
            Self::Empty => write!(f, "registry returned no owner"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Secondary tier failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// The site served its "servers busy" / not-found page.
    Unavailable,
    Status(u16),
    NoOwner,
    Transport(String),
}

impl Display for PageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "record page unavailable"),
            Self::Status(code) => write!(f, "record page status {code}"),
            Self::NoOwner => write!(f, "record page carries no owner address"),
            Self::Transport(msg) => write!(f, "record page fetch failed: {msg}"),
        }
    }
}

impl std::error::Error for PageError {}

#[async_trait]
pub trait RegistryReader: Send + Sync {
    fn tier_tag(&self) -> &'static str;

    async fn owner_of(&self, id: &Identifier) -> Result<OwnerAddress, RegistryError>;
}

#[async_trait]
pub trait RecordPageFetcher: Send + Sync {
    fn tier_tag(&self) -> &'static str;

    async fn fetch_owner(&self, id: &Identifier) -> Result<OwnerAddress, PageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub registry: RegistryError,
    pub page: PageError,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}; {}", self.registry, self.page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(OwnerAddress),
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    /// Primary tier reverted. Reported even when the page tier recovered.
    pub expired: bool,
}

impl Resolution {
    #[must_use]
    pub fn owner(&self) -> Option<&OwnerAddress> {
        match &self.outcome {
            ResolutionOutcome::Resolved(owner) => Some(owner),
            ResolutionOutcome::Failed(_) => None,
        }
    }
}

/// Two-tier owner lookup: registry first, record page only when the
/// registry fails. No retries within one call.
#[derive(Clone)]
pub struct OwnerResolver {
    registry: Arc<dyn RegistryReader>,
    page: Arc<dyn RecordPageFetcher>,
}

impl OwnerResolver {
    #[must_use]
    pub fn new(registry: Arc<dyn RegistryReader>, page: Arc<dyn RecordPageFetcher>) -> Self {
        Self { registry, page }
    }

    pub async fn resolve(&self, id: &Identifier, label: &Label) -> Resolution {
        let registry_err = match self.registry.owner_of(id).await {
            Ok(owner) if !owner.is_zero() => {
                return Resolution {
                    outcome: ResolutionOutcome::Resolved(owner),
                    expired: false,
                }
            }
            Ok(_) => RegistryError::Empty,
            Err(e) => e,
        };
        let expired = matches!(registry_err, RegistryError::Reverted(_));
        tracing::debug!(
            label = %label,
            tier = self.registry.tier_tag(),
            expired,
            error = %registry_err,
            "primary tier failed, falling back"
        );

        let outcome = match self.page.fetch_owner(id).await {
            Ok(owner) if !owner.is_zero() => ResolutionOutcome::Resolved(owner),
            Ok(_) => ResolutionOutcome::Failed(FailureReason {
                registry: registry_err,
                page: PageError::NoOwner,
            }),
            Err(page) => ResolutionOutcome::Failed(FailureReason {
                registry: registry_err,
                page,
            }),
        };
        Resolution { outcome, expired }
    }
}
