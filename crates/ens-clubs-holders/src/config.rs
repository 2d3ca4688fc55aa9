// SPDX-License-Identifier: Apache-2.0

use crate::page::{EtherscanPageFetcher, DEFAULT_RECORD_PAGE_BASE};
use crate::resolver::OwnerResolver;
use crate::rpc::JsonRpcRegistry;
use crate::{HoldersError, HoldersOptions, DEFAULT_CONCURRENCY};
use ens_clubs_core::{
    resolve_clubs_root_from, ENV_ENS_CLUBS_CONCURRENCY, ENV_ENS_CLUBS_CONTRACT, ENV_ENS_CLUBS_DATE,
    ENV_ENS_CLUBS_HTTP_TIMEOUT_MS, ENV_ENS_CLUBS_RECORD_PAGE_BASE, ENV_ENS_CLUBS_ROOT,
    ENV_ENS_CLUBS_RPC_URL,
};
use ens_clubs_model::{OwnerAddress, SnapshotDate};
use ens_clubs_store::LocalFsStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// ENS base registrar (ERC-721 over `.eth` second-level labels).
pub const DEFAULT_CONTRACT: &str = "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85";
pub const DEFAULT_RPC_URL: &str = "https://cloudflare-eth.com";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldersConfig {
    pub root: PathBuf,
    pub concurrency: usize,
    pub contract: String,
    pub record_page_base: String,
    pub rpc_url: String,
    pub http_timeout_ms: u64,
    pub snapshot_date: SnapshotDate,
}

impl Default for HoldersConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            concurrency: DEFAULT_CONCURRENCY,
            contract: DEFAULT_CONTRACT.to_string(),
            record_page_base: DEFAULT_RECORD_PAGE_BASE.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            snapshot_date: SnapshotDate::today_utc(),
        }
    }
}

impl HoldersConfig {
    pub fn from_env() -> Result<Self, HoldersError> {
        Self::default().apply_env(|name| std::env::var(name).ok())
    }

    /// Overrides defaults from a variable lookup. Unset or blank variables
    /// keep the current value; malformed ones are rejected.
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HoldersError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(root) = get(ENV_ENS_CLUBS_ROOT) {
            self.root = resolve_clubs_root_from(Some(&root));
        }
        if let Some(url) = get(ENV_ENS_CLUBS_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(contract) = get(ENV_ENS_CLUBS_CONTRACT) {
            self = self.with_contract(&contract)?;
        }
        if let Some(base) = get(ENV_ENS_CLUBS_RECORD_PAGE_BASE) {
            self.record_page_base = base;
        }
        if let Some(raw) = get(ENV_ENS_CLUBS_CONCURRENCY) {
            let n = raw.parse::<usize>().map_err(|e| {
                HoldersError::config(format!("{ENV_ENS_CLUBS_CONCURRENCY}=`{raw}` invalid: {e}"))
            })?;
            self = self.with_concurrency(n)?;
        }
        if let Some(raw) = get(ENV_ENS_CLUBS_DATE) {
            self.snapshot_date = SnapshotDate::parse(&raw)
                .map_err(|e| HoldersError::config(format!("{ENV_ENS_CLUBS_DATE} invalid: {e}")))?;
        }
        if let Some(raw) = get(ENV_ENS_CLUBS_HTTP_TIMEOUT_MS) {
            let ms = raw.parse::<u64>().map_err(|e| {
                HoldersError::config(format!(
                    "{ENV_ENS_CLUBS_HTTP_TIMEOUT_MS}=`{raw}` invalid: {e}"
                ))
            })?;
            if ms == 0 {
                return Err(HoldersError::config(format!(
                    "{ENV_ENS_CLUBS_HTTP_TIMEOUT_MS} must be positive"
                )));
            }
            self.http_timeout_ms = ms;
        }
        Ok(self)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, HoldersError> {
        if concurrency == 0 {
            return Err(HoldersError::config("concurrency must be at least 1"));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn with_contract(mut self, contract: &str) -> Result<Self, HoldersError> {
        let parsed = OwnerAddress::parse(contract)
            .map_err(|e| HoldersError::config(format!("contract address invalid: {e}")))?;
        self.contract = parsed.as_str().to_string();
        Ok(self)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    #[must_use]
    pub fn options(&self) -> HoldersOptions {
        HoldersOptions::default()
            .with_concurrency(self.concurrency)
            .with_snapshot_date(self.snapshot_date)
    }

    #[must_use]
    pub fn store(&self) -> LocalFsStore {
        LocalFsStore::new(self.root.clone())
    }

    /// Live resolver: JSON-RPC registry with the record page as fallback.
    pub fn build_resolver(&self) -> Result<OwnerResolver, HoldersError> {
        let registry = JsonRpcRegistry::new(&self.rpc_url, &self.contract, self.http_timeout())?;
        let page = EtherscanPageFetcher::new(
            &self.record_page_base,
            &self.contract,
            self.http_timeout(),
        )?;
        Ok(OwnerResolver::new(Arc::new(registry), Arc::new(page)))
    }
}
