// SPDX-License-Identifier: Apache-2.0

use crate::resolver::{PageError, RecordPageFetcher};
use crate::HoldersError;
use async_trait::async_trait;
use ens_clubs_model::{Identifier, OwnerAddress};
use regex::Regex;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_RECORD_PAGE_BASE: &str = "https://etherscan.io/nft";

const OWNER_BLOCK_MARKER: &str = "ContentPlaceHolder1_divOwner";
const BLOCK_PREFIX: &str = "ContentPlaceHolder1_";
const SERVERS_BUSY_MARKER: &str = "Sorry, our servers";

/// Owner extraction from the token page markup.
///
/// The owner block renders either the raw address or the owner's primary ENS
/// name; in the latter case the address lives in the link's `href`, `title`
/// or `data-original-title`. All of them sit inside the block, so the first
/// address-shaped token in the block is the owner.
#[derive(Debug, Clone)]
pub struct OwnerMarkup {
    address_re: Regex,
}

impl OwnerMarkup {
    pub fn new() -> Result<Self, HoldersError> {
        let address_re = Regex::new(r"0x[0-9a-fA-F]{40}")
            .map_err(|e| HoldersError::config(format!("owner pattern invalid: {e}")))?;
        Ok(Self { address_re })
    }

    pub fn extract(&self, html: &str) -> Result<OwnerAddress, PageError> {
        if html.contains(SERVERS_BUSY_MARKER) {
            return Err(PageError::Unavailable);
        }
        let start = html.find(OWNER_BLOCK_MARKER).ok_or(PageError::NoOwner)?;
        let rest = &html[start + OWNER_BLOCK_MARKER.len()..];
        let block = match rest.find(BLOCK_PREFIX) {
            Some(end) => &rest[..end],
            None => rest,
        };
        let found = self.address_re.find(block).ok_or(PageError::NoOwner)?;
        let owner = OwnerAddress::parse(found.as_str()).map_err(|_| PageError::NoOwner)?;
        if owner.is_zero() {
            return Err(PageError::NoOwner);
        }
        Ok(owner)
    }
}

/// Secondary tier: `GET <base>/<contract>/<identifier>`.
pub struct EtherscanPageFetcher {
    client: reqwest::Client,
    base: String,
    contract: String,
    markup: OwnerMarkup,
}

impl EtherscanPageFetcher {
    pub fn new(base: &str, contract: &str, timeout: Duration) -> Result<Self, HoldersError> {
        let base = base.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base)
            .map_err(|e| HoldersError::config(format!("invalid record page base `{base}`: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HoldersError::config(format!("record page client build failed: {e}")))?;
        Ok(Self {
            client,
            base,
            contract: contract.to_ascii_lowercase(),
            markup: OwnerMarkup::new()?,
        })
    }

    #[must_use]
    pub fn page_url(&self, id: &Identifier) -> String {
        format!("{}/{}/{}", self.base, self.contract, id)
    }
}

#[async_trait]
impl RecordPageFetcher for EtherscanPageFetcher {
    fn tier_tag(&self) -> &'static str {
        "record_page"
    }

    #[instrument(name = "record_page_fetch_owner", skip(self, id), fields(id = %id))]
    async fn fetch_owner(&self, id: &Identifier) -> Result<OwnerAddress, PageError> {
        let resp = self
            .client
            .get(self.page_url(id))
            .send()
            .await
            .map_err(|e| PageError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(PageError::Status(resp.status().as_u16()));
        }
        let html = resp
            .text()
            .await
            .map_err(|e| PageError::Transport(format!("read body failed: {e}")))?;
        self.markup.extract(&html)
    }
}
