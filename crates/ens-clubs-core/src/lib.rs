// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const CRATE_NAME: &str = "ens-clubs-core";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::DependencyFailure => "dependency_failure",
            Self::Internal => "internal",
        }
    }
}

pub const ENV_ENS_CLUBS_LOG_LEVEL: &str = "ENS_CLUBS_LOG_LEVEL";
pub const ENV_ENS_CLUBS_LOG_JSON: &str = "ENS_CLUBS_LOG_JSON";
pub const ENV_ENS_CLUBS_ROOT: &str = "ENS_CLUBS_ROOT";
pub const ENV_ENS_CLUBS_RPC_URL: &str = "ENS_CLUBS_RPC_URL";
pub const ENV_ENS_CLUBS_CONTRACT: &str = "ENS_CLUBS_CONTRACT";
pub const ENV_ENS_CLUBS_RECORD_PAGE_BASE: &str = "ENS_CLUBS_RECORD_PAGE_BASE";
pub const ENV_ENS_CLUBS_CONCURRENCY: &str = "ENS_CLUBS_CONCURRENCY";
pub const ENV_ENS_CLUBS_DATE: &str = "ENS_CLUBS_DATE";
pub const ENV_ENS_CLUBS_HTTP_TIMEOUT_MS: &str = "ENS_CLUBS_HTTP_TIMEOUT_MS";

#[must_use]
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[must_use]
pub fn keccak256_hex(bytes: &[u8]) -> String {
    let digest = keccak256(bytes);
    let mut out = String::with_capacity(64);
    for b in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Data root holding `categories/` and `snapshots/`.
///
/// An explicit, non-blank value (`ENS_CLUBS_ROOT` or `--root`) wins; otherwise
/// the current directory is used.
#[must_use]
pub fn resolve_clubs_root_from(explicit: Option<&str>) -> PathBuf {
    if let Some(explicit) = explicit {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    PathBuf::from(".")
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MachineError {}
