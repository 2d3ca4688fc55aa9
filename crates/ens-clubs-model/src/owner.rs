// SPDX-License-Identifier: Apache-2.0

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const ADDRESS_HEX_LEN: usize = 40;

/// Holder account, stored in lowercase hex so checksummed and plain
/// renderings of the same account collapse to one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub struct OwnerAddress(String);

impl OwnerAddress {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ValidationError(format!("owner address `{s}` must start with 0x")))?;
        if hex.len() != ADDRESS_HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError(format!(
                "owner address `{s}` must carry {ADDRESS_HEX_LEN} hex digits"
            )));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// Owner from the low 20 bytes of an ABI-encoded `address` return word.
    pub fn from_abi_word(word_hex: &str) -> Result<Self, ValidationError> {
        let hex = word_hex.trim().trim_start_matches("0x");
        if hex.len() != 64 {
            return Err(ValidationError(format!(
                "abi word must be 64 hex digits, got {}",
                hex.len()
            )));
        }
        if !hex[..24].bytes().all(|b| b == b'0') {
            return Err(ValidationError(
                "abi word carries non-zero high bytes for an address".to_string(),
            ));
        }
        Self::parse(&format!("0x{}", &hex[24..]))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OwnerAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerAddress> for String {
    fn from(value: OwnerAddress) -> Self {
        value.0
    }
}
