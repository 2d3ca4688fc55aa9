// SPDX-License-Identifier: Apache-2.0

use crate::{Label, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Registrar token id: `uint256(keccak256(label))` in canonical decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("identifier must not be empty".to_string()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError(format!(
                "identifier `{s}` must be a decimal integer"
            )));
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(ValidationError(format!(
                "identifier `{s}` must not carry leading zeros"
            )));
        }
        decimal_to_word(s)?;
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn from_label(label: &Label) -> Self {
        Self::from_word(&ens_clubs_core::keccak256(label.as_str().as_bytes()))
    }

    #[must_use]
    pub fn from_word(word: &[u8; 32]) -> Self {
        Self(word_to_decimal(word))
    }

    /// Big-endian 32-byte word, the ABI encoding of a `uint256` argument.
    #[must_use]
    pub fn to_word(&self) -> [u8; 32] {
        // Parsing already proved the value fits.
        decimal_to_word(&self.0).unwrap_or([0; 32])
    }

    #[must_use]
    pub fn to_word_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for b in self.to_word() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{b:02x}");
        }
        out
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

fn word_to_decimal(word: &[u8]) -> String {
    let mut num: Vec<u8> = word.iter().copied().skip_while(|b| *b == 0).collect();
    if num.is_empty() {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(78);
    while !num.is_empty() {
        let mut rem = 0u32;
        let mut quotient = Vec::with_capacity(num.len());
        for &b in &num {
            let acc = (rem << 8) | u32::from(b);
            let q = acc / 10;
            rem = acc % 10;
            if !(quotient.is_empty() && q == 0) {
                quotient.push(q as u8);
            }
        }
        digits.push(char::from(b'0' + rem as u8));
        num = quotient;
    }
    digits.iter().rev().collect()
}

fn decimal_to_word(decimal: &str) -> Result<[u8; 32], ValidationError> {
    let mut out = [0u8; 32];
    for digit in decimal.bytes() {
        let mut carry = u32::from(digit - b'0');
        for byte in out.iter_mut().rev() {
            let v = u32::from(*byte) * 10 + carry;
            *byte = (v & 0xff) as u8;
            carry = v >> 8;
        }
        if carry != 0 {
            return Err(ValidationError(format!(
                "identifier `{decimal}` exceeds 256 bits"
            )));
        }
    }
    Ok(out)
}
