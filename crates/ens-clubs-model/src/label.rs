// SPDX-License-Identifier: Apache-2.0

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const ENS_SUFFIX: &str = ".eth";
pub const LABEL_MAX_LEN: usize = 255;

/// Second-level name segment, without the `.eth` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct Label(String);

impl Label {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let s = trimmed.strip_suffix(ENS_SUFFIX).unwrap_or(trimmed);
        if s.is_empty() {
            return Err(ValidationError("label must not be empty".to_string()));
        }
        if s.len() > LABEL_MAX_LEN {
            return Err(ValidationError(format!(
                "label exceeds max length {LABEL_MAX_LEN}"
            )));
        }
        if s.contains('.') {
            return Err(ValidationError(format!(
                "label `{s}` must be a single name segment"
            )));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ValidationError(format!(
                "label `{s}` must not contain whitespace"
            )));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn ens_name(&self) -> String {
        format!("{}{ENS_SUFFIX}", self.0)
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_stripped_once() {
        assert_eq!(Label::parse("0420.eth").expect("label").as_str(), "0420");
        assert_eq!(Label::parse(" 24h00 ").expect("label").as_str(), "24h00");
        assert!(Label::parse("a.eth.eth").is_err());
    }

    #[test]
    fn blank_and_multi_segment_labels_are_rejected() {
        assert!(Label::parse("").is_err());
        assert!(Label::parse(".eth").is_err());
        assert!(Label::parse("sub.name").is_err());
        assert!(Label::parse("a b").is_err());
    }

    #[test]
    fn ens_name_appends_suffix() {
        let label = Label::parse("0x99").expect("label");
        assert_eq!(label.ens_name(), "0x99.eth");
    }
}
