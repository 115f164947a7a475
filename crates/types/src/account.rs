use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing an account identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("account identifier must not be empty")]
    Empty,
    #[error("account identifier must not contain whitespace: {0:?}")]
    Whitespace(String),
}

/// Opaque account identifier (participant, treasury, or collaborator address).
///
/// The rewards engine never interprets the contents; it only compares and
/// stores them. Serialized as a plain JSON string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Parse and validate an identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, AccountError> {
        let id = id.into();
        if id.is_empty() {
            return Err(AccountError::Empty);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(AccountError::Whitespace(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(AccountId::new(""), Err(AccountError::Empty));
        assert!(matches!(
            AccountId::new("hx 12"),
            Err(AccountError::Whitespace(_))
        ));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: AccountId = "hx0001".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"hx0001\"");
        let back: AccountId = serde_json::from_str("\"hx0001\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<AccountId>("\"\"").is_err());
    }
}
