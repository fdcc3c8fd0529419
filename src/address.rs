use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A participant address in canonical form: `0x` followed by 40 lowercase
/// hex characters.
///
/// Every address entering the system is normalized through [`Address::parse`]
/// before it is stored or compared, so two spellings differing only by
/// letter case are the same participant everywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Validates and canonicalizes a candidate address string.
    pub fn parse(candidate: &str) -> Result<Self, AppError> {
        let candidate = candidate.trim();

        let hex = candidate
            .strip_prefix("0x")
            .or_else(|| candidate.strip_prefix("0X"))
            .ok_or_else(|| AppError::InvalidAddress(candidate.to_string()))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::InvalidAddress(candidate.to_string()));
        }

        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
