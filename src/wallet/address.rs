use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::error::AddressError;

/// A wallet address in EIP-55 mixed-case checksum form.
///
/// Construction always goes through [`WalletAddress::parse`], so two values
/// compare equal exactly when they denote the same 20-byte account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Normalize a raw address string.
    ///
    /// All-lowercase and all-uppercase hex are accepted as unchecksummed
    /// input. Mixed case must match the EIP-55 checksum exactly.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidHex);
        }
        if hex.len() != 40 {
            return Err(AddressError::InvalidLength(hex.len()));
        }

        let checksummed = checksum_hex(&hex.to_ascii_lowercase());
        let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && hex != checksummed {
            return Err(AddressError::ChecksumMismatch);
        }

        Ok(Self(format!("0x{checksummed}")))
    }

    /// Build from the last 20 bytes of a public-key hash.
    pub(crate) fn from_bytes(bytes: &[u8; 20]) -> Self {
        let lower: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("0x{}", checksum_hex(&lower)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compare two raw address strings by normalized form.
///
/// Returns false when either side fails to normalize.
pub fn same_address(a: &str, b: &str) -> bool {
    match (WalletAddress::parse(a), WalletAddress::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn checksum_hex(lower: &str) -> String {
    let digest = Keccak256::digest(lower.as_bytes());
    lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let byte = digest[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
