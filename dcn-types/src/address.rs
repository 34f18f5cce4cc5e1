use core::fmt;
use core::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A 20-byte account address, rendered as `0x`-prefixed lowercase hex.
///
/// The all-zero value is never a valid owner or recipient; it only exists
/// so malformed input can be told apart from a deliberate zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex digits")]
    BadLength,
    #[error("address contains non-hex characters")]
    BadHex,
}

impl Address {
    pub const LEN: usize = 20;
    pub const ZERO: Address = Address([0u8; Self::LEN]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; Self::LEN]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; Address::LEN]> for Address {
    fn from(raw: [u8; Address::LEN]) -> Self {
        Address(raw)
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(ParseAddressError::MissingPrefix)?;
        if digits.len() != Self::LEN * 2 {
            return Err(ParseAddressError::BadLength);
        }
        let mut raw = [0u8; Self::LEN];
        hex::decode_to_slice(digits, &mut raw).map_err(|_| ParseAddressError::BadHex)?;
        Ok(Address(raw))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
