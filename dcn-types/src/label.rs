use core::fmt;
use core::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const LABEL_MIN_LEN: usize = 3;
pub const LABEL_MAX_LEN: usize = 64;

/// Suffix every registry name carries in its canonical form.
pub const SUFFIX: &str = ".dcn";

/// A validated registry label: `alice` in `alice.dcn`.
///
/// Parsing normalizes to ASCII lowercase and accepts the qualified form
/// (`Alice.DCN` and `alice` both yield the same label). Valid labels are
/// `[a-z0-9-]`, [`LABEL_MIN_LEN`]..=[`LABEL_MAX_LEN`] bytes, start and end
/// alphanumeric, and never contain consecutive hyphens.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseLabelError {
    #[error("label must be {LABEL_MIN_LEN} to {LABEL_MAX_LEN} characters")]
    BadLength,
    #[error("label may only contain lowercase letters, digits and hyphens")]
    BadChar,
    #[error("label must start and end with a letter or digit")]
    BadEdge,
    #[error("label must not contain consecutive hyphens")]
    DoubleHyphen,
}

impl Label {
    pub fn parse(input: &str) -> Result<Self, ParseLabelError> {
        let lower = input.trim().to_ascii_lowercase();
        let label = lower.strip_suffix(SUFFIX).unwrap_or(&lower);
        let len = label.len();
        if !(LABEL_MIN_LEN..=LABEL_MAX_LEN).contains(&len) {
            return Err(ParseLabelError::BadLength);
        }
        let bytes = label.as_bytes();
        if !bytes[0].is_ascii_alphanumeric() || !bytes[len - 1].is_ascii_alphanumeric() {
            return Err(ParseLabelError::BadEdge);
        }
        let mut prev_hyphen = false;
        for &c in bytes {
            match c {
                b'a'..=b'z' | b'0'..=b'9' => prev_hyphen = false,
                b'-' if prev_hyphen => return Err(ParseLabelError::DoubleHyphen),
                b'-' => prev_hyphen = true,
                _ => return Err(ParseLabelError::BadChar),
            }
        }
        Ok(Label(label.to_owned()))
    }

    /// The bare label, suffix stripped.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical name, `label.dcn`. This is the storage key.
    pub fn qualified(&self) -> String {
        format!("{}{SUFFIX}", self.0)
    }
}

impl FromStr for Label {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SUFFIX}", self.0)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
