//! Shared domain types for the `.dcn` name registry: addresses, labels,
//! records and native fee amounts.

pub mod address;
pub mod amount;
pub mod label;
pub mod record;

pub use address::{Address, ParseAddressError};
pub use amount::{format_native, parse_native, ParseAmountError, NATIVE_DECIMALS};
pub use label::{Label, ParseLabelError, LABEL_MAX_LEN, LABEL_MIN_LEN, SUFFIX};
pub use record::{NameRecord, NameStatus, EXPIRING_SOON_DAYS};

/// Unix timestamp or span, in seconds.
pub type Moment = u64;

/// Fee amount in raw 18-decimal native units.
pub type Balance = u128;

pub const SECONDS_PER_DAY: Moment = 24 * 60 * 60;

/// Registration years are flat 365-day years.
pub const SECONDS_PER_YEAR: Moment = 365 * SECONDS_PER_DAY;
