use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, Moment, SECONDS_PER_DAY};

/// Remaining-life threshold below which a record counts as expiring soon.
pub const EXPIRING_SOON_DAYS: u64 = 30;

/// The stored association between a registered name and its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub owner: Address,
    /// Start of the current ownership epoch, unix seconds. Immutable under
    /// renew and transfer.
    pub registration: Moment,
    /// Expiry, unix seconds. Advanced by renewals, never rewound.
    pub expire: Moment,
}

/// Lifecycle state derived from a record and the current time; never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStatus {
    Active,
    /// Still live, fewer than [`EXPIRING_SOON_DAYS`] days left.
    ExpiringSoon,
    /// Expired but recoverable by the owner while the grace period lasts.
    InGrace,
    /// Past the grace period; registrable by anyone.
    Released,
}

impl NameRecord {
    pub fn is_expired(&self, now: Moment) -> bool {
        now > self.expire
    }

    /// True once the record is past its grace window and the name can be
    /// taken over by a new registrant.
    pub fn is_released(&self, now: Moment, grace: Moment) -> bool {
        now > self.expire.saturating_add(grace)
    }

    pub fn status(&self, now: Moment, grace: Moment) -> NameStatus {
        if self.is_released(now, grace) {
            NameStatus::Released
        } else if self.is_expired(now) {
            NameStatus::InGrace
        } else if self.expire - now < EXPIRING_SOON_DAYS * SECONDS_PER_DAY {
            NameStatus::ExpiringSoon
        } else {
            NameStatus::Active
        }
    }

    /// Whole days until expiry, rounded up; zero or negative once expired.
    pub fn days_until_expiry(&self, now: Moment) -> i64 {
        let diff = self.expire as i64 - now as i64;
        (diff + (SECONDS_PER_DAY as i64 - 1)).div_euclid(SECONDS_PER_DAY as i64)
    }
}

impl fmt::Display for NameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NameStatus::Active => "active",
            NameStatus::ExpiringSoon => "expiring soon",
            NameStatus::InGrace => "in grace period",
            NameStatus::Released => "released",
        };
        f.write_str(text)
    }
}
