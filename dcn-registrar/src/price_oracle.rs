//! Flat pricing: every name costs the genesis-configured unit fee per
//! 365-day year, for registrations and renewals alike.

use dcn_types::Balance;

use crate::traits::PriceOracle;

/// The deployed pricing model. Quotes are `years × fee_per_year` with
/// checked arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitPrice {
    fee_per_year: Balance,
}

impl UnitPrice {
    pub fn new(fee_per_year: Balance) -> Self {
        Self { fee_per_year }
    }

    pub fn fee_per_year(&self) -> Balance {
        self.fee_per_year
    }
}

impl PriceOracle for UnitPrice {
    fn register_price(&self, years: u32) -> Option<Balance> {
        self.fee_per_year.checked_mul(years as Balance)
    }

    fn renew_price(&self, years: u32) -> Option<Balance> {
        // renewals are not discounted
        self.register_price(years)
    }
}
