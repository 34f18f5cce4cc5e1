use std::time::{SystemTime, UNIX_EPOCH};

use dcn_types::{Balance, Moment};

/// Time source for every lifecycle decision. Production code uses
/// [`SystemClock`]; tests drive a manual clock so expiry and grace windows
/// can be crossed deterministically.
pub trait UnixNow {
    /// Current unix time, in seconds.
    fn now(&self) -> Moment;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl UnixNow for SystemClock {
    fn now(&self) -> Moment {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Returns the price to register or renew a name.
///
/// `None` signals arithmetic overflow, which callers must treat as a
/// rejection, never as a free registration.
pub trait PriceOracle {
    fn register_price(&self, years: u32) -> Option<Balance>;
    fn renew_price(&self, years: u32) -> Option<Balance>;
}
