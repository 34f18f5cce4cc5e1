//! Registry core for `.dcn` names: the durable record store, the
//! availability and lifecycle policy, pricing, and administration.

pub mod price_oracle;
pub mod registrar;
pub mod registry;
pub mod traits;

#[cfg(test)]
pub mod mock;
#[cfg(test)]
pub(crate) mod tests;

pub use registrar::{Error, Registrar, MAX_REGISTRATION_YEARS, MIN_REGISTRATION_YEARS};
pub use registry::{GenesisConfig, Registry, StoreError, DEFAULT_GRACE_PERIOD, UNIT_FEE_PER_YEAR};
pub use traits::{PriceOracle, SystemClock, UnixNow};
