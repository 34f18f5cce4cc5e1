//! # Registrar
//!
//! The operation surface of the `.dcn` registry. Every mutation runs inside
//! a single write transaction: precondition checks and effects either all
//! land or none do, and redb's single-writer ordering decides races.
//!
//! ### Module functions
//! - `register` - register an available name for 1..=10 years
//! - `renew` - extend a name from its stored expiry, owner only
//! - `transfer` - hand a name over to another address, owner only
//! - `add_reserved` / `remove_reserved` - maintain the reserved list, manager only
//! - `set_registrar_open` - close or reopen mutations, manager only
//! - `set_manager` - maintain the manager set, manager only
//!
//! Queries (`is_available`, `owner_of`, `names_by_owner`, ...) are snapshot
//! reads and never block behind writers.

use thiserror::Error;
use tracing::info;

use dcn_types::{Address, Balance, Label, Moment, NameRecord, ParseLabelError, SECONDS_PER_YEAR};

use crate::price_oracle::UnitPrice;
use crate::registry::{Registry, StoreError, WriteView};
use crate::traits::{PriceOracle, SystemClock, UnixNow};

/// Shortest registration or renewal, in years.
pub const MIN_REGISTRATION_YEARS: u32 = 1;
/// Longest single registration or renewal, in years.
pub const MAX_REGISTRATION_YEARS: u32 = 10;

/// Why an operation was rejected. Mutation failures abort the transaction
/// as a whole; there is never partial state to clean up.
#[derive(Debug, Error)]
pub enum Error {
    /// The name is occupied, or lapsed but still inside its grace period.
    #[error("name is not available")]
    NotAvailable,
    /// The caller is not the owner (or not a manager, for admin calls).
    #[error("caller is not authorized")]
    Unauthorized,
    #[error("insufficient payment: required {required}, paid {paid}")]
    InsufficientPayment { required: Balance, paid: Balance },
    #[error("recipient address is invalid")]
    InvalidRecipient,
    #[error("name is not registered")]
    NotFound,
    #[error("invalid name: {0}")]
    InvalidName(#[from] ParseLabelError),
    #[error(
        "duration must be {MIN_REGISTRATION_YEARS} to {MAX_REGISTRATION_YEARS} years, got {years}"
    )]
    InvalidDuration { years: u32 },
    /// The name sits on the reserved list and cannot be registered.
    #[error("name is reserved")]
    Reserved,
    /// The grace period has fully elapsed; the name must be re-registered.
    #[error("name is past its grace period and can no longer be renewed")]
    NotRenewable,
    #[error("the registrar is currently closed")]
    RegistrarClosed,
    #[error("fee or expiry arithmetic overflowed")]
    Overflow,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Stable machine-readable token for this rejection, as surfaced to
    /// API clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::NotAvailable => "NotAvailable",
            Error::Unauthorized => "Unauthorized",
            Error::InsufficientPayment { .. } => "InsufficientPayment",
            Error::InvalidRecipient => "InvalidRecipient",
            Error::NotFound => "NotFound",
            Error::InvalidName(_) => "InvalidName",
            Error::InvalidDuration { .. } => "InvalidDuration",
            Error::Reserved => "Reserved",
            Error::NotRenewable => "NotRenewable",
            Error::RegistrarClosed => "RegistrarClosed",
            Error::Overflow => "Overflow",
            Error::Store(_) => "Store",
        }
    }
}

pub struct Registrar<N = SystemClock> {
    registry: Registry,
    clock: N,
}

impl Registrar<SystemClock> {
    pub fn new(registry: Registry) -> Self {
        Registrar {
            registry,
            clock: SystemClock,
        }
    }
}

impl<N: UnixNow> Registrar<N> {
    pub fn with_clock(registry: Registry, clock: N) -> Self {
        Registrar { registry, clock }
    }

    /// Current unix time as seen by this registrar.
    pub fn now(&self) -> Moment {
        self.clock.now()
    }

    /// True iff `name` can be registered right now, by anyone: it parses,
    /// is not reserved, and either has no record or its record is past the
    /// grace period.
    pub fn is_available(&self, name: &str) -> Result<bool, Error> {
        let key = Label::parse(name)?.qualified();
        let now = self.clock.now();
        self.registry.with_read(|view| {
            if view.is_reserved(&key)? {
                return Ok(false);
            }
            let grace = view.grace_period()?;
            Ok(match view.record(&key)? {
                None => true,
                Some(record) => record.is_released(now, grace),
            })
        })
    }

    /// Registers `name` to `from` for `years` 365-day years. `value` is the
    /// payment offered; the whole amount is captured on success.
    ///
    /// Taking over a lapsed name starts a fresh ownership epoch: owner,
    /// registration date and expiry are all reset.
    pub fn register(
        &self,
        from: Address,
        name: &str,
        years: u32,
        value: Balance,
    ) -> Result<(Label, NameRecord), Error> {
        let label = Label::parse(name)?;
        let key = label.qualified();
        let now = self.clock.now();
        let record = self.registry.with_write(|view| {
            ensure_open(view)?;
            ensure_caller(&from)?;
            check_years(years)?;
            if view.is_reserved(&key)? {
                return Err(Error::Reserved);
            }
            let grace = view.grace_period()?;
            let previous = view.record(&key)?;
            if let Some(previous) = &previous {
                if !previous.is_released(now, grace) {
                    return Err(Error::NotAvailable);
                }
            }
            let oracle = UnitPrice::new(view.fee_per_year()?);
            let required = oracle.register_price(years).ok_or(Error::Overflow)?;
            if value < required {
                return Err(Error::InsufficientPayment {
                    required,
                    paid: value,
                });
            }
            let duration = SECONDS_PER_YEAR
                .checked_mul(years as Moment)
                .ok_or(Error::Overflow)?;
            let expire = now.checked_add(duration).ok_or(Error::Overflow)?;
            let record = NameRecord {
                owner: from,
                registration: now,
                expire,
            };
            if let Some(previous) = previous {
                view.unindex_owner(&previous.owner, &key)?;
            }
            view.put_record(&key, &record)?;
            view.index_owner(&from, &key)?;
            view.add_treasury(value)?;
            view.bump_registered()?;
            Ok(record)
        })?;
        info!(name = %key, owner = %from, expire = record.expire, "name registered");
        Ok((label, record))
    }

    /// Extends `name` by `years`, counted from the stored expiry rather
    /// than from now: time already paid for is preserved and lapsed time
    /// is not refunded. Allowed for the whole grace period, owner only.
    pub fn renew(
        &self,
        from: Address,
        name: &str,
        years: u32,
        value: Balance,
    ) -> Result<(Label, NameRecord), Error> {
        let label = Label::parse(name)?;
        let key = label.qualified();
        let now = self.clock.now();
        let record = self.registry.with_write(|view| {
            ensure_open(view)?;
            ensure_caller(&from)?;
            check_years(years)?;
            let mut record = view.record(&key)?.ok_or(Error::NotFound)?;
            if record.owner != from {
                return Err(Error::Unauthorized);
            }
            let grace = view.grace_period()?;
            if record.is_released(now, grace) {
                return Err(Error::NotRenewable);
            }
            let oracle = UnitPrice::new(view.fee_per_year()?);
            let required = oracle.renew_price(years).ok_or(Error::Overflow)?;
            if value < required {
                return Err(Error::InsufficientPayment {
                    required,
                    paid: value,
                });
            }
            let duration = SECONDS_PER_YEAR
                .checked_mul(years as Moment)
                .ok_or(Error::Overflow)?;
            record.expire = record.expire.checked_add(duration).ok_or(Error::Overflow)?;
            view.put_record(&key, &record)?;
            view.add_treasury(value)?;
            Ok(record)
        })?;
        info!(name = %key, years, expire = record.expire, "name renewed");
        Ok((label, record))
    }

    /// Reassigns `name` to `to`. Registration date and expiry are left
    /// untouched; no fee is taken. Owner only, and the recipient must be a
    /// real, non-zero address.
    pub fn transfer(
        &self,
        from: Address,
        name: &str,
        to: Address,
    ) -> Result<(Label, NameRecord), Error> {
        let label = Label::parse(name)?;
        let key = label.qualified();
        let record = self.registry.with_write(|view| {
            ensure_open(view)?;
            ensure_caller(&from)?;
            if to.is_zero() {
                return Err(Error::InvalidRecipient);
            }
            let mut record = view.record(&key)?.ok_or(Error::NotFound)?;
            if record.owner != from {
                return Err(Error::Unauthorized);
            }
            view.unindex_owner(&from, &key)?;
            record.owner = to;
            view.put_record(&key, &record)?;
            view.index_owner(&to, &key)?;
            Ok(record)
        })?;
        info!(name = %key, from = %from, to = %to, "name transferred");
        Ok((label, record))
    }

    /// Full record lookup; [`Error::NotFound`] when nothing is registered
    /// under the name.
    pub fn record(&self, name: &str) -> Result<(Label, NameRecord), Error> {
        let label = Label::parse(name)?;
        let key = label.qualified();
        let record = self
            .registry
            .with_read(|view| view.record(&key)?.ok_or(Error::NotFound))?;
        Ok((label, record))
    }

    pub fn owner_of(&self, name: &str) -> Result<Address, Error> {
        self.record(name).map(|(_, record)| record.owner)
    }

    pub fn registration_date(&self, name: &str) -> Result<Moment, Error> {
        self.record(name).map(|(_, record)| record.registration)
    }

    pub fn expiry_of(&self, name: &str) -> Result<Moment, Error> {
        self.record(name).map(|(_, record)| record.expire)
    }

    /// Every name currently recorded under `owner`, expired ones included,
    /// ordered by registration date. Status is the consumer's business.
    pub fn names_by_owner(&self, owner: Address) -> Result<Vec<(String, NameRecord)>, Error> {
        let mut entries = self
            .registry
            .with_read(|view| view.records_by_owner(&owner).map_err(Error::from))?;
        entries.sort_by_key(|(_, record)| record.registration);
        Ok(entries)
    }

    /// Every record in the registry, in name order.
    pub fn all(&self) -> Result<Vec<(String, NameRecord)>, Error> {
        self.registry
            .with_read(|view| view.all_records().map_err(Error::from))
    }

    /// Quote for registering a fresh name.
    pub fn register_price(&self, years: u32) -> Result<Balance, Error> {
        check_years(years)?;
        let fee = self
            .registry
            .with_read(|view| view.fee_per_year().map_err(Error::from))?;
        UnitPrice::new(fee)
            .register_price(years)
            .ok_or(Error::Overflow)
    }

    /// Quote for extending an existing name.
    pub fn renew_price(&self, years: u32) -> Result<Balance, Error> {
        check_years(years)?;
        let fee = self
            .registry
            .with_read(|view| view.fee_per_year().map_err(Error::from))?;
        UnitPrice::new(fee).renew_price(years).ok_or(Error::Overflow)
    }

    pub fn fee_per_year(&self) -> Result<Balance, Error> {
        self.registry
            .with_read(|view| view.fee_per_year().map_err(Error::from))
    }

    pub fn grace_period(&self) -> Result<Moment, Error> {
        self.registry
            .with_read(|view| view.grace_period().map_err(Error::from))
    }

    pub fn is_open(&self) -> Result<bool, Error> {
        self.registry
            .with_read(|view| view.is_open().map_err(Error::from))
    }

    /// Lifetime fees captured, in raw units.
    pub fn treasury(&self) -> Result<Balance, Error> {
        self.registry
            .with_read(|view| view.treasury().map_err(Error::from))
    }

    /// Lifetime count of successful registrations.
    pub fn registered_total(&self) -> Result<u64, Error> {
        self.registry
            .with_read(|view| view.registered_total().map_err(Error::from))
    }

    /// Puts `name` on the reserved list. Reserved names report unavailable
    /// and reject registration. Manager only; existing records are left
    /// alone.
    pub fn add_reserved(&self, from: Address, name: &str) -> Result<(), Error> {
        let key = Label::parse(name)?.qualified();
        self.registry.with_write(|view| -> Result<(), Error> {
            ensure_manager(view, &from)?;
            view.set_reserved(&key, true)?;
            Ok(())
        })?;
        info!(name = %key, "name reserved");
        Ok(())
    }

    /// Takes `name` off the reserved list. Manager only.
    pub fn remove_reserved(&self, from: Address, name: &str) -> Result<(), Error> {
        let key = Label::parse(name)?.qualified();
        self.registry.with_write(|view| -> Result<(), Error> {
            ensure_manager(view, &from)?;
            view.set_reserved(&key, false)?;
            Ok(())
        })?;
        info!(name = %key, "name unreserved");
        Ok(())
    }

    /// Closes or reopens the registrar. While closed, register/renew/
    /// transfer fail with [`Error::RegistrarClosed`]; reads and admin calls
    /// still work. Manager only.
    pub fn set_registrar_open(&self, from: Address, open: bool) -> Result<(), Error> {
        self.registry.with_write(|view| -> Result<(), Error> {
            ensure_manager(view, &from)?;
            view.set_open(open)?;
            Ok(())
        })?;
        info!(open, "registrar open flag set");
        Ok(())
    }

    /// Grants or revokes manager rights for `account`. Manager only.
    pub fn set_manager(&self, from: Address, account: Address, approved: bool) -> Result<(), Error> {
        if account.is_zero() {
            return Err(Error::InvalidRecipient);
        }
        self.registry.with_write(|view| -> Result<(), Error> {
            ensure_manager(view, &from)?;
            view.set_manager(&account, approved)?;
            Ok(())
        })?;
        info!(account = %account, approved, "manager set updated");
        Ok(())
    }
}

fn check_years(years: u32) -> Result<(), Error> {
    if !(MIN_REGISTRATION_YEARS..=MAX_REGISTRATION_YEARS).contains(&years) {
        return Err(Error::InvalidDuration { years });
    }
    Ok(())
}

fn ensure_open(view: &WriteView<'_>) -> Result<(), Error> {
    if !view.is_open()? {
        return Err(Error::RegistrarClosed);
    }
    Ok(())
}

fn ensure_caller(from: &Address) -> Result<(), Error> {
    if from.is_zero() {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

fn ensure_manager(view: &WriteView<'_>, from: &Address) -> Result<(), Error> {
    if from.is_zero() || !view.is_manager(from)? {
        return Err(Error::Unauthorized);
    }
    Ok(())
}
