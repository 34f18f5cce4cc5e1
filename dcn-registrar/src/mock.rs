//! Test harness: a registry on a throwaway file and a hand-cranked clock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use dcn_types::{Address, Moment};

use crate::registrar::Registrar;
use crate::registry::{GenesisConfig, Registry};
use crate::traits::UnixNow;

pub const RICH_ACCOUNT: Address = Address([1; 20]);
pub const MONEY_ACCOUNT: Address = Address([2; 20]);
pub const POOR_ACCOUNT: Address = Address([3; 20]);
pub const MANAGER_ACCOUNT: Address = Address([9; 20]);

/// Every test registry starts at this instant.
pub const START_TIME: Moment = 1_700_000_000;

#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn set(&self, now: Moment) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Moment) {
        self.0.fetch_add(by, Ordering::SeqCst);
    }
}

impl UnixNow for ManualClock {
    fn now(&self) -> Moment {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct TestExt {
    pub registrar: Registrar<ManualClock>,
    pub clock: ManualClock,
    pub db_path: PathBuf,
    _dir: TempDir,
}

pub fn test_genesis() -> GenesisConfig {
    GenesisConfig {
        managers: vec![MANAGER_ACCOUNT],
        ..GenesisConfig::default()
    }
}

pub fn new_test_ext() -> TestExt {
    new_test_ext_with(test_genesis())
}

pub fn new_test_ext_with(genesis: GenesisConfig) -> TestExt {
    let dir = TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("registry.redb");
    let registry = Registry::create(&db_path, &genesis).expect("deploy test registry");
    let clock = ManualClock::default();
    clock.set(START_TIME);
    TestExt {
        registrar: Registrar::with_clock(registry, clock.clone()),
        clock,
        db_path,
        _dir: dir,
    }
}
