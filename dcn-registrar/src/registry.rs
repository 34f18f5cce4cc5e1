//! The authoritative record store: a redb database holding name records,
//! the owner reverse index, the reserved list, the manager set and the
//! registry settings written at genesis.
//!
//! All access goes through [`Registry::with_read`] and
//! [`Registry::with_write`]. A write closure that returns `Err` aborts the
//! whole transaction, so callers get atomic rejection for free; redb
//! serializes write transactions, which orders racing mutations.

use std::path::Path;

use redb::{Database, ReadOnlyTable, ReadableTable, Table, TableDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use dcn_types::{Address, Balance, Label, Moment, NameRecord, SECONDS_PER_DAY};

/// `name` -> bincode [`NameRecord`]
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");
/// `owner bytes ++ name bytes` -> `name`
const OWNERS: TableDefinition<&[u8], &str> = TableDefinition::new("owners");
/// `name` if reserved -> ()
const RESERVED: TableDefinition<&str, ()> = TableDefinition::new("reserved");
/// `account bytes` if manager -> ()
const MANAGERS: TableDefinition<&[u8], ()> = TableDefinition::new("managers");
/// settings and counters, bincode values
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const SCHEMA_KEY: &str = "schema_version";
const OPEN_KEY: &str = "registrar_open";
const FEE_KEY: &str = "fee_per_year";
const GRACE_KEY: &str = "grace_period";
const TREASURY_KEY: &str = "treasury";
const REGISTERED_KEY: &str = "registered_total";

const SCHEMA_VERSION: u32 = 1;

/// 0.01 native units, 18 decimals.
pub const UNIT_FEE_PER_YEAR: Balance = 10_u128.pow(16);

/// How long after expiry a name stays recoverable by its owner.
pub const DEFAULT_GRACE_PERIOD: Moment = 90 * SECONDS_PER_DAY;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("failed to begin transaction: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("failed to open table: {0}")]
    Table(#[from] redb::TableError),
    #[error("storage fault: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("failed to commit transaction: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("failed to encode value: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode value: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("database is already initialized")]
    AlreadyInitialized,
    #[error("database is not initialized, deploy it first")]
    NotInitialized,
    #[error("unsupported schema version {0}")]
    UnsupportedSchema(u32),
    #[error("missing meta entry {0:?}")]
    MissingMeta(&'static str),
}

/// Settings written once, when the database is deployed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Fee per registration year, raw 18-decimal units.
    pub fee_per_year: Balance,
    /// Seconds after expiry during which only the owner may renew.
    pub grace_period: Moment,
    pub managers: Vec<Address>,
    pub reserved: Vec<Label>,
    pub open: bool,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        GenesisConfig {
            fee_per_year: UNIT_FEE_PER_YEAR,
            grace_period: DEFAULT_GRACE_PERIOD,
            managers: Vec::new(),
            reserved: Vec::new(),
            open: true,
        }
    }
}

pub struct Registry {
    db: Database,
}

impl Registry {
    /// Creates a fresh registry database at `path` and writes the genesis
    /// settings. Fails with [`StoreError::AlreadyInitialized`] if the file
    /// already holds a deployed registry.
    pub fn create(path: impl AsRef<Path>, genesis: &GenesisConfig) -> Result<Self, StoreError> {
        let db = Database::create(path)?;
        let registry = Registry { db };
        registry.init_genesis(genesis)?;
        Ok(registry)
    }

    /// Opens an already-deployed registry database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::open(path)?;
        let registry = Registry { db };
        registry.check_schema()?;
        Ok(registry)
    }

    /// Runs `f` against a read snapshot.
    pub fn with_read<R, E>(&self, f: impl FnOnce(&ReadView) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_read().map_err(StoreError::from)?;
        let view = ReadView::open(&txn).map_err(E::from)?;
        f(&view)
    }

    /// Runs `f` inside a write transaction. The transaction commits only if
    /// `f` returns `Ok`; any error aborts it with no state change.
    pub fn with_write<R, E>(
        &self,
        f: impl FnOnce(&mut WriteView<'_>) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        let result = {
            let mut view = WriteView::open(&txn).map_err(E::from)?;
            f(&mut view)?
        };
        txn.commit().map_err(StoreError::from)?;
        Ok(result)
    }

    fn init_genesis(&self, genesis: &GenesisConfig) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut meta = txn.open_table(META)?;
            if meta.get(SCHEMA_KEY)?.is_some() {
                return Err(StoreError::AlreadyInitialized);
            }
            write_meta(&mut meta, SCHEMA_KEY, &SCHEMA_VERSION)?;
            write_meta(&mut meta, OPEN_KEY, &genesis.open)?;
            write_meta(&mut meta, FEE_KEY, &genesis.fee_per_year)?;
            write_meta(&mut meta, GRACE_KEY, &genesis.grace_period)?;
            write_meta(&mut meta, TREASURY_KEY, &0_u128)?;
            write_meta(&mut meta, REGISTERED_KEY, &0_u64)?;

            let mut managers = txn.open_table(MANAGERS)?;
            for manager in &genesis.managers {
                managers.insert(manager.as_bytes(), ())?;
            }
            let mut reserved = txn.open_table(RESERVED)?;
            for label in &genesis.reserved {
                reserved.insert(label.qualified().as_str(), ())?;
            }
            // create the remaining tables so later opens never miss them
            txn.open_table(RECORDS)?;
            txn.open_table(OWNERS)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn check_schema(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_read()?;
        let meta = match txn.open_table(META) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => {
                return Err(StoreError::NotInitialized)
            }
            Err(e) => return Err(e.into()),
        };
        let Some(guard) = meta.get(SCHEMA_KEY)? else {
            return Err(StoreError::NotInitialized);
        };
        let (version, _): (u32, usize) =
            bincode::serde::decode_from_slice(guard.value(), bincode::config::legacy())?;
        if version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema(version));
        }
        Ok(())
    }
}

/// Snapshot view over all tables.
pub struct ReadView {
    records: ReadOnlyTable<&'static str, &'static [u8]>,
    owners: ReadOnlyTable<&'static [u8], &'static str>,
    reserved: ReadOnlyTable<&'static str, ()>,
    managers: ReadOnlyTable<&'static [u8], ()>,
    meta: ReadOnlyTable<&'static str, &'static [u8]>,
}

impl ReadView {
    fn open(txn: &redb::ReadTransaction) -> Result<Self, StoreError> {
        Ok(ReadView {
            records: txn.open_table(RECORDS)?,
            owners: txn.open_table(OWNERS)?,
            reserved: txn.open_table(RESERVED)?,
            managers: txn.open_table(MANAGERS)?,
            meta: txn.open_table(META)?,
        })
    }

    pub fn record(&self, name: &str) -> Result<Option<NameRecord>, StoreError> {
        get_record(&self.records, name)
    }

    pub fn is_reserved(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.reserved.get(name)?.is_some())
    }

    pub fn is_manager(&self, account: &Address) -> Result<bool, StoreError> {
        Ok(self.managers.get(account.as_bytes())?.is_some())
    }

    pub fn is_open(&self) -> Result<bool, StoreError> {
        read_meta(&self.meta, OPEN_KEY)
    }

    pub fn fee_per_year(&self) -> Result<Balance, StoreError> {
        read_meta(&self.meta, FEE_KEY)
    }

    pub fn grace_period(&self) -> Result<Moment, StoreError> {
        read_meta(&self.meta, GRACE_KEY)
    }

    pub fn treasury(&self) -> Result<Balance, StoreError> {
        read_meta(&self.meta, TREASURY_KEY)
    }

    pub fn registered_total(&self) -> Result<u64, StoreError> {
        read_meta(&self.meta, REGISTERED_KEY)
    }

    /// Every record currently indexed under `owner`, expired ones included.
    pub fn records_by_owner(
        &self,
        owner: &Address,
    ) -> Result<Vec<(String, NameRecord)>, StoreError> {
        let names = scan_owner(&self.owners, owner)?;
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            match get_record(&self.records, &name)? {
                Some(record) => entries.push((name, record)),
                None => debug!("dangling owner index entry for {name:?}"),
            }
        }
        Ok(entries)
    }

    pub fn all_records(&self) -> Result<Vec<(String, NameRecord)>, StoreError> {
        let mut entries = Vec::new();
        for entry in self.records.iter()? {
            let (name, value) = entry?;
            let (record, _) = bincode::serde::decode_from_slice(
                value.value(),
                bincode::config::legacy(),
            )?;
            entries.push((name.value().to_string(), record));
        }
        Ok(entries)
    }
}

/// Mutable view bound to one write transaction.
pub struct WriteView<'txn> {
    records: Table<'txn, &'static str, &'static [u8]>,
    owners: Table<'txn, &'static [u8], &'static str>,
    reserved: Table<'txn, &'static str, ()>,
    managers: Table<'txn, &'static [u8], ()>,
    meta: Table<'txn, &'static str, &'static [u8]>,
}

impl<'txn> WriteView<'txn> {
    fn open(txn: &'txn redb::WriteTransaction) -> Result<Self, StoreError> {
        Ok(WriteView {
            records: txn.open_table(RECORDS)?,
            owners: txn.open_table(OWNERS)?,
            reserved: txn.open_table(RESERVED)?,
            managers: txn.open_table(MANAGERS)?,
            meta: txn.open_table(META)?,
        })
    }

    pub fn record(&self, name: &str) -> Result<Option<NameRecord>, StoreError> {
        get_record(&self.records, name)
    }

    pub fn is_reserved(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.reserved.get(name)?.is_some())
    }

    pub fn is_manager(&self, account: &Address) -> Result<bool, StoreError> {
        Ok(self.managers.get(account.as_bytes())?.is_some())
    }

    pub fn is_open(&self) -> Result<bool, StoreError> {
        read_meta(&self.meta, OPEN_KEY)
    }

    pub fn fee_per_year(&self) -> Result<Balance, StoreError> {
        read_meta(&self.meta, FEE_KEY)
    }

    pub fn grace_period(&self) -> Result<Moment, StoreError> {
        read_meta(&self.meta, GRACE_KEY)
    }

    pub fn put_record(&mut self, name: &str, record: &NameRecord) -> Result<(), StoreError> {
        let bytes = bincode::serde::encode_to_vec(record, bincode::config::legacy())?;
        self.records.insert(name, bytes.as_slice())?;
        Ok(())
    }

    pub fn index_owner(&mut self, owner: &Address, name: &str) -> Result<(), StoreError> {
        self.owners.insert(owner_key(owner, name).as_slice(), name)?;
        Ok(())
    }

    pub fn unindex_owner(&mut self, owner: &Address, name: &str) -> Result<(), StoreError> {
        self.owners.remove(owner_key(owner, name).as_slice())?;
        Ok(())
    }

    pub fn set_reserved(&mut self, name: &str, reserved: bool) -> Result<(), StoreError> {
        if reserved {
            self.reserved.insert(name, ())?;
        } else {
            self.reserved.remove(name)?;
        }
        Ok(())
    }

    pub fn set_manager(&mut self, account: &Address, approved: bool) -> Result<(), StoreError> {
        if approved {
            self.managers.insert(account.as_bytes(), ())?;
        } else {
            self.managers.remove(account.as_bytes())?;
        }
        Ok(())
    }

    pub fn set_open(&mut self, open: bool) -> Result<(), StoreError> {
        write_meta(&mut self.meta, OPEN_KEY, &open)
    }

    pub fn add_treasury(&mut self, value: Balance) -> Result<(), StoreError> {
        let current: Balance = read_meta(&self.meta, TREASURY_KEY)?;
        write_meta(&mut self.meta, TREASURY_KEY, &current.saturating_add(value))
    }

    pub fn bump_registered(&mut self) -> Result<(), StoreError> {
        let current: u64 = read_meta(&self.meta, REGISTERED_KEY)?;
        write_meta(&mut self.meta, REGISTERED_KEY, &current.saturating_add(1))
    }
}

fn get_record(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    name: &str,
) -> Result<Option<NameRecord>, StoreError> {
    let Some(guard) = table.get(name)? else {
        return Ok(None);
    };
    let (record, _) =
        bincode::serde::decode_from_slice(guard.value(), bincode::config::legacy())?;
    Ok(Some(record))
}

fn read_meta<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &'static str,
) -> Result<T, StoreError> {
    let guard = table.get(key)?.ok_or(StoreError::MissingMeta(key))?;
    let (value, _) = bincode::serde::decode_from_slice(guard.value(), bincode::config::legacy())?;
    Ok(value)
}

fn write_meta<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    key: &'static str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::legacy())?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}

fn scan_owner(
    table: &impl ReadableTable<&'static [u8], &'static str>,
    owner: &Address,
) -> Result<Vec<String>, StoreError> {
    let lo = owner.as_bytes().to_vec();
    let range = match prefix_successor(lo.clone()) {
        Some(hi) => table.range(lo.as_slice()..hi.as_slice())?,
        None => table.range(lo.as_slice()..)?,
    };
    let mut names = Vec::new();
    for entry in range {
        let (_, name) = entry?;
        names.push(name.value().to_string());
    }
    Ok(names)
}

fn owner_key(owner: &Address, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN + name.len());
    key.extend_from_slice(owner.as_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

/// Smallest byte string greater than every string starting with `prefix`,
/// or `None` for an all-0xff prefix.
fn prefix_successor(mut prefix: Vec<u8>) -> Option<Vec<u8>> {
    while let Some(last) = prefix.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(prefix);
        }
        prefix.pop();
    }
    None
}
