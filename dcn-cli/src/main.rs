//! Operator console for `.dcn` registry databases: deploy one, then drive
//! registrations, renewals, transfers and queries against it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use dcn_registrar::{GenesisConfig, Registrar, Registry};
use dcn_types::{format_native, parse_native, Address, Balance, Label, Moment, SECONDS_PER_DAY};

#[derive(Debug, Parser)]
#[command(name = "dcn-cli", version, about)]
struct Cli {
    /// Registry database path.
    #[arg(long, global = true, default_value = "dcn.redb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize a new registry database.
    Deploy {
        /// Genesis TOML file; built-in defaults apply when omitted.
        #[arg(long)]
        genesis: Option<PathBuf>,
    },
    /// Show registry settings and counters.
    Status,
    /// Check whether a name can be registered.
    Available { name: String },
    /// Register a name.
    Register {
        name: String,
        /// Acting address.
        #[arg(long)]
        from: Address,
        /// Duration in years.
        #[arg(long, default_value_t = 1)]
        years: u32,
        /// Payment in native units, e.g. "0.01". Defaults to the exact fee.
        #[arg(long)]
        value: Option<String>,
    },
    /// Extend an existing registration.
    Renew {
        name: String,
        #[arg(long)]
        from: Address,
        #[arg(long, default_value_t = 1)]
        years: u32,
        /// Payment in native units. Defaults to the exact fee.
        #[arg(long)]
        value: Option<String>,
    },
    /// Hand a name over to another address.
    Transfer {
        name: String,
        #[arg(long)]
        from: Address,
        #[arg(long)]
        to: Address,
    },
    /// Show the full record for a name.
    Info { name: String },
    /// List every name held by an address.
    Names { address: Address },
    /// Quote the registration fee for a duration.
    Fee { years: u32 },
    /// Reserve a name, or release it with --remove (manager).
    Reserve {
        name: String,
        #[arg(long)]
        from: Address,
        /// Release the name instead of reserving it.
        #[arg(long)]
        remove: bool,
    },
    /// Open or close the registrar (manager).
    SetOpen {
        open: bool,
        #[arg(long)]
        from: Address,
    },
    /// Grant manager rights, or revoke them with --revoke (manager).
    SetManager {
        account: Address,
        #[arg(long)]
        from: Address,
        /// Revoke instead of granting.
        #[arg(long)]
        revoke: bool,
    },
}

/// On-disk genesis description, friendlier than raw units.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct GenesisFile {
    /// Fee per year as a decimal string, e.g. "0.01".
    fee_per_year: String,
    /// Grace period in days.
    grace_days: u64,
    managers: Vec<Address>,
    reserved: Vec<Label>,
    open: bool,
}

impl Default for GenesisFile {
    fn default() -> Self {
        GenesisFile {
            fee_per_year: "0.01".to_string(),
            grace_days: 90,
            managers: Vec::new(),
            reserved: Vec::new(),
            open: true,
        }
    }
}

impl GenesisFile {
    fn into_genesis(self) -> anyhow::Result<GenesisConfig> {
        Ok(GenesisConfig {
            fee_per_year: parse_native(&self.fee_per_year)
                .with_context(|| format!("parse fee_per_year {:?}", self.fee_per_year))?,
            grace_period: self.grace_days * SECONDS_PER_DAY,
            managers: self.managers,
            reserved: self.reserved,
            open: self.open,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Cli { db, command } = Cli::parse();
    match command {
        Command::Deploy { genesis } => deploy(&db, genesis.as_deref()),
        Command::Status => status(&open_registrar(&db)?),
        Command::Available { name } => available(&open_registrar(&db)?, &name),
        Command::Register {
            name,
            from,
            years,
            value,
        } => register(&open_registrar(&db)?, &name, from, years, value.as_deref()),
        Command::Renew {
            name,
            from,
            years,
            value,
        } => renew(&open_registrar(&db)?, &name, from, years, value.as_deref()),
        Command::Transfer { name, from, to } => {
            let registrar = open_registrar(&db)?;
            let (label, record) = registrar
                .transfer(from, &name, to)
                .context("transfer failed")?;
            println!(
                "name '{}' transferred to {}",
                label.qualified(),
                record.owner
            );
            Ok(())
        }
        Command::Info { name } => info(&open_registrar(&db)?, &name),
        Command::Names { address } => names(&open_registrar(&db)?, address),
        Command::Fee { years } => fee(&open_registrar(&db)?, years),
        Command::Reserve { name, from, remove } => {
            let registrar = open_registrar(&db)?;
            if remove {
                registrar
                    .remove_reserved(from, &name)
                    .context("unreserve failed")?;
                println!("name '{name}' released from the reserved list");
            } else {
                registrar.add_reserved(from, &name).context("reserve failed")?;
                println!("name '{name}' reserved");
            }
            Ok(())
        }
        Command::SetOpen { open, from } => {
            let registrar = open_registrar(&db)?;
            registrar
                .set_registrar_open(from, open)
                .context("set-open failed")?;
            println!("registrar is now {}", if open { "open" } else { "closed" });
            Ok(())
        }
        Command::SetManager {
            account,
            from,
            revoke,
        } => {
            let registrar = open_registrar(&db)?;
            registrar
                .set_manager(from, account, !revoke)
                .context("set-manager failed")?;
            println!(
                "manager rights {} for {account}",
                if revoke { "revoked" } else { "granted" }
            );
            Ok(())
        }
    }
}

fn open_registrar(db: &Path) -> anyhow::Result<Registrar> {
    let registry = Registry::open(db)
        .with_context(|| format!("open registry database {}", db.display()))?;
    Ok(Registrar::new(registry))
}

fn deploy(db: &Path, genesis_path: Option<&Path>) -> anyhow::Result<()> {
    let file = match genesis_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("read genesis file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("parse genesis file {}", path.display()))?
        }
        None => GenesisFile::default(),
    };
    let genesis = file.into_genesis()?;
    Registry::create(db, &genesis).context("deploy failed")?;
    println!("registry deployed to {}", db.display());
    println!(
        "fee {} per year, grace period {} days, registrar {}",
        format_native(genesis.fee_per_year),
        genesis.grace_period / SECONDS_PER_DAY,
        if genesis.open { "open" } else { "closed" },
    );
    Ok(())
}

fn status(registrar: &Registrar) -> anyhow::Result<()> {
    println!(
        "registrar         {}",
        if registrar.is_open()? { "open" } else { "closed" }
    );
    println!(
        "fee per year      {}",
        format_native(registrar.fee_per_year()?)
    );
    println!(
        "grace period      {} days",
        registrar.grace_period()? / SECONDS_PER_DAY
    );
    println!("names registered  {}", registrar.registered_total()?);
    println!("treasury          {}", format_native(registrar.treasury()?));
    Ok(())
}

fn available(registrar: &Registrar, name: &str) -> anyhow::Result<()> {
    let label = Label::parse(name)?;
    let available = registrar.is_available(name)?;
    println!("name '{}' is available: {available}", label.qualified());
    if !available {
        println!("already registered or reserved, choose another");
    }
    Ok(())
}

fn register(
    registrar: &Registrar,
    name: &str,
    from: Address,
    years: u32,
    value: Option<&str>,
) -> anyhow::Result<()> {
    let paid = payment(registrar.register_price(years)?, value)?;
    println!(
        "registering '{name}' for {years} year(s) with fee {} ({paid} raw units)",
        format_native(paid)
    );
    let (label, record) = registrar
        .register(from, name, years, paid)
        .context("registration failed")?;
    println!("name '{}' registered to {}", label.qualified(), record.owner);
    println!("expires {}", render_time(record.expire));
    Ok(())
}

fn renew(
    registrar: &Registrar,
    name: &str,
    from: Address,
    years: u32,
    value: Option<&str>,
) -> anyhow::Result<()> {
    let paid = payment(registrar.renew_price(years)?, value)?;
    println!(
        "renewing '{name}' for {years} year(s) with fee {} ({paid} raw units)",
        format_native(paid)
    );
    let (label, record) = registrar
        .renew(from, name, years, paid)
        .context("renewal failed")?;
    println!(
        "name '{}' now expires {}",
        label.qualified(),
        render_time(record.expire)
    );
    Ok(())
}

fn info(registrar: &Registrar, name: &str) -> anyhow::Result<()> {
    let (label, record) = registrar.record(name).context("lookup failed")?;
    let grace = registrar.grace_period()?;
    let now = registrar.now();
    println!("name        {}", label.qualified());
    println!("owner       {}", record.owner);
    println!("registered  {}", render_time(record.registration));
    println!("expires     {}", render_time(record.expire));
    println!("status      {}", record.status(now, grace));
    let days = record.days_until_expiry(now);
    if days > 0 {
        println!("days left   {days}");
    }
    Ok(())
}

fn names(registrar: &Registrar, address: Address) -> anyhow::Result<()> {
    let entries = registrar.names_by_owner(address)?;
    if entries.is_empty() {
        println!("no names registered to {address}");
        return Ok(());
    }
    let grace = registrar.grace_period()?;
    let now = registrar.now();
    for (name, record) in entries {
        println!(
            "{name}  expires {}  ({})",
            render_time(record.expire),
            record.status(now, grace)
        );
    }
    Ok(())
}

fn fee(registrar: &Registrar, years: u32) -> anyhow::Result<()> {
    let amount = registrar.register_price(years)?;
    println!(
        "{years} year(s): {} ({amount} raw units)",
        format_native(amount)
    );
    Ok(())
}

/// Explicit payment when given, the exact quoted fee otherwise.
fn payment(required: Balance, value: Option<&str>) -> anyhow::Result<Balance> {
    match value {
        Some(text) => parse_native(text).with_context(|| format!("parse value {text:?}")),
        None => Ok(required),
    }
}

fn render_time(ts: Moment) -> String {
    chrono::DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}
