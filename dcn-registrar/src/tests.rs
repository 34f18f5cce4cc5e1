use crate::mock::*;
use crate::registrar::{Error, Registrar, MAX_REGISTRATION_YEARS};
use crate::registry::{Registry, StoreError, UNIT_FEE_PER_YEAR};
use crate::traits::UnixNow;
use dcn_types::{Address, Label};

const DAYS: u64 = 24 * 60 * 60;
const YEAR: u64 = 365 * DAYS;

#[test]
fn register_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;

    // unsupported shapes never reach the store
    assert!(matches!(
        registrar.register(RICH_ACCOUNT, "hello world", 1, UNIT_FEE_PER_YEAR),
        Err(Error::InvalidName(_))
    ));
    assert!(matches!(
        registrar.register(RICH_ACCOUNT, "he--llo", 1, UNIT_FEE_PER_YEAR),
        Err(Error::InvalidName(_))
    ));

    // duration is bounded in whole years
    assert!(matches!(
        registrar.register(RICH_ACCOUNT, "alice", 0, UNIT_FEE_PER_YEAR),
        Err(Error::InvalidDuration { years: 0 })
    ));
    assert!(matches!(
        registrar.register(
            RICH_ACCOUNT,
            "alice",
            MAX_REGISTRATION_YEARS + 1,
            UNIT_FEE_PER_YEAR
        ),
        Err(Error::InvalidDuration { years: 11 })
    ));

    // underpayment is refused without touching state
    let short = UNIT_FEE_PER_YEAR - 1;
    match registrar.register(POOR_ACCOUNT, "alice", 1, short) {
        Err(Error::InsufficientPayment { required, paid }) => {
            assert_eq!(required, UNIT_FEE_PER_YEAR);
            assert_eq!(paid, short);
        }
        other => panic!("expected InsufficientPayment, got {other:?}"),
    }
    assert!(registrar.is_available("alice.dcn").unwrap());
    assert_eq!(registrar.treasury().unwrap(), 0);
    assert_eq!(registrar.registered_total().unwrap(), 0);

    // one year of alice.dcn at the unit fee
    let (label, record) = registrar
        .register(RICH_ACCOUNT, "alice.dcn", 1, UNIT_FEE_PER_YEAR)
        .unwrap();
    assert_eq!(label.qualified(), "alice.dcn");
    assert_eq!(record.owner, RICH_ACCOUNT);
    assert_eq!(record.registration, START_TIME);
    assert_eq!(record.expire, START_TIME + YEAR);
    assert!(!registrar.is_available("alice.dcn").unwrap());
    assert_eq!(registrar.owner_of("alice.dcn").unwrap(), RICH_ACCOUNT);
    assert_eq!(registrar.registration_date("alice.dcn").unwrap(), START_TIME);
    assert_eq!(registrar.expiry_of("alice.dcn").unwrap(), START_TIME + YEAR);

    // occupied names cannot be taken, whatever the casing
    assert!(matches!(
        registrar.register(MONEY_ACCOUNT, "Alice.DCN", 1, UNIT_FEE_PER_YEAR),
        Err(Error::NotAvailable)
    ));

    // the zero address cannot act
    assert!(matches!(
        registrar.register(Address::ZERO, "fresh", 1, UNIT_FEE_PER_YEAR),
        Err(Error::Unauthorized)
    ));

    // overpayment is captured whole
    registrar
        .register(MONEY_ACCOUNT, "bob", 2, 3 * UNIT_FEE_PER_YEAR)
        .unwrap();
    assert_eq!(
        registrar.treasury().unwrap(),
        UNIT_FEE_PER_YEAR + 3 * UNIT_FEE_PER_YEAR
    );
    assert_eq!(registrar.registered_total().unwrap(), 2);
}

#[test]
fn renew_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;

    assert!(matches!(
        registrar.renew(RICH_ACCOUNT, "ghost", 1, UNIT_FEE_PER_YEAR),
        Err(Error::NotFound)
    ));

    registrar
        .register(RICH_ACCOUNT, "hello-world", 1, UNIT_FEE_PER_YEAR)
        .unwrap();
    let expire = registrar.expiry_of("hello-world").unwrap();

    // only the owner may renew, and a failed renewal moves nothing
    assert!(matches!(
        registrar.renew(MONEY_ACCOUNT, "hello-world", 1, UNIT_FEE_PER_YEAR),
        Err(Error::Unauthorized)
    ));
    assert_eq!(registrar.expiry_of("hello-world").unwrap(), expire);

    assert!(matches!(
        registrar.renew(RICH_ACCOUNT, "hello-world", 2, 2 * UNIT_FEE_PER_YEAR - 1),
        Err(Error::InsufficientPayment { .. })
    ));
    assert_eq!(registrar.expiry_of("hello-world").unwrap(), expire);

    // renewals stack on the stored expiry even when paid early
    ext.clock.advance(30 * DAYS);
    registrar
        .renew(RICH_ACCOUNT, "hello-world", 2, 2 * UNIT_FEE_PER_YEAR)
        .unwrap();
    ext.clock.advance(5 * DAYS);
    registrar
        .renew(RICH_ACCOUNT, "hello-world", 3, 3 * UNIT_FEE_PER_YEAR)
        .unwrap();
    assert_eq!(registrar.expiry_of("hello-world").unwrap(), expire + 5 * YEAR);

    // the registration date never moves
    assert_eq!(
        registrar.registration_date("hello-world").unwrap(),
        START_TIME
    );
    assert_eq!(registrar.treasury().unwrap(), 6 * UNIT_FEE_PER_YEAR);
    assert_eq!(registrar.registered_total().unwrap(), 1);
}

#[test]
fn grace_period_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;
    let grace = registrar.grace_period().unwrap();
    assert_eq!(grace, 90 * DAYS);

    registrar
        .register(RICH_ACCOUNT, "fade", 1, UNIT_FEE_PER_YEAR)
        .unwrap();
    let expire = START_TIME + YEAR;

    // expired but in grace: protected from takeover, still renewable
    ext.clock.set(expire + 1);
    assert!(!registrar.is_available("fade").unwrap());
    assert!(matches!(
        registrar.register(MONEY_ACCOUNT, "fade", 1, UNIT_FEE_PER_YEAR),
        Err(Error::NotAvailable)
    ));

    // the boundary is inclusive: the last grace second still renews,
    // and the extension counts from the stored expiry, not from now
    ext.clock.set(expire + grace);
    registrar
        .renew(RICH_ACCOUNT, "fade", 1, UNIT_FEE_PER_YEAR)
        .unwrap();
    assert_eq!(registrar.expiry_of("fade").unwrap(), expire + YEAR);

    // run it past the grace period for good
    ext.clock.set(expire + YEAR + grace + 1);
    assert!(registrar.is_available("fade").unwrap());
    assert!(matches!(
        registrar.renew(RICH_ACCOUNT, "fade", 1, UNIT_FEE_PER_YEAR),
        Err(Error::NotRenewable)
    ));

    // takeover rewrites the whole record
    let now = ext.clock.now();
    let (_, record) = registrar
        .register(MONEY_ACCOUNT, "fade", 2, 2 * UNIT_FEE_PER_YEAR)
        .unwrap();
    assert_eq!(record.owner, MONEY_ACCOUNT);
    assert_eq!(record.registration, now);
    assert_eq!(record.expire, now + 2 * YEAR);

    // the reverse index follows the takeover
    assert!(registrar.names_by_owner(RICH_ACCOUNT).unwrap().is_empty());
    let names = registrar.names_by_owner(MONEY_ACCOUNT).unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].0, "fade.dcn");
}

#[test]
fn transfer_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;

    assert!(matches!(
        registrar.transfer(RICH_ACCOUNT, "ghost", MONEY_ACCOUNT),
        Err(Error::NotFound)
    ));

    registrar
        .register(RICH_ACCOUNT, "market", 3, 3 * UNIT_FEE_PER_YEAR)
        .unwrap();
    let expire = registrar.expiry_of("market").unwrap();

    assert!(matches!(
        registrar.transfer(MONEY_ACCOUNT, "market", POOR_ACCOUNT),
        Err(Error::Unauthorized)
    ));
    assert!(matches!(
        registrar.transfer(RICH_ACCOUNT, "market", Address::ZERO),
        Err(Error::InvalidRecipient)
    ));

    // a real transfer moves ownership and nothing else
    let (_, record) = registrar
        .transfer(RICH_ACCOUNT, "market", MONEY_ACCOUNT)
        .unwrap();
    assert_eq!(record.owner, MONEY_ACCOUNT);
    assert_eq!(record.registration, START_TIME);
    assert_eq!(record.expire, expire);
    assert_eq!(registrar.owner_of("market").unwrap(), MONEY_ACCOUNT);

    // the old owner is out of the loop
    assert!(matches!(
        registrar.transfer(RICH_ACCOUNT, "market", RICH_ACCOUNT),
        Err(Error::Unauthorized)
    ));
    assert!(registrar.names_by_owner(RICH_ACCOUNT).unwrap().is_empty());
    assert_eq!(registrar.names_by_owner(MONEY_ACCOUNT).unwrap().len(), 1);

    // transfers stay possible through the grace period
    ext.clock.set(expire + DAYS);
    registrar
        .transfer(MONEY_ACCOUNT, "market", POOR_ACCOUNT)
        .unwrap();
    assert_eq!(registrar.owner_of("market").unwrap(), POOR_ACCOUNT);
    assert_eq!(registrar.expiry_of("market").unwrap(), expire);

    // self-transfer is pointless but legal
    registrar
        .transfer(POOR_ACCOUNT, "market", POOR_ACCOUNT)
        .unwrap();
    assert_eq!(registrar.owner_of("market").unwrap(), POOR_ACCOUNT);
    assert_eq!(registrar.names_by_owner(POOR_ACCOUNT).unwrap().len(), 1);
}

#[test]
fn query_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;

    assert!(registrar.is_available("anyone").unwrap());
    assert!(matches!(registrar.owner_of("anyone"), Err(Error::NotFound)));
    assert!(matches!(
        registrar.registration_date("anyone"),
        Err(Error::NotFound)
    ));
    assert!(matches!(registrar.expiry_of("anyone"), Err(Error::NotFound)));
    assert!(matches!(
        registrar.is_available("no spaces"),
        Err(Error::InvalidName(_))
    ));

    // listing keeps registration order, not lexical order
    registrar
        .register(RICH_ACCOUNT, "zebra", 1, UNIT_FEE_PER_YEAR)
        .unwrap();
    ext.clock.advance(DAYS);
    registrar
        .register(RICH_ACCOUNT, "apple", 1, UNIT_FEE_PER_YEAR)
        .unwrap();

    let names = registrar.names_by_owner(RICH_ACCOUNT).unwrap();
    assert_eq!(
        names
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>(),
        vec!["zebra.dcn", "apple.dcn"]
    );

    // expired names stay listed while the record exists
    ext.clock.set(START_TIME + 2 * YEAR);
    assert_eq!(registrar.names_by_owner(RICH_ACCOUNT).unwrap().len(), 2);
    assert!(registrar
        .names_by_owner(MONEY_ACCOUNT)
        .unwrap()
        .is_empty());

    assert_eq!(registrar.all().unwrap().len(), 2);
}

#[test]
fn reserved_test() {
    let mut genesis = test_genesis();
    genesis.reserved.push(Label::parse("registry").unwrap());
    let ext = new_test_ext_with(genesis);
    let registrar = &ext.registrar;

    // seeded from genesis
    assert!(!registrar.is_available("registry").unwrap());
    assert!(matches!(
        registrar.register(RICH_ACCOUNT, "registry", 1, UNIT_FEE_PER_YEAR),
        Err(Error::Reserved)
    ));

    // only managers touch the list
    assert!(matches!(
        registrar.add_reserved(RICH_ACCOUNT, "gold"),
        Err(Error::Unauthorized)
    ));
    registrar.add_reserved(MANAGER_ACCOUNT, "gold").unwrap();
    assert!(!registrar.is_available("gold").unwrap());
    assert!(matches!(
        registrar.register(RICH_ACCOUNT, "gold", 1, UNIT_FEE_PER_YEAR),
        Err(Error::Reserved)
    ));

    registrar.remove_reserved(MANAGER_ACCOUNT, "gold").unwrap();
    assert!(registrar.is_available("gold").unwrap());
    registrar
        .register(RICH_ACCOUNT, "gold", 1, UNIT_FEE_PER_YEAR)
        .unwrap();
}

#[test]
fn registrar_open_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;

    registrar
        .register(RICH_ACCOUNT, "early", 1, UNIT_FEE_PER_YEAR)
        .unwrap();
    assert!(registrar.is_open().unwrap());

    assert!(matches!(
        registrar.set_registrar_open(RICH_ACCOUNT, false),
        Err(Error::Unauthorized)
    ));
    registrar
        .set_registrar_open(MANAGER_ACCOUNT, false)
        .unwrap();
    assert!(!registrar.is_open().unwrap());

    // closed means no paid mutations
    assert!(matches!(
        registrar.register(MONEY_ACCOUNT, "late", 1, UNIT_FEE_PER_YEAR),
        Err(Error::RegistrarClosed)
    ));
    assert!(matches!(
        registrar.renew(RICH_ACCOUNT, "early", 1, UNIT_FEE_PER_YEAR),
        Err(Error::RegistrarClosed)
    ));
    assert!(matches!(
        registrar.transfer(RICH_ACCOUNT, "early", MONEY_ACCOUNT),
        Err(Error::RegistrarClosed)
    ));

    // while reads and administration keep working
    assert_eq!(registrar.owner_of("early").unwrap(), RICH_ACCOUNT);
    assert!(!registrar.is_available("early").unwrap());
    registrar.add_reserved(MANAGER_ACCOUNT, "held").unwrap();

    registrar.set_registrar_open(MANAGER_ACCOUNT, true).unwrap();
    registrar
        .register(MONEY_ACCOUNT, "late", 1, UNIT_FEE_PER_YEAR)
        .unwrap();

    // a genesis can start closed
    let mut genesis = test_genesis();
    genesis.open = false;
    let closed = new_test_ext_with(genesis);
    assert!(!closed.registrar.is_open().unwrap());
    assert!(matches!(
        closed
            .registrar
            .register(RICH_ACCOUNT, "shut", 1, UNIT_FEE_PER_YEAR),
        Err(Error::RegistrarClosed)
    ));
}

#[test]
fn manager_origin_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;

    assert!(matches!(
        registrar.set_manager(RICH_ACCOUNT, MONEY_ACCOUNT, true),
        Err(Error::Unauthorized)
    ));
    assert!(matches!(
        registrar.set_manager(MANAGER_ACCOUNT, Address::ZERO, true),
        Err(Error::InvalidRecipient)
    ));

    registrar
        .set_manager(MANAGER_ACCOUNT, MONEY_ACCOUNT, true)
        .unwrap();
    registrar.add_reserved(MONEY_ACCOUNT, "taken").unwrap();

    registrar
        .set_manager(MANAGER_ACCOUNT, MONEY_ACCOUNT, false)
        .unwrap();
    assert!(matches!(
        registrar.add_reserved(MONEY_ACCOUNT, "more"),
        Err(Error::Unauthorized)
    ));
}

#[test]
fn price_test() {
    let ext = new_test_ext();
    let registrar = &ext.registrar;

    assert_eq!(registrar.fee_per_year().unwrap(), UNIT_FEE_PER_YEAR);
    assert_eq!(registrar.register_price(1).unwrap(), UNIT_FEE_PER_YEAR);
    assert_eq!(
        registrar.register_price(10).unwrap(),
        10 * UNIT_FEE_PER_YEAR
    );
    assert_eq!(
        registrar.renew_price(4).unwrap(),
        registrar.register_price(4).unwrap()
    );
    assert!(matches!(
        registrar.register_price(0),
        Err(Error::InvalidDuration { .. })
    ));
    assert!(matches!(
        registrar.renew_price(11),
        Err(Error::InvalidDuration { .. })
    ));

    // a custom genesis fee flows through quotes and charges alike
    let mut genesis = test_genesis();
    genesis.fee_per_year = 5;
    let ext = new_test_ext_with(genesis);
    assert_eq!(ext.registrar.register_price(2).unwrap(), 10);
    assert!(matches!(
        ext.registrar.register(RICH_ACCOUNT, "cheap", 2, 9),
        Err(Error::InsufficientPayment {
            required: 10,
            paid: 9
        })
    ));
    ext.registrar
        .register(RICH_ACCOUNT, "cheap", 2, 10)
        .unwrap();
    assert_eq!(ext.registrar.treasury().unwrap(), 10);
}

#[test]
fn race_test() {
    use std::sync::Arc;

    let ext = new_test_ext();
    let registrar = Arc::new(ext.registrar);

    let handles: Vec<_> = [MONEY_ACCOUNT, RICH_ACCOUNT]
        .into_iter()
        .map(|caller| {
            let registrar = Arc::clone(&registrar);
            std::thread::spawn(move || {
                registrar.register(caller, "bob.dcn", 1, UNIT_FEE_PER_YEAR)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // write ordering picks exactly one winner; the loser fails clean
    assert_eq!(results.iter().filter(|res| res.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|res| matches!(res, Err(Error::NotAvailable)))
            .count(),
        1
    );

    let owner = registrar.owner_of("bob.dcn").unwrap();
    assert!(owner == MONEY_ACCOUNT || owner == RICH_ACCOUNT);
    assert_eq!(registrar.registered_total().unwrap(), 1);
    assert_eq!(registrar.treasury().unwrap(), UNIT_FEE_PER_YEAR);
}

#[test]
fn persistence_test() {
    let ext = new_test_ext();
    ext.registrar
        .register(RICH_ACCOUNT, "durable", 2, 2 * UNIT_FEE_PER_YEAR)
        .unwrap();
    let expire = ext.registrar.expiry_of("durable").unwrap();
    drop(ext.registrar);

    // a second deploy against the same file must refuse
    assert!(matches!(
        Registry::create(&ext.db_path, &test_genesis()),
        Err(StoreError::AlreadyInitialized)
    ));

    // reopening sees the committed state
    let reopened = Registrar::with_clock(
        Registry::open(&ext.db_path).unwrap(),
        ext.clock.clone(),
    );
    assert_eq!(reopened.owner_of("durable").unwrap(), RICH_ACCOUNT);
    assert_eq!(reopened.expiry_of("durable").unwrap(), expire);
    assert_eq!(reopened.treasury().unwrap(), 2 * UNIT_FEE_PER_YEAR);
    assert_eq!(reopened.registered_total().unwrap(), 1);
    assert_eq!(reopened.grace_period().unwrap(), 90 * DAYS);

    assert!(Registry::open(ext.db_path.with_extension("missing")).is_err());
}
