//! Property-based tests for stagehand-proxy using proptest.

use proptest::prelude::*;
use stagehand_core::schema::TableBuilder;
use stagehand_core::{DataType, Record, UnitOfWork, Value};
use stagehand_proxy::{Mode, ProxyFactory};
use stagehand_storage::Session;
use std::cell::RefCell;
use std::rc::Rc;

fn setup() -> (Session, ProxyFactory) {
    let session = Session::new();
    session
        .create_table(
            TableBuilder::new("skater")
                .unwrap()
                .add_column("first_name", DataType::String)
                .unwrap()
                .add_column("age", DataType::Int32)
                .unwrap()
                .add_nullable(&["age"])
                .build()
                .unwrap(),
        )
        .unwrap();
    let factory = ProxyFactory::new(Rc::new(session.clone()));
    (session, factory)
}

fn persisted(session: &Session, name: &str) -> Record {
    let record = session.create("skater").unwrap();
    record.set("first_name", name).unwrap();
    session.add(&record).unwrap();
    session.commit().unwrap();
    record
}

proptest! {
    /// Every write through a transparent proxy is visible on the proxy and the record.
    #[test]
    fn transparent_round_trip(
        names in prop::collection::vec("[a-z]{1,8}", 1..20),
        ages in prop::collection::vec(0i32..120, 1..20)
    ) {
        let (session, factory) = setup();
        let record = persisted(&session, "start");
        let proxy = factory.wrap(Some(&record), Mode::Transparent).unwrap();

        for name in &names {
            proxy.write("first_name", name.as_str()).unwrap();
            prop_assert_eq!(proxy.value("first_name").unwrap(), Value::from(name.as_str()));
            prop_assert_eq!(record.get("first_name").unwrap(), Value::from(name.as_str()));
        }
        for &age in &ages {
            proxy.write("age", age).unwrap();
            prop_assert_eq!(proxy.value("age").unwrap(), Value::Int32(age));
            prop_assert_eq!(record.get("age").unwrap(), Value::Int32(age));
        }
        prop_assert!(!proxy.has_changes());
    }

    /// Staged writes stay on the proxy until flushed.
    #[test]
    fn staged_isolation(name in "[a-z]{1,8}", age in 0i32..120) {
        let (session, factory) = setup();
        let record = persisted(&session, "Start");
        let proxy = factory.wrap(Some(&record), Mode::Staged).unwrap();

        proxy.write("first_name", name.as_str()).unwrap();
        proxy.write("age", age).unwrap();

        prop_assert_eq!(record.get("first_name").unwrap(), Value::from("Start"));
        prop_assert_eq!(record.get("age").unwrap(), Value::Null);
        prop_assert_eq!(proxy.value("first_name").unwrap(), Value::from(name.as_str()));
        prop_assert_eq!(proxy.value("age").unwrap(), Value::Int32(age));

        proxy.flush().unwrap();
        prop_assert_eq!(record.get("first_name").unwrap(), Value::from(name.as_str()));
        prop_assert_eq!(record.get("age").unwrap(), Value::Int32(age));
    }

    /// Committing the staged value settles it without announcing any other value.
    #[test]
    fn reconciliation_idempotence(name in "[a-z]{1,8}", watchers in 0usize..4) {
        let (session, factory) = setup();
        let record = persisted(&session, "Start");
        let proxy = factory.wrap(Some(&record), Mode::Staged).unwrap();
        let others: Vec<_> = (0..watchers)
            .map(|_| factory.wrap(Some(&record), Mode::Transparent).unwrap())
            .collect();

        let announced = Rc::new(RefCell::new(Vec::new()));
        let sink = announced.clone();
        proxy.subscribe(move |change| sink.borrow_mut().push(change.new.clone()));

        proxy.write("first_name", name.as_str()).unwrap();
        proxy.flush().unwrap();
        session.add(&record).unwrap();
        session.commit().unwrap();

        prop_assert!(!proxy.has_changes());
        prop_assert!(announced.borrow().iter().all(|v| *v == Value::from(name.as_str())));
        prop_assert!(announced.borrow().len() <= 1);
        for other in &others {
            prop_assert_eq!(other.value("first_name").unwrap(), Value::from(name.as_str()));
        }
    }
}
