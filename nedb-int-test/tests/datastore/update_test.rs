use nedb::common::{Value, CREATED_AT, UPDATED_AT};
use nedb::datastore::{multi, upsert, AffectedDocuments, UpdateOptions};
use nedb::doc;
use nedb::errors::ErrorKind;
use nedb::index::unique_index;
use nedb_int_test::test_util::{
    cleanup, create_test_context, datastore_builder, insert_test_documents, run_test, strings,
};
use std::thread;
use std::time::Duration;

#[test]
fn test_update_modifiers_are_persisted() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            let result = db.update(
                doc! { _id: "mars" },
                doc! {
                    "$inc": { moons: 1 },
                    "$push": { tags: "red" },
                    "$set": { "physics.gravity": 3.72 },
                    "$unset": { discovered: true },
                },
                UpdateOptions::default(),
            )?;
            assert_eq!(result.num_affected, 1);

            let reopened = ctx.reopen()?;
            let mars = reopened.find_one(doc! { _id: "mars" }).exec()?.unwrap_or_default();
            assert_eq!(mars.get("moons"), Some(&Value::from(3)));
            assert_eq!(mars.get_dot_value("tags.2"), Some(Value::from("red")));
            assert_eq!(mars.get_dot_value("physics.gravity"), Some(Value::from(3.72)));
            assert!(!mars.contains_key("discovered"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_multi_update_returns_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            let result = db.update(
                doc! { tags: "inner" },
                doc! { "$addToSet": { tags: "visited" } },
                multi().return_updated_docs(true),
            )?;
            assert_eq!(result.num_affected, 3);
            match result.affected_documents {
                Some(AffectedDocuments::Many(docs)) => {
                    assert_eq!(docs.len(), 3);
                    assert!(docs
                        .iter()
                        .all(|d| d.get("tags").and_then(Value::as_array).is_some_and(|t| t.contains(&Value::from("visited")))));
                }
                other => panic!("expected every updated document, got {:?}", other.map(AffectedDocuments::into_vec)),
            }

            assert_eq!(db.count(doc! { tags: "visited" }).exec()?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_replacement_update() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            db.update(doc! { _id: "jupiter" }, doc! { name: "Jove", moons: 95 }, UpdateOptions::default())?;
            let jupiter = db.find_one(doc! { _id: "jupiter" }).exec()?.unwrap_or_default();
            assert_eq!(jupiter, doc! { _id: "jupiter", name: "Jove", moons: 95 });

            let err = db
                .update(doc! { _id: "jupiter" }, doc! { _id: "zeus" }, UpdateOptions::default())
                .unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidUpdate);

            let err = db
                .update(doc! { _id: "jupiter" }, doc! { "$set": { a: 1 }, b: 2 }, UpdateOptions::default())
                .unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidUpdate);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_upsert() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();

            let result = db.update(
                doc! { name: "Pluto" },
                doc! { "$set": { dwarf: true } },
                upsert().return_updated_docs(true),
            )?;
            assert!(result.upsert);
            let Some(AffectedDocuments::One(pluto)) = result.affected_documents else {
                panic!("expected the upserted document");
            };
            assert_eq!(pluto.get("name"), Some(&Value::from("Pluto")));
            assert!(pluto.id().is_some());

            let result = db.update(doc! { name: "Pluto" }, doc! { "$set": { moons: 5 } }, upsert())?;
            assert!(!result.upsert);
            assert_eq!(result.num_affected, 1);

            let reopened = ctx.reopen()?;
            let docs = reopened.find(doc! {}).exec()?;
            assert_eq!(strings(&docs, "name"), vec!["Pluto"]);
            assert_eq!(docs[0].get("moons"), Some(&Value::from(5)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_violation_rolls_back_multi_update() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("slot"))?;
            db.insert_many(vec![doc! { _id: "a", slot: 1 }, doc! { _id: "b", slot: 2 }])?;
            let before = ctx.read_datafile();

            let err = db.update(doc! {}, doc! { "$set": { slot: 7 } }, multi()).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::UniqueConstraintViolated { .. }));
            assert_eq!(ctx.read_datafile(), before);

            assert_eq!(db.count(doc! { slot: 1 }).exec()?, 1);
            assert_eq!(db.count(doc! { slot: 2 }).exec()?, 1);
            assert_eq!(db.count(doc! { slot: 7 }).exec()?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_timestamps_are_maintained() {
    run_test(
        create_test_context,
        |ctx| {
            let db = datastore_builder(&ctx.dir().join("stamped.db"))
                .timestamp_data(true)
                .autoload(true)
                .open()?;

            let inserted = db.insert(doc! { _id: "x", n: 1 })?;
            let created_at = inserted.get(CREATED_AT).and_then(Value::as_date).copied();
            assert!(created_at.is_some());

            thread::sleep(Duration::from_millis(10));
            db.update(doc! { _id: "x" }, doc! { n: 2 }, UpdateOptions::default())?;

            let updated = db.find_one(doc! { _id: "x" }).exec()?.unwrap_or_default();
            assert_eq!(updated.get(CREATED_AT).and_then(Value::as_date).copied(), created_at);
            let updated_at = updated.get(UPDATED_AT).and_then(Value::as_date).copied();
            assert!(updated_at > created_at);
            Ok(())
        },
        cleanup,
    )
}
