use nedb::common::Value;
use nedb::datastore::UpdateOptions;
use nedb::doc;
use nedb_int_test::test_util::{cleanup, create_test_context, create_unloaded_test_context, run_test};
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_increments_are_serialized() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert(doc! { _id: "counter", value: 0 })?;

            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let db = db.clone();
                    thread::spawn(move || {
                        for _ in 0..25 {
                            db.update(
                                doc! { _id: "counter" },
                                doc! { "$inc": { value: 1 } },
                                UpdateOptions::default(),
                            )?;
                        }
                        Ok::<(), nedb::errors::NedbError>(())
                    })
                })
                .collect();
            for worker in workers {
                worker.join().expect("worker panicked")?;
            }

            let counter = db.find_one(doc! { _id: "counter" }).exec()?.unwrap_or_default();
            assert_eq!(counter.get("value"), Some(&Value::from(200)));

            let reopened = ctx.reopen()?;
            let counter = reopened.find_one(doc! { _id: "counter" }).exec()?.unwrap_or_default();
            assert_eq!(counter.get("value"), Some(&Value::from(200)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_operations_wait_until_loaded() {
    run_test(
        create_unloaded_test_context,
        |ctx| {
            let db = ctx.db();

            let writer = db.clone();
            let insert = thread::spawn(move || writer.insert(doc! { _id: "first" }));
            let reader = db.clone();
            let count = thread::spawn(move || reader.count(doc! {}).exec());

            thread::sleep(Duration::from_millis(100));
            assert!(!insert.is_finished());
            assert!(!count.is_finished());

            db.load_database()?;
            insert.join().expect("insert panicked")?;
            let seen = count.join().expect("count panicked")?;
            assert!(seen <= 1);
            assert_eq!(db.count(doc! {}).exec()?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_database_removes_everything() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert_many(vec![doc! { a: 1 }, doc! { a: 2 }])?;
            assert!(ctx.datafile().exists());

            db.drop_database()?;
            assert!(!ctx.datafile().exists());

            db.load_database()?;
            assert_eq!(db.count(doc! {}).exec()?, 0);
            db.insert(doc! { a: 3 })?;
            assert_eq!(ctx.reopen()?.count(doc! {}).exec()?, 1);
            Ok(())
        },
        cleanup,
    )
}
