use nedb::datastore::{remove_all, RemoveOptions, UpdateOptions};
use nedb::doc;
use nedb::errors::ErrorKind;
use nedb_int_test::test_util::{cleanup, create_test_context, datastore_builder, run_test};
use std::fs;

#[test]
fn test_every_change_appends_a_line() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            assert_eq!(ctx.read_datafile(), "");

            db.insert(doc! { _id: "a", v: 1 })?;
            db.insert_many(vec![doc! { _id: "b", v: 1 }, doc! { _id: "c", v: 1 }])?;
            db.update(doc! { _id: "a" }, doc! { "$set": { v: 2 } }, UpdateOptions::default())?;
            db.remove(doc! { _id: "b" }, RemoveOptions::default())?;

            let content = ctx.read_datafile();
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines.len(), 5);
            assert_eq!(lines[0], r#"{"_id":"a","v":1}"#);
            assert_eq!(lines[3], r#"{"_id":"a","v":2}"#);
            assert_eq!(lines[4], r#"{"$$deleted":true,"_id":"b"}"#);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_load_compacts_the_datafile() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            for v in 0..10 {
                db.update(doc! { _id: "a" }, doc! { _id: "a", v: v }, UpdateOptions::new(false, true))?;
            }
            assert_eq!(ctx.read_datafile().lines().count(), 10);

            let reopened = ctx.reopen()?;
            assert_eq!(ctx.read_datafile(), "{\"_id\":\"a\",\"v\":9}\n");
            assert_eq!(reopened.get_all_data()?, vec![doc! { _id: "a", v: 9 }]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_compaction_is_idempotent() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert_many(vec![doc! { _id: "1", n: 1 }, doc! { _id: "2", n: 2 }])?;
            db.remove(doc! { _id: "1" }, RemoveOptions::default())?;

            db.compact_datafile()?;
            let first = ctx.read_datafile();
            db.compact_datafile()?;
            assert_eq!(ctx.read_datafile(), first);
            assert_eq!(first.lines().count(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_dates_use_date_tag() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let when = chrono::DateTime::from_timestamp_millis(1_700_000_000_123).unwrap_or_default();
            db.insert(doc! { _id: "d", when: when })?;
            assert_eq!(
                ctx.read_datafile().trim_end(),
                r#"{"_id":"d","when":{"$$date":1700000000123}}"#
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_too_much_corruption_refuses_to_load() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.dir().join("corrupt.db");
            fs::write(
                &path,
                "{\"_id\":\"1\",\"a\":1}\nnot json at all\n{\"_id\":\"2\",\"a\":2}\n{\"_id\":\"3\",\"a\":3}\n",
            )?;

            let err = datastore_builder(&path).autoload(true).open().unwrap_err();
            assert_eq!(
                *err.kind(),
                ErrorKind::TooMuchCorruption {
                    corrupt_items: 1,
                    total_items: 4
                }
            );
            assert_eq!(err.kind().corruption_rate(), Some(0.25));

            // nothing was rewritten
            assert!(fs::read_to_string(&path)?.contains("not json at all"));

            let db = datastore_builder(&path).corrupt_alert_threshold(0.5).autoload(true).open()?;
            assert_eq!(db.count(doc! {}).exec()?, 3);
            assert!(!fs::read_to_string(&path)?.contains("not json at all"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_directories_are_created() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.dir().join("nested").join("deeper").join("planets.db");
            let db = datastore_builder(&path).autoload(true).open()?;
            db.insert(doc! { name: "Mars" })?;
            assert!(path.exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reopened_datastore_owns_the_datafile() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert_many((0..20).map(|n| doc! { n: n }).collect())?;
            db.compact_datafile()?;

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.remove(doc! {}, remove_all())?, 20);
            assert_eq!(ctx.read_datafile().lines().count(), 40);

            assert_eq!(ctx.reopen()?.count(doc! {}).exec()?, 0);
            assert_eq!(ctx.read_datafile(), "");
            Ok(())
        },
        cleanup,
    )
}
