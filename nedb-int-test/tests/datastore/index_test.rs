use chrono::{Duration as ChronoDuration, Utc};
use nedb::doc;
use nedb::errors::ErrorKind;
use nedb::index::{non_unique_index, unique_index, IndexOptions};
use nedb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test, strings};
use std::thread;
use std::time::Duration;

#[test]
fn test_indexes_survive_reload() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("name"))?;
            db.ensure_index(non_unique_index("moons"))?;
            db.ensure_index(IndexOptions::new("nickname").unique(true).sparse(true))?;
            db.remove_index("moons")?;
            insert_test_documents(&db)?;

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.index_names()?, vec!["_id", "name", "nickname"]);

            let err = reopened.insert(doc! { name: "Mars" }).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::UniqueConstraintViolated { field, .. } if field == "name"));

            // a sparse unique index ignores documents without the field
            reopened.insert(doc! { name: "Ceres" })?;
            reopened.insert(doc! { name: "Eris", nickname: "Xena" })?;
            assert!(reopened.insert(doc! { name: "Haumea", nickname: "Xena" }).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_markers_are_compacted() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("name"))?;
            db.ensure_index(non_unique_index("moons"))?;
            db.remove_index("moons")?;
            assert!(ctx.read_datafile().contains("$$indexRemoved"));

            db.compact_datafile()?;
            let content = ctx.read_datafile();
            assert_eq!(content.lines().count(), 1);
            assert!(content.contains("\"fieldName\":\"name\""));
            assert!(!content.contains("$$indexRemoved"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_index_on_duplicates_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;
            db.insert(doc! { name: "Mars" })?;

            assert!(db.ensure_index(unique_index("name")).is_err());
            assert_eq!(db.index_names()?, vec!["_id"]);
            assert!(!ctx.read_datafile().contains("$$indexCreated"));

            let err = db.ensure_index(IndexOptions::new("")).unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::MissingFieldName);

            let err = db.remove_index("_id").unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidOperation);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_ttl_index_expires_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(IndexOptions::new("session.lastSeen").expire_after_seconds(1.0))?;
            db.insert_many(vec![
                doc! { user: "stale", session: { lastSeen: (Utc::now() - ChronoDuration::seconds(60)) } },
                doc! { user: "fresh", session: { lastSeen: (Utc::now()) } },
                doc! { user: "forever" },
            ])?;

            let users = db.find(doc! {}).exec()?;
            let mut names = strings(&users, "user");
            names.sort();
            assert_eq!(names, vec!["forever", "fresh"]);

            thread::sleep(Duration::from_millis(1100));
            assert_eq!(strings(&db.find(doc! {}).exec()?, "user"), vec!["forever"]);

            // the expired documents are removed from the datafile as well
            let reopened = ctx.reopen()?;
            assert_eq!(reopened.get_all_data()?.len(), 1);
            Ok(())
        },
        cleanup,
    )
}
