use nedb::common::Value;
use nedb::doc;
use nedb::errors::ErrorKind;
use nedb::index::unique_index;
use nedb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[test]
fn test_insert_and_reload() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let inserted = insert_test_documents(&db)?;
            assert_eq!(inserted.len(), 4);
            assert_eq!(db.count(doc! {}).exec()?, 4);

            let reopened = ctx.reopen()?;
            let mars = reopened.find_one(doc! { _id: "mars" }).exec()?;
            assert_eq!(mars, inserted.into_iter().find(|d| d.id() == Some(&Value::from("mars"))));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_generates_distinct_ids() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let docs = db.insert_many((0..200).map(|n| doc! { n: n }).collect())?;
            let mut ids: Vec<String> = docs
                .iter()
                .filter_map(|d| d.id().and_then(Value::as_str).map(str::to_string))
                .collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 200);
            assert!(ids.iter().all(|id| id.len() == 16));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unique_violation_keeps_first_document() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("email"))?;
            db.insert(doc! { email: "ada@example.com", name: "Ada" })?;

            let err = db.insert(doc! { email: "ada@example.com", name: "Impostor" }).unwrap_err();
            assert!(matches!(
                err.kind(),
                ErrorKind::UniqueConstraintViolated { field, .. } if field == "email"
            ));

            let reopened = ctx.reopen()?;
            let docs = reopened.find(doc! {}).exec()?;
            assert_eq!(docs.len(), 1);
            assert_eq!(docs[0].get("name"), Some(&Value::from("Ada")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_batch_writes_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(unique_index("a"))?;
            let before = ctx.read_datafile();

            let result = db.insert_many(vec![doc! { a: 1 }, doc! { a: 2 }, doc! { a: 1 }]);
            assert!(result.is_err());
            assert_eq!(db.count(doc! {}).exec()?, 0);
            assert_eq!(ctx.read_datafile(), before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_field_names_are_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            for bad in [doc! { "$set": 1 }, doc! { "a.b": 1 }, doc! { nested: { "$x": 1 } }] {
                assert_eq!(*db.insert(bad).unwrap_err().kind(), ErrorKind::InvalidDocument);
            }
            assert_eq!(db.count(doc! {}).exec()?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_returned_documents_are_copies() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let mut inserted = db.insert(doc! { _id: "x", tags: ["a"] })?;
            inserted.put("tags", "changed");

            let mut found = db.find_one(doc! { _id: "x" }).exec()?.unwrap_or_default();
            assert_eq!(found.get("tags"), Some(&Value::from(vec!["a"])));
            found.put("tags", "changed again");

            let again = db.find_one(doc! { _id: "x" }).exec()?.unwrap_or_default();
            assert_eq!(again.get("tags"), Some(&Value::from(vec!["a"])));
            Ok(())
        },
        cleanup,
    )
}
