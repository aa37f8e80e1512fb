use nedb::doc;
use nedb::errors::ErrorKind;
use nedb_int_test::test_util::{cleanup, create_test_context, datastore_builder, run_test};
use std::path::Path;

fn reverse(line: &str) -> String {
    line.chars().rev().collect()
}

fn open_with_hooks(path: &Path) -> nedb::errors::NedbResult<nedb::datastore::Datastore> {
    datastore_builder(path)
        .after_serialization(|line: &str| format!("#{}", reverse(line)))
        .before_deserialization(|line: &str| reverse(line.strip_prefix('#').unwrap_or(line)))
        .autoload(true)
        .open()
}

#[test]
fn test_hooks_transform_every_line() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.dir().join("hooked.db");
            let db = open_with_hooks(&path)?;
            db.insert(doc! { _id: "1", secret: "launch codes" })?;

            let raw = std::fs::read_to_string(&path)?;
            assert!(!raw.contains("launch codes"));
            assert!(raw.starts_with("#}"));

            let reopened = open_with_hooks(&path)?;
            assert_eq!(reopened.count(doc! { secret: "launch codes" }).exec()?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_loading_without_hooks_is_detected() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.dir().join("hooked.db");
            let db = open_with_hooks(&path)?;
            db.insert_many(vec![doc! { a: 1 }, doc! { a: 2 }])?;

            let err = datastore_builder(&path).autoload(true).open().unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::TooMuchCorruption { .. }));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_hooks_must_be_inverse() {
    run_test(
        create_test_context,
        |ctx| {
            let err = datastore_builder(&ctx.datafile())
                .after_serialization(|line: &str| line.to_uppercase())
                .before_deserialization(|line: &str| line.to_string())
                .open()
                .unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::SerializationHooksNotInverse);

            let err = datastore_builder(&ctx.datafile())
                .before_deserialization(|line: &str| line.to_string())
                .open()
                .unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::SerializationHooksAsymmetric);
            Ok(())
        },
        cleanup,
    )
}
