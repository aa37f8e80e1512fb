use nedb::doc;
use nedb::persistence::temp_path;
use nedb_int_test::test_util::{cleanup, create_test_context, datastore_builder, run_test};
use std::fs;

#[test]
fn test_leftover_temp_file_is_promoted() {
    run_test(
        create_test_context,
        |ctx| {
            // a rewrite that finished writing the temp file but crashed before the rename
            let path = ctx.dir().join("interrupted.db");
            fs::write(temp_path(&path), "{\"_id\":\"1\",\"name\":\"Mars\"}\n")?;
            assert!(!path.exists());

            let db = datastore_builder(&path).autoload(true).open()?;
            assert_eq!(db.count(doc! { name: "Mars" }).exec()?, 1);
            assert!(path.exists());
            assert!(!temp_path(&path).exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_existing_datafile_wins_over_temp_file() {
    run_test(
        create_test_context,
        |ctx| {
            // a rewrite that crashed while writing the temp file
            let path = ctx.dir().join("half-written.db");
            fs::write(&path, "{\"_id\":\"1\",\"name\":\"Mars\"}\n{\"_id\":\"2\",\"name\":\"Venus\"}\n")?;
            fs::write(temp_path(&path), "{\"_id\":\"1\",\"na")?;

            let db = datastore_builder(&path).autoload(true).open()?;
            assert_eq!(db.count(doc! {}).exec()?, 2);
            assert!(!temp_path(&path).exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_compaction_leaves_no_temp_file() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert_many((0..50).map(|n| doc! { n: n }).collect())?;
            db.compact_datafile()?;

            assert!(!temp_path(&ctx.datafile()).exists());
            assert_eq!(ctx.read_datafile().lines().count(), 50);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_bad_filename_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let result = datastore_builder(&temp_path(&ctx.datafile())).open();
            assert!(result.is_err());
            Ok(())
        },
        cleanup,
    )
}
