use nedb::datastore::{remove_all, RemoveOptions};
use nedb::doc;
use nedb::index::non_unique_index;
use nedb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test, strings};

#[test]
fn test_remove_one_and_many() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            assert_eq!(db.remove(doc! { tags: "inner" }, RemoveOptions::default())?, 1);
            assert_eq!(db.count(doc! { tags: "inner" }).exec()?, 2);

            assert_eq!(db.remove(doc! { tags: "inner" }, remove_all())?, 2);
            assert_eq!(db.remove(doc! { tags: "inner" }, remove_all())?, 0);

            let reopened = ctx.reopen()?;
            let docs = reopened.find(doc! {}).exec()?;
            assert_eq!(strings(&docs, "name"), vec!["Jupiter"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_removed_documents_leave_indexes() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(non_unique_index("moons"))?;
            insert_test_documents(&db)?;

            db.remove(doc! { moons: { "$lt": 2 } }, remove_all())?;
            assert_eq!(db.count(doc! { moons: 0 }).exec()?, 0);
            assert_eq!(db.count(doc! { moons: { "$gte": 0 } }).exec()?, 2);
            assert_eq!(db.get_all_data()?.len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_removed_id_can_be_reused() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert(doc! { _id: "x", v: 1 })?;
            db.remove(doc! { _id: "x" }, RemoveOptions::default())?;
            db.insert(doc! { _id: "x", v: 2 })?;

            let reopened = ctx.reopen()?;
            let docs = reopened.find(doc! {}).exec()?;
            assert_eq!(docs, vec![doc! { _id: "x", v: 2 }]);
            Ok(())
        },
        cleanup,
    )
}
