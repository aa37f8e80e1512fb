use icu::locale::locale;
use icu_collator::options::CollatorOptions;
use nedb::common::{SortOrder, Value};
use nedb::cursor::StringComparator;
use nedb::doc;
use nedb::errors::ErrorKind;
use nedb::index::non_unique_index;
use nedb::query::Query;
use nedb_int_test::test_util::{
    cleanup, create_test_context, datastore_builder, date, insert_test_documents, is_sorted, run_test, strings,
};

#[test]
fn test_find_with_operators() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            let found = db
                .find(doc! { moons: { "$gte": 1, "$lt": 10 } })
                .sort("moons", SortOrder::Ascending)
                .exec()?;
            assert_eq!(strings(&found, "name"), vec!["Earth", "Mars"]);

            let found = db
                .find(doc! { "$or": [{ name: "Earth" }, { moons: { "$gt": 50 } }] })
                .sort("name", SortOrder::Ascending)
                .exec()?;
            assert_eq!(strings(&found, "name"), vec!["Earth", "Jupiter"]);

            assert_eq!(db.count(doc! { tags: "giant" }).exec()?, 1);
            assert_eq!(db.count(doc! { tags: { "$size": 3 } }).exec()?, 1);
            assert_eq!(db.count(doc! { "physics.radius": { "$gt": 5000 } }).exec()?, 2);
            assert_eq!(db.count(doc! { "satellites.name": "Deimos" }).exec()?, 1);
            assert_eq!(db.count(doc! { discovered: { "$exists": false } }).exec()?, 1);
            assert_eq!(db.count(doc! { name: { "$regex": "^M" } }).exec()?, 2);
            assert_eq!(db.count(doc! { name: { "$nin": ["Earth", "Mars"] } }).exec()?, 2);
            assert_eq!(db.count(doc! { "$not": { tags: "inner" } }).exec()?, 1);
            assert_eq!(
                db.count(doc! { satellites: { "$elemMatch": { radius: { "$lt": 10 } } } })
                    .exec()?,
                1
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_dates() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            let found = db
                .find(doc! { discovered: { "$lt": (date("1620-01-01T00:00:00Z")) } })
                .sort("discovered", SortOrder::Descending)
                .exec()?;
            assert_eq!(strings(&found, "name"), vec!["Jupiter", "Mars"]);

            // dates survive a reload as dates
            let reopened = ctx.reopen()?;
            let mercury = reopened.find_one(doc! { _id: "mercury" }).exec()?.unwrap_or_default();
            assert_eq!(
                mercury.get("discovered"),
                Some(&Value::from(date("1631-11-07T00:00:00Z")))
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_queries_fail() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            let err = db.find(doc! { moons: { "$unknown": 1 } }).exec().unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidQuery);

            let err = db.find(doc! { moons: { "$gt": 1, plain: 2 } }).exec().unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidQuery);

            let err = db.count(doc! { "$or": 5 }).exec().unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidQuery);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_skip_limit() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            let found = db.find(doc! {}).sort("distance", SortOrder::Descending).exec()?;
            let distances: Vec<i64> = found
                .iter()
                .filter_map(|d| d.get("distance").and_then(Value::as_f64))
                .map(|d| (d * 100.0) as i64)
                .collect();
            assert!(is_sorted(distances, false));

            let page = db
                .find(doc! {})
                .sort("name", SortOrder::Ascending)
                .skip(1)
                .limit(2)
                .exec()?;
            assert_eq!(strings(&page, "name"), vec!["Jupiter", "Mars"]);

            let past_end = db.find(doc! {}).skip(10).exec()?;
            assert!(past_end.is_empty());

            // documents missing the sort field come first
            let found = db.find(doc! {}).sort("discovered", SortOrder::Ascending).exec()?;
            assert_eq!(strings(&found, "name").first().map(String::as_str), Some("Earth"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_projection() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db)?;

            let found = db
                .find(doc! { _id: "mars" })
                .projection(doc! { name: 1, "physics.radius": 1, _id: 0 })
                .exec()?;
            assert_eq!(found, vec![doc! { name: "Mars", physics: { radius: 3389 } }]);

            let found = db
                .find(doc! { _id: "earth" })
                .projection(doc! { tags: 0, satellites: 0, physics: 0, discovered: 0 })
                .exec()?;
            assert_eq!(found, vec![doc! { _id: "earth", name: "Earth", distance: 1.0, moons: 1 }]);

            let err = db
                .find(doc! {})
                .projection(doc! { name: 1, moons: 0 })
                .exec()
                .unwrap_err();
            assert_eq!(*err.kind(), ErrorKind::InvalidProjection);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_where_predicate_with_index() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.ensure_index(non_unique_index("moons"))?;
            insert_test_documents(&db)?;

            let query = Query::new(doc! { moons: { "$lte": 2 } })
                .with_where(|doc| doc.get("name").and_then(Value::as_str).is_some_and(|n| n.len() == 4));
            let found = db.find(query).sort("name", SortOrder::Ascending).exec()?;
            assert_eq!(strings(&found, "name"), vec!["Mars"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_collation_sort() {
    run_test(
        create_test_context,
        |ctx| {
            let db = datastore_builder(&ctx.dir().join("fruits.db"))
                .compare_strings(StringComparator::collation(locale!("fr").into(), CollatorOptions::default()))
                .autoload(true)
                .open()?;
            db.insert_many(vec![
                doc! { fruit: "Pomme" },
                doc! { fruit: "Ôrange" },
                doc! { fruit: "Abricot" },
            ])?;

            let found = db.find(doc! {}).sort("fruit", SortOrder::Ascending).exec()?;
            assert_eq!(strings(&found, "fruit"), vec!["Abricot", "Ôrange", "Pomme"]);

            // without a collation strings sort by code point
            let plain = ctx.db();
            plain.insert_many(vec![doc! { fruit: "Pomme" }, doc! { fruit: "Ôrange" }])?;
            let found = plain.find(doc! {}).sort("fruit", SortOrder::Ascending).exec()?;
            assert_eq!(strings(&found, "fruit"), vec!["Pomme", "Ôrange"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_custom_string_comparator() {
    run_test(
        create_test_context,
        |ctx| {
            let db = datastore_builder(&ctx.dir().join("names.db"))
                .compare_strings(StringComparator::custom(|a: &str, b: &str| {
                    a.to_lowercase().cmp(&b.to_lowercase())
                }))
                .autoload(true)
                .open()?;
            db.insert_many(vec![doc! { name: "bob" }, doc! { name: "Alice" }, doc! { name: "carol" }])?;

            let found = db.find(doc! {}).sort("name", SortOrder::Ascending).exec()?;
            assert_eq!(strings(&found, "name"), vec!["Alice", "bob", "carol"]);
            Ok(())
        },
        cleanup,
    )
}
