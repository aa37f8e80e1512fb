use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use nedb::datastore::{multi, remove_all};
use nedb::doc;
use nedb::errors::NedbResult;
use nedb::index::non_unique_index;
use nedb_int_test::test_util::{cleanup, create_test_context};
use std::time::Instant;

fn main() -> NedbResult<()> {
    colog::init();
    println!("Starting stress test...");
    let ctx = create_test_context()?;
    let db = ctx.db();
    db.ensure_index(non_unique_index("failed"))?;

    let count = 100_000;
    let start = Instant::now();
    for _ in 0..count {
        let first_name: String = FirstName().fake();
        let last_name: String = LastName().fake();
        db.insert(doc! {
            first_name: first_name,
            last_name: last_name,
            failed: false,
            processed: false,
        })?;
    }
    println!("Inserted {} records in {:?}", count, start.elapsed());

    let start = Instant::now();
    let found = db.count(doc! { failed: false }).exec()?;
    println!("Counted {} records in {:?}", found, start.elapsed());

    let start = Instant::now();
    let result = db.update(doc! { failed: false }, doc! { "$set": { processed: true } }, multi())?;
    println!("Updated {} records in {:?}", result.num_affected, start.elapsed());

    let start = Instant::now();
    db.compact_datafile()?;
    println!("Compacted the datafile in {:?}", start.elapsed());

    let start = Instant::now();
    let reopened = ctx.reopen()?;
    println!(
        "Reloaded {} records in {:?}",
        reopened.count(doc! { processed: true }).exec()?,
        start.elapsed()
    );

    let start = Instant::now();
    let removed = reopened.remove(doc! {}, remove_all())?;
    println!("Removed {} records in {:?}", removed, start.elapsed());

    cleanup(ctx)
}
