use nedb::datastore::{DatastoreEventInfo, DatastoreEventListener, DatastoreEvents, UpdateOptions};
use nedb::doc;
use nedb_int_test::test_util::{cleanup, create_test_context, run_test};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_autocompaction_rewrites_datafile() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let compactions = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&compactions);
            db.subscribe(DatastoreEventListener::new(move |event: DatastoreEventInfo| {
                if event.event_type() == DatastoreEvents::CompactionDone {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            }))?;

            for v in 0..5 {
                db.update(doc! { _id: "a" }, doc! { _id: "a", v: v }, UpdateOptions::new(false, true))?;
            }
            assert_eq!(ctx.read_datafile().lines().count(), 5);

            // intervals below the 5 second minimum are raised to it
            db.set_autocompaction_interval(Duration::from_millis(100));
            assert!(db.is_autocompacting());
            thread::sleep(Duration::from_secs(1));
            assert_eq!(compactions.load(Ordering::SeqCst), 0);

            awaitility::at_most(Duration::from_secs(10)).until(|| compactions.load(Ordering::SeqCst) >= 1);
            assert_eq!(ctx.read_datafile().lines().count(), 1);

            db.stop_autocompaction();
            assert!(!db.is_autocompacting());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_compaction_event_carries_filename() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
            let slot = Arc::clone(&seen);
            let subscriber = db.subscribe(DatastoreEventListener::new(move |event: DatastoreEventInfo| {
                if let Some(filename) = event.filename() {
                    slot.lock().map_err(|_| "poisoned")?.push(filename.to_string());
                }
                Ok(())
            }))?;

            db.compact_datafile()?;
            db.unsubscribe(subscriber)?;
            db.compact_datafile()?;

            let filenames = seen.lock().map(|names| names.clone()).unwrap_or_default();
            assert_eq!(filenames, vec![ctx.datafile().display().to_string()]);
            Ok(())
        },
        cleanup,
    )
}
