use chrono::{DateTime, Utc};
use nedb::datastore::{Datastore, DatastoreBuilder};
use nedb::doc;
use nedb::document::Document;
use nedb::errors::NedbResult;
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use std::{env, fs, thread};

/// Runs a test with retry logic and error handling.
/// Tests run on the current thread so failures keep their backtrace.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> NedbResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> NedbResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> NedbResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        let error = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", message)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", error);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(error);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// A persistent datastore in its own temporary directory.
#[derive(Clone)]
pub struct TestContext {
    dir: PathBuf,
    db: Datastore,
}

impl TestContext {
    pub fn new(dir: PathBuf, db: Datastore) -> Self {
        Self { dir, db }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn datafile(&self) -> PathBuf {
        self.dir.join("test.db")
    }

    pub fn db(&self) -> Datastore {
        self.db.clone()
    }

    /// Opens a second datastore on the same datafile, as a restarted process would.
    pub fn reopen(&self) -> NedbResult<Datastore> {
        datastore_builder(&self.datafile()).autoload(true).open()
    }

    pub fn read_datafile(&self) -> String {
        fs::read_to_string(self.datafile()).unwrap_or_default()
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("nedb-{}", id))
}

pub fn datastore_builder(datafile: &Path) -> DatastoreBuilder {
    Datastore::builder().filename(datafile)
}

pub fn create_test_context() -> NedbResult<TestContext> {
    let dir = random_path();
    let db = datastore_builder(&dir.join("test.db")).autoload(true).open()?;
    Ok(TestContext::new(dir, db))
}

/// Context whose datastore is opened but not loaded, so operations buffer.
pub fn create_unloaded_test_context() -> NedbResult<TestContext> {
    let dir = random_path();
    let db = datastore_builder(&dir.join("test.db")).open()?;
    Ok(TestContext::new(dir, db))
}

pub fn cleanup(ctx: TestContext) -> NedbResult<()> {
    ctx.db().stop_autocompaction();

    let max_retries = 5;
    for retry in 0..max_retries {
        if !ctx.dir().exists() {
            return Ok(());
        }
        match fs::remove_dir_all(ctx.dir()) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) if retry == max_retries - 1 => {
                // temp files are eventually removed by the OS
                eprintln!(
                    "Warning: Failed to remove test directory {} after {} attempts: {:?}",
                    ctx.dir().display(),
                    max_retries,
                    e
                );
            }
            Err(_) => thread::sleep(Duration::from_millis(50 * (retry as u64 + 1))),
        }
    }
    Ok(())
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! {
            _id: "mercury",
            name: "Mercury",
            distance: 0.39,
            moons: 0,
            discovered: (date("1631-11-07T00:00:00Z")),
            tags: ["rocky", "inner"],
            physics: { mass: 0.055, radius: 2439 },
        },
        doc! {
            _id: "earth",
            name: "Earth",
            distance: 1.0,
            moons: 1,
            tags: ["rocky", "inner", "inhabited"],
            physics: { mass: 1.0, radius: 6371 },
            satellites: [{ name: "Moon", radius: 1737 }],
        },
        doc! {
            _id: "mars",
            name: "Mars",
            distance: 1.52,
            moons: 2,
            discovered: (date("1610-01-01T00:00:00Z")),
            tags: ["rocky", "inner"],
            physics: { mass: 0.107, radius: 3389 },
            satellites: [{ name: "Phobos", radius: 11 }, { name: "Deimos", radius: 6 }],
        },
        doc! {
            _id: "jupiter",
            name: "Jupiter",
            distance: 5.2,
            moons: 95,
            discovered: (date("1610-01-07T00:00:00Z")),
            tags: ["giant", "outer"],
            physics: { mass: 317.8, radius: 69911 },
        },
    ]
}

pub fn insert_test_documents(db: &Datastore) -> NedbResult<Vec<Document>> {
    db.insert_many(create_test_docs())
}

pub fn date(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// String values of `field`, in document order.
pub fn strings(docs: &[Document], field: &str) -> Vec<String> {
    docs.iter()
        .filter_map(|doc| doc.get_dot_value(field))
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect()
}

pub fn is_sorted<T: Ord>(iterable: impl IntoIterator<Item = T>, ascending: bool) -> bool {
    let mut iter = iterable.into_iter();
    if let Some(mut prev) = iter.next() {
        for current in iter {
            if (ascending && prev > current) || (!ascending && prev < current) {
                return false;
            }
            prev = current;
        }
    }
    true
}
