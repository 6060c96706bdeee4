//! Concurrent access to the durable stores
//!
//! Several contexts of the app (CLI invocations, app windows) may open the
//! same data directory at once. Writers serialise; readers see whole values.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use renizo_core::adapters::{DuckDbStorage, JsonFileStorage};
use renizo_core::ports::KeyValueStorage;
use renizo_core::services::{LocalityStore, StorageAvailability};
use renizo_core::TownId;

/// Keep this realistic: at most a few processes compete for the files
const THREAD_COUNT: usize = 4;

const ITERATIONS_PER_THREAD: usize = 10;

#[test]
fn test_concurrent_duckdb_opens() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("renizo.duckdb");

    // Create the database and its schema up front
    {
        DuckDbStorage::open(&db_path).unwrap();
    }

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let db_path = Arc::new(db_path);

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let db_path = Arc::clone(&db_path);
            thread::spawn(move || {
                barrier.wait();
                let start = Instant::now();
                match DuckDbStorage::open(&db_path) {
                    Ok(_storage) => {
                        println!("Thread {}: opened after {:?}", i, start.elapsed());
                        // Hold the connection briefly to create contention
                        thread::sleep(Duration::from_millis(50));
                        Ok(())
                    }
                    Err(e) => {
                        println!("Thread {}: FAILED after {:?}: {}", i, start.elapsed(), e);
                        Err(e.to_string())
                    }
                }
            })
        })
        .collect();

    let failures: Vec<String> = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap().err())
        .collect();

    assert!(failures.is_empty(), "opens failed: {:?}", failures);
}

#[test]
fn test_sequential_duckdb_opens_keep_values() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("renizo.duckdb");

    for i in 0..5 {
        let storage = DuckDbStorage::open(&db_path).unwrap();
        if i > 0 {
            assert_eq!(storage.get("counter").unwrap(), Some((i - 1).to_string()));
        }
        storage.set("counter", &i.to_string()).unwrap();
    }
}

#[test]
fn test_shared_duckdb_store_across_threads() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(DuckDbStorage::open_in_memory().unwrap());
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let storage = Arc::clone(&storage);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..ITERATIONS_PER_THREAD {
                    storage
                        .set(&format!("k{}_{}", thread_id, i), "v")
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for thread_id in 0..THREAD_COUNT {
        for i in 0..ITERATIONS_PER_THREAD {
            let key = format!("k{}_{}", thread_id, i);
            assert_eq!(storage.get(&key).unwrap().as_deref(), Some("v"));
        }
    }
}

/// Independent JSON stores on one directory, all writing the selection.
/// Every write succeeds, and the survivor is one of the written ids.
#[test]
fn test_concurrent_json_writers_last_write_wins() {
    let temp_dir = TempDir::new().unwrap();
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let writes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let dir = temp_dir.path().to_path_buf();
            let barrier = Arc::clone(&barrier);
            let writes = Arc::clone(&writes);
            thread::spawn(move || {
                let storage = JsonFileStorage::open(&dir).unwrap();
                let store = LocalityStore::new(StorageAvailability::from_storage(Arc::new(storage)));
                barrier.wait();
                for i in 0..ITERATIONS_PER_THREAD {
                    let id = TownId::new(format!("town-{}-{}", thread_id, i)).unwrap();
                    store.set_selected_town_id(&id);
                    writes.fetch_add(1, Ordering::SeqCst);
                    // A reader never sees a torn value
                    let seen = store.get_selected_town_id();
                    assert!(seen.is_some_and(|t| t.as_str().starts_with("town-")));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(writes.load(Ordering::SeqCst), THREAD_COUNT * ITERATIONS_PER_THREAD);

    let storage = JsonFileStorage::open(temp_dir.path()).unwrap();
    let store = LocalityStore::new(StorageAvailability::from_storage(Arc::new(storage)));
    let survivor = store.get_selected_town_id().unwrap();
    let last_ids: Vec<String> = (0..THREAD_COUNT)
        .map(|t| format!("town-{}-{}", t, ITERATIONS_PER_THREAD - 1))
        .collect();
    assert!(last_ids.contains(&survivor.to_string()), "unexpected survivor {}", survivor);
}
