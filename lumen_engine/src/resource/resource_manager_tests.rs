/// Tests for ResourceManager
///
/// Fixtures are JSON descriptions written into temporary directories; the
/// loaded type is a small test struct so no graphics context is involved.

use super::*;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

#[derive(Debug)]
struct Note {
    text: String,
    directory: PathBuf,
}

/// Manager with one search path and a counting `Note` loader
fn note_manager(dir: &TempDir) -> (ResourceManager, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut manager = ResourceManager::new();
    manager.add_search_path(dir.path());
    manager
        .register_loader(move |request: &LoadRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            let text = request.description["text"]
                .as_str()
                .ok_or_else(|| Error::invalid_asset(&request.id, "text", "missing"))?;
            Ok(Note {
                text: text.to_string(),
                directory: request.directory.clone(),
            })
        })
        .unwrap();
    (manager, calls)
}

fn write_asset(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_returns_same_instance_and_loads_once() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "hello.note", r#"{ "text": "hello" }"#);
    let (manager, calls) = note_manager(&dir);

    let first = manager.load::<Note>("hello.note").unwrap();
    let second = manager.load::<Note>("hello.note").unwrap();

    assert_eq!(first.text, "hello");
    assert_eq!(first.id(), "hello.note");
    assert!(first.ptr_eq(&second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.status::<Note>("hello.note"), ResourceStatus::Loaded);
}

#[test]
fn test_load_passes_description_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("notes")).unwrap();
    write_asset(&dir.path().join("notes"), "a.note", r#"{ "text": "a" }"#);
    let (manager, _) = note_manager(&dir);

    let note = manager.load::<Note>("notes/a.note").unwrap();

    assert_eq!(note.directory, dir.path().join("notes"));
}

#[test]
fn test_first_search_path_wins() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_asset(first.path(), "x.note", r#"{ "text": "first" }"#);
    write_asset(second.path(), "x.note", r#"{ "text": "second" }"#);
    write_asset(second.path(), "y.note", r#"{ "text": "only second" }"#);

    let (mut manager, _) = note_manager(&first);
    manager.add_search_path(second.path());

    assert_eq!(manager.load::<Note>("x.note").unwrap().text, "first");
    assert_eq!(manager.load::<Note>("y.note").unwrap().text, "only second");
}

#[test]
fn test_missing_asset_is_not_found() {
    let dir = TempDir::new().unwrap();
    let (manager, calls) = note_manager(&dir);

    let result = manager.load::<Note>("absent.note");

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_load_without_loader_fails() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "n.note", r#"{ "text": "n" }"#);
    let mut manager = ResourceManager::new();
    manager.add_search_path(dir.path());

    assert!(matches!(manager.load::<Note>("n.note"), Err(Error::NotFound(_))));
}

#[test]
fn test_malformed_description_is_invalid_asset() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "bad.note", "{ not json");
    let (manager, calls) = note_manager(&dir);

    match manager.load::<Note>("bad.note") {
        Err(Error::InvalidAsset { id, field, .. }) => {
            assert_eq!(id, "bad.note");
            assert_eq!(field, "description");
        }
        other => panic!("expected InvalidAsset, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failure_is_cached_until_removed() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "broken.note", r#"{ "title": "no text" }"#);
    let (manager, calls) = note_manager(&dir);

    let first = manager.load::<Note>("broken.note").unwrap_err();
    let second = manager.load::<Note>("broken.note").unwrap_err();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(manager.status::<Note>("broken.note"), ResourceStatus::Failed(_)));

    // Fix the asset; the cached failure still wins until removal
    write_asset(dir.path(), "broken.note", r#"{ "text": "fixed" }"#);
    assert!(manager.load::<Note>("broken.note").is_err());

    assert!(manager.remove::<Note>("broken.note"));
    assert_eq!(manager.load::<Note>("broken.note").unwrap().text, "fixed");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_loader_panic_becomes_failure() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "boom.note", "{}");
    let mut manager = ResourceManager::new();
    manager.add_search_path(dir.path());
    manager
        .register_loader(|_: &LoadRequest| -> Result<Note> { panic!("loader exploded") })
        .unwrap();

    assert!(matches!(manager.load::<Note>("boom.note"), Err(Error::InvalidResource(_))));
    assert!(matches!(manager.status::<Note>("boom.note"), ResourceStatus::Failed(_)));
}

#[test]
fn test_concurrent_loads_run_loader_once() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "shared.note", r#"{ "text": "shared" }"#);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut manager = ResourceManager::new();
    manager.add_search_path(dir.path());
    manager
        .register_loader(move |request: &LoadRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Keep the load in flight long enough for the others to queue up
            std::thread::sleep(Duration::from_millis(50));
            Ok(Note {
                text: request.description["text"].as_str().unwrap_or_default().to_string(),
                directory: request.directory.clone(),
            })
        })
        .unwrap();

    let handles: Vec<ResourceHandle<Note>> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| manager.load::<Note>("shared.note").unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handles.iter().all(|h| h.ptr_eq(&handles[0])));
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_register_loader_twice_fails() {
    let dir = TempDir::new().unwrap();
    let (mut manager, _) = note_manager(&dir);

    let result = manager.register_loader(|_: &LoadRequest| -> Result<Note> {
        Err(Error::NotFound("unused".to_string()))
    });

    assert!(matches!(result, Err(Error::AlreadyExists(_))));
    assert!(manager.has_loader::<Note>());
}

#[test]
fn test_register_resource_then_load_skips_loader() {
    let dir = TempDir::new().unwrap();
    let (manager, calls) = note_manager(&dir);

    let registered = manager
        .register_resource("eager.note", Note { text: "eager".to_string(), directory: PathBuf::new() })
        .unwrap();
    let loaded = manager.load::<Note>("eager.note").unwrap();

    assert!(registered.ptr_eq(&loaded));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_register_resource_rejects_present_id() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "broken.note", "{}");
    let (manager, _) = note_manager(&dir);
    let note = || Note { text: String::new(), directory: PathBuf::new() };

    manager.register_resource("taken.note", note()).unwrap();
    assert!(matches!(
        manager.register_resource("taken.note", note()),
        Err(Error::AlreadyExists(_))
    ));

    // A failed entry is present too
    assert!(manager.load::<Note>("broken.note").is_err());
    assert!(matches!(
        manager.register_resource("broken.note", note()),
        Err(Error::AlreadyExists(_))
    ));
}

#[test]
fn test_same_id_different_types_are_distinct() {
    let manager = ResourceManager::new();
    manager.register_resource("shared", 7u32).unwrap();
    manager.register_resource("shared", "text".to_string()).unwrap();

    assert_eq!(*manager.get::<u32>("shared").unwrap(), 7);
    assert_eq!(manager.get::<String>("shared").unwrap().as_str(), "text");
    assert_eq!(manager.len(), 2);
    assert!(!manager.contains::<u64>("shared"));
}

// ============================================================================
// Queries & removal
// ============================================================================

#[test]
fn test_get_does_not_load() {
    let dir = TempDir::new().unwrap();
    write_asset(dir.path(), "lazy.note", r#"{ "text": "lazy" }"#);
    let (manager, calls) = note_manager(&dir);

    assert!(manager.get::<Note>("lazy.note").is_none());
    assert_eq!(manager.status::<Note>("lazy.note"), ResourceStatus::Unloaded);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_remove_keeps_outstanding_handles_valid() {
    let manager = ResourceManager::new();
    let handle = manager.register_resource("kept", 42u32).unwrap();

    assert!(manager.remove::<u32>("kept"));
    assert!(!manager.remove::<u32>("kept"));
    assert_eq!(*handle, 42);
    assert!(manager.is_empty());
}

#[test]
fn test_collect_unused_drops_unreferenced_only() {
    let manager = ResourceManager::new();
    let held = manager.register_resource("held", 1u32).unwrap();
    drop(manager.register_resource("dropped", 2u32).unwrap());

    assert_eq!(manager.collect_unused(), 1);
    assert!(manager.contains::<u32>("held"));
    assert!(!manager.contains::<u32>("dropped"));
    assert_eq!(held.strong_count(), 2);

    drop(held);
    assert_eq!(manager.collect_unused(), 1);
    assert!(manager.is_empty());
}
