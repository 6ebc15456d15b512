//! Unit tests for the Engine logging facade
//!
//! IMPORTANT: the logger is global state shared across all tests.
//! All tests touching it are marked with #[serial].

use crate::lumen::{Engine, EngineConfig};
use crate::lumen::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures entries logged under `lumen::test`
///
/// Unit tests without #[serial] may log concurrently; their entries are
/// ignored.
struct TestLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String)>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<(LogSeverity, String)>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source == "lumen::test" {
            self.entries.lock().unwrap().push((entry.severity, entry.message.clone()));
        }
    }
}

fn teardown() {
    Engine::reset_logger();
    Engine::set_min_severity(LogSeverity::Trace);
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
#[serial]
fn test_initialize_applies_log_level() {
    let config = EngineConfig {
        min_log_severity: LogSeverity::Warn,
        ..EngineConfig::default()
    };
    Engine::initialize(&config).unwrap();
    assert_eq!(Engine::min_severity(), LogSeverity::Warn);
    teardown();
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    Engine::set_min_severity(LogSeverity::Info);

    crate::engine_debug!("lumen::test", "dropped");
    crate::engine_info!("lumen::test", "kept {}", 1);
    crate::engine_error!("lumen::test", "kept {}", 2);

    let captured = entries.lock().unwrap().clone();
    assert_eq!(
        captured,
        vec![
            (LogSeverity::Info, "kept 1".to_string()),
            (LogSeverity::Error, "kept 2".to_string()),
        ]
    );
    teardown();
}

#[test]
#[serial]
fn test_engine_err_logs_and_yields_error() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    let err = crate::engine_err!("lumen::test", crate::lumen::Error::NotFound("thing".to_string()));
    assert!(matches!(err, crate::lumen::Error::NotFound(_)));

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].0, LogSeverity::Error);
    assert!(captured[0].1.contains("thing"));
    drop(captured);
    teardown();
}

#[test]
#[serial]
fn test_shutdown_restores_defaults() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    Engine::set_min_severity(LogSeverity::Error);

    Engine::shutdown();
    assert_eq!(Engine::min_severity(), LogSeverity::Trace);

    crate::engine_info!("lumen::test", "goes to the default logger");
    assert!(entries.lock().unwrap().is_empty());
}
