/// Lumen Engine - global logging facade
///
/// The engine keeps exactly one piece of process-wide state: the logger used
/// by the `engine_*!` macros. Everything else (controller registry, resource
/// managers, graphics contexts) is an explicit object owned by the application.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Entries below this severity are dropped before reaching the logger
static MIN_SEVERITY: RwLock<LogSeverity> = RwLock::new(LogSeverity::Trace);

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

fn enabled(severity: LogSeverity) -> bool {
    MIN_SEVERITY.read().map(|min| severity >= *min).unwrap_or(true)
}

// ===== PUBLIC API =====

/// Main engine facade
///
/// # Example
///
/// ```no_run
/// use lumen_engine::lumen::{Engine, EngineConfig};
///
/// Engine::initialize(&EngineConfig::default())?;
/// // ... build scenes, run frames ...
/// Engine::shutdown();
/// # Ok::<(), lumen_engine::lumen::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Initialize the engine from a configuration
    ///
    /// Applies the configured log level. Calling it again re-applies the config.
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns Result for future extensibility.
    pub fn initialize(config: &EngineConfig) -> Result<()> {
        Self::set_min_severity(config.min_log_severity);
        crate::engine_info!("lumen::Engine", "Engine initialized for '{}'", config.app_name);
        Ok(())
    }

    /// Shutdown the engine
    ///
    /// Restores the default logger and log level.
    pub fn shutdown() {
        crate::engine_info!("lumen::Engine", "Engine shutdown");
        Self::reset_logger();
        Self::set_min_severity(LogSeverity::Trace);
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, editor console, etc.)
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Drop every entry below `severity`
    pub fn set_min_severity(severity: LogSeverity) {
        if let Ok(mut min) = MIN_SEVERITY.write() {
            *min = severity;
        }
    }

    /// Current minimum severity
    pub fn min_severity() -> LogSeverity {
        MIN_SEVERITY.read().map(|min| *min).unwrap_or(LogSeverity::Trace)
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if !enabled(severity) {
            return;
        }
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by the engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if !enabled(severity) {
            return;
        }
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
