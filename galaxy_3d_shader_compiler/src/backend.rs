/// Galaxy3D Shader Backend - process-wide compiler backend bracket
///
/// The compiler backend needs a single initialize/finalize bracket per
/// process. `ShaderBackend::acquire()` hands out reference-counted
/// `BackendGuard`s: the first guard initializes the backend, dropping the
/// last one finalizes it. Compilers and pipelines hold a guard for their
/// whole lifetime, so the backend cannot be finalized under them.
///
/// The backend also owns the global logger used by the `shader_*!` macros.

use std::sync::{Mutex, OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::{Error, Result};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global backend bracket state
static BACKEND_STATE: Mutex<BackendState> = Mutex::new(BackendState::new());

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Reference count and lifecycle bookkeeping of the backend
struct BackendState {
    /// Number of live guards
    handles: usize,
    /// Number of initialize calls performed since process start
    sessions: u64,
}

impl BackendState {
    const fn new() -> Self {
        Self {
            handles: 0,
            sessions: 0,
        }
    }
}

// ===== PUBLIC API =====

/// Process-wide shader backend manager
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_shader_compiler::galaxy3d::ShaderBackend;
///
/// let backend = ShaderBackend::acquire()?;
/// assert!(ShaderBackend::is_initialized());
/// drop(backend); // last guard: backend finalized
/// # Ok::<(), galaxy_3d_shader_compiler::galaxy3d::Error>(())
/// ```
pub struct ShaderBackend;

/// Live handle on the initialized shader backend
///
/// Cloning a guard takes another reference; dropping it releases one.
#[derive(Debug)]
pub struct BackendGuard {
    session: u64,
}

impl ShaderBackend {
    /// Helper to log errors before returning them (internal use)
    pub(crate) fn log_and_return_error(source: &str, error: Error) -> Error {
        match &error {
            Error::CompileFailed { stage, log } => {
                crate::shader_error!(source, "{} stage compile failure, this shader has been ignored", stage);
                crate::shader_debug!(source, "{}", log);
            }
            _ => {
                crate::shader_error!(source, "{}", error);
            }
        }
        error
    }

    /// Acquire a handle on the backend, initializing it on first use
    ///
    /// # Errors
    ///
    /// Returns an error if the backend state lock is poisoned.
    pub fn acquire() -> Result<BackendGuard> {
        let (session, initialized) = {
            let mut state = BACKEND_STATE.lock()
                .map_err(|_| Self::log_and_return_error(
                    "galaxy3d::shader::Backend",
                    Error::InvalidState("Backend state lock poisoned".to_string()),
                ))?;

            let initialized = state.handles == 0;
            if initialized {
                state.sessions += 1;
            }
            state.handles += 1;
            (state.sessions, initialized)
        };

        // Logged with the state lock released: loggers may query the backend
        if initialized {
            crate::shader_info!("galaxy3d::shader::Backend",
                "Shader backend initialized (session {})", session);
        }

        Ok(BackendGuard { session })
    }

    /// Whether at least one guard is alive
    pub fn is_initialized() -> bool {
        Self::active_handles() > 0
    }

    /// Number of live guards
    pub fn active_handles() -> usize {
        BACKEND_STATE.lock().map(|state| state.handles).unwrap_or(0)
    }

    /// Number of initialize calls performed since process start
    pub fn session_count() -> u64 {
        BACKEND_STATE.lock().map(|state| state.sessions).unwrap_or(0)
    }

    fn release() {
        let finalized = {
            let Ok(mut state) = BACKEND_STATE.lock() else {
                return;
            };
            state.handles = state.handles.saturating_sub(1);
            (state.handles == 0).then_some(state.sessions)
        };

        if let Some(session) = finalized {
            crate::shader_info!("galaxy3d::shader::Backend",
                "Shader backend finalized (session {})", session);
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// The logger may query the backend (`active_handles`, `session_count`)
    /// but must not replace the logger from inside `log`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use galaxy_3d_shader_compiler::galaxy3d::{ShaderBackend, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// ShaderBackend::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like shader_info!, shader_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by shader_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    /// Whether an entry of `severity` would reach the current logger
    ///
    /// Used to skip building costly dumps nobody reads.
    pub fn wants(severity: LogSeverity) -> bool {
        if !severity.is_enabled() {
            return false;
        }
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        logger_lock.read().map(|lock| lock.enabled(severity)).unwrap_or(false)
    }

    fn dispatch(entry: LogEntry) {
        if !entry.severity.is_enabled() {
            return;
        }
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            if lock.enabled(entry.severity) {
                lock.log(&entry);
            }
        }
    }
}

impl BackendGuard {
    /// Initialize cycle this guard belongs to
    pub fn session(&self) -> u64 {
        self.session
    }
}

impl Clone for BackendGuard {
    fn clone(&self) -> Self {
        if let Ok(mut state) = BACKEND_STATE.lock() {
            state.handles += 1;
        }
        Self { session: self.session }
    }
}

impl Drop for BackendGuard {
    fn drop(&mut self) {
        ShaderBackend::release();
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
