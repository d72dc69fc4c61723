//! Diagnostic sink of the Galaxy3D shader compiler
//!
//! Every stage of the pipeline reports through the `shader_*!` macros,
//! which route entries to one process-wide `Logger` owned by the backend.
//!
//! Trace and Debug entries (SPIR-V dumps, reflection dumps, glslang
//! diagnostics) are only delivered in debug builds or with the
//! `verbose-diagnostics` feature. Info, Warn and Error summaries are always
//! delivered. A logger can narrow this further through `Logger::enabled`;
//! costly dumps are skipped entirely when no logger wants them.
//!
//! glslang diagnostics span several lines. The default logger prints the
//! first line after the entry header and indents the following ones.

use colored::*;
use std::fmt::Write as _;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Destination of compiler diagnostics
///
/// Implement this trait to redirect diagnostics to a file, an editor panel
/// or a test capture.
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_shader_compiler::galaxy3d::log::{Logger, LogEntry, LogSeverity};
///
/// struct ErrorsOnly;
///
/// impl Logger for ErrorsOnly {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
///
///     fn enabled(&self, severity: LogSeverity) -> bool {
///         severity >= LogSeverity::Error
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Record one entry
    fn log(&self, entry: &LogEntry);

    /// Whether entries of `severity` should be produced at all
    fn enabled(&self, _severity: LogSeverity) -> bool {
        true
    }
}

/// One diagnostic produced by the pipeline
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,

    pub timestamp: SystemTime,

    /// Pipeline component (e.g., "galaxy3d::shader::Compiler")
    pub source: String,

    /// Message; glslang diagnostics and dumps may span several lines
    pub message: String,

    /// Crate source file, set for errors only
    pub file: Option<&'static str>,

    /// Crate source line, set for errors only
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// SPIR-V and reflection dumps
    Trace,

    /// glslang diagnostics and per-step progress
    Debug,

    /// Success summaries (linked stages, emitted word counts)
    Info,

    /// glslang warnings, ignored stages and degraded results
    Warn,

    /// Failures (with file:line details)
    Error,
}

impl LogSeverity {
    /// Whether entries of this severity are delivered in the current build
    pub fn is_enabled(self) -> bool {
        match self {
            LogSeverity::Trace | LogSeverity::Debug => {
                cfg!(any(debug_assertions, feature = "verbose-diagnostics"))
            }
            _ => true,
        }
    }

    /// Fixed-width label used by the default logger
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Console logger used until `ShaderBackend::set_logger` is called
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
///
/// Continuation lines of a multi-line message are indented by
/// [`DefaultLogger::CONTINUATION`]. Warnings and errors go to stderr, the
/// rest to stdout.
pub struct DefaultLogger;

impl DefaultLogger {
    /// Prefix of every continuation line
    pub const CONTINUATION: &'static str = "    | ";

    /// Render an entry without colors
    pub fn format_plain(entry: &LogEntry) -> String {
        Self::format(entry, false)
    }

    /// Render an entry, with ANSI colors when `colored` is set
    pub fn format(entry: &LogEntry, colored: bool) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");

        let label = entry.severity.label();
        let (severity, source) = if colored {
            let severity = match entry.severity {
                LogSeverity::Trace => label.bright_black(),
                LogSeverity::Debug => label.cyan(),
                LogSeverity::Info => label.green(),
                LogSeverity::Warn => label.yellow(),
                LogSeverity::Error => label.red().bold(),
            };
            (severity.to_string(), entry.source.bright_blue().to_string())
        } else {
            (label.to_string(), entry.source.clone())
        };

        let mut lines = entry.message.lines();
        let first = lines.next().unwrap_or_default();

        let mut out = format!("[{}] [{}] [{}] {}", timestamp, severity, source, first);
        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            let _ = write!(out, " ({}:{})", file, line);
        }
        for line in lines {
            out.push('\n');
            out.push_str(Self::CONTINUATION);
            out.push_str(line);
        }
        out
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let rendered = Self::format(entry, true);
        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", rendered);
        } else {
            println!("{}", rendered);
        }
    }
}

// ===== LOGGING MACROS =====

/// Shared body of the severity macros
///
/// The message is only formatted when the installed logger would take it.
#[doc(hidden)]
#[macro_export]
macro_rules! __shader_log {
    ($severity:ident, $source:expr, $($arg:tt)*) => {{
        let severity = $crate::galaxy3d::log::LogSeverity::$severity;
        if $crate::galaxy3d::ShaderBackend::wants(severity) {
            $crate::galaxy3d::ShaderBackend::log(severity, $source, format!($($arg)*));
        }
    }};
}

/// Log a TRACE message (SPIR-V and reflection dumps)
///
/// # Example
///
/// ```ignore
/// shader_trace!("galaxy3d::shader::Compiler", "[{}] SPIR-V:\n{}", name, assembly);
/// ```
#[macro_export]
macro_rules! shader_trace {
    ($source:expr, $($arg:tt)*) => { $crate::__shader_log!(Trace, $source, $($arg)*) };
}

/// Log a DEBUG message (glslang diagnostics)
#[macro_export]
macro_rules! shader_debug {
    ($source:expr, $($arg:tt)*) => { $crate::__shader_log!(Debug, $source, $($arg)*) };
}

/// Log an INFO message (success summaries)
///
/// # Example
///
/// ```ignore
/// shader_info!("galaxy3d::shader::Emitter", "vertex shader generated, {} words", count);
/// ```
#[macro_export]
macro_rules! shader_info {
    ($source:expr, $($arg:tt)*) => { $crate::__shader_log!(Info, $source, $($arg)*) };
}

/// Log a WARN message (glslang warnings, ignored stages)
#[macro_export]
macro_rules! shader_warn {
    ($source:expr, $($arg:tt)*) => { $crate::__shader_log!(Warn, $source, $($arg)*) };
}

/// Log an ERROR message tagged with the call site
///
/// Errors are always formatted: the entry carries `file!()`/`line!()` and
/// goes through `ShaderBackend::log_detailed`.
///
/// ```ignore
/// shader_error!("galaxy3d::shader::Linker", "Program link failure: {}", error);
/// ```
#[macro_export]
macro_rules! shader_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::galaxy3d::ShaderBackend::log_detailed(
            $crate::galaxy3d::log::LogSeverity::Error, $source, format!($($arg)*), file!(), line!())
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
