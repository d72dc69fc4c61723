//! Error types for the Galaxy3D shader compiler
//!
//! This module defines the error types used throughout the compilation
//! pipeline: source loading, per-stage compilation, linking, emission and
//! pipeline state checks.

use std::fmt;
use crate::stage::ShaderStage;

/// Result type for Galaxy3D shader compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D shader compiler errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Shader source missing, unreadable or empty
    LoadFailed(String),

    /// Parse or semantic failure for one stage
    CompileFailed {
        /// Stage that failed to compile
        stage: ShaderStage,
        /// Diagnostic text produced by the front-end or validator
        log: String,
    },

    /// No stage to link, or cross-stage interface mismatch
    LinkFailed(String),

    /// SPIR-V generation failed for one stage
    EmitFailed {
        /// Stage that failed to emit
        stage: ShaderStage,
        /// Diagnostic text
        message: String,
    },

    /// Operation called in the wrong pipeline state
    InvalidState(String),

    /// Stage tag recognized but not supported by the backend
    UnsupportedStage(ShaderStage),

    /// The same stage was requested twice
    DuplicateStage(ShaderStage),

    /// Compiler configuration rejected
    InvalidConfig(String),

    /// Several independent failures (one per stage)
    Multiple(Vec<Error>),
}

/// Category of an [`Error`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Load,
    Compile,
    Link,
    Emit,
    InvalidState,
    UnsupportedStage,
    DuplicateStage,
    InvalidConfig,
    Multiple,
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LoadFailed(_) => ErrorKind::Load,
            Error::CompileFailed { .. } => ErrorKind::Compile,
            Error::LinkFailed(_) => ErrorKind::Link,
            Error::EmitFailed { .. } => ErrorKind::Emit,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::UnsupportedStage(_) => ErrorKind::UnsupportedStage,
            Error::DuplicateStage(_) => ErrorKind::DuplicateStage,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Multiple(_) => ErrorKind::Multiple,
        }
    }

    /// Stage this error is attached to, if any
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            Error::CompileFailed { stage, .. }
            | Error::EmitFailed { stage, .. }
            | Error::UnsupportedStage(stage)
            | Error::DuplicateStage(stage) => Some(*stage),
            _ => None,
        }
    }

    /// Collapse a list of per-stage errors into one error
    ///
    /// Returns `None` for an empty list, the error itself for a single entry,
    /// and `Error::Multiple` otherwise.
    pub fn aggregate(mut errors: Vec<Error>) -> Option<Error> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Multiple(errors)),
        }
    }

    /// Flatten nested `Multiple` errors into a plain list
    pub fn flatten(self) -> Vec<Error> {
        match self {
            Error::Multiple(errors) => errors.into_iter().flat_map(Error::flatten).collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LoadFailed(msg) => write!(f, "Load failed: {}", msg),
            Error::CompileFailed { stage, log } => {
                write!(f, "Compile failed ({} stage): {}", stage, log)
            }
            Error::LinkFailed(msg) => write!(f, "Link failed: {}", msg),
            Error::EmitFailed { stage, message } => {
                write!(f, "Emit failed ({} stage): {}", stage, message)
            }
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::UnsupportedStage(stage) => write!(f, "Unsupported stage: {}", stage),
            Error::DuplicateStage(stage) => write!(f, "Duplicate stage: {}", stage),
            Error::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            Error::Multiple(errors) => {
                write!(f, "{} errors:", errors.len())?;
                for error in errors {
                    write!(f, "\n  - {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

/// Log an error at ERROR severity, then return it from the current function
///
/// # Example
///
/// ```ignore
/// shader_bail!("galaxy3d::shader::Linker", Error::LinkFailed("no stages".to_string()));
/// ```
#[macro_export]
macro_rules! shader_bail {
    ($source:expr, $err:expr) => {{
        let err: $crate::galaxy3d::Error = $err;
        $crate::shader_error!($source, "{}", err);
        return Err(err);
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
