//! CLI-specific error types and exit code mapping

use flowprobe_core::error::{FlowprobeError, SpecError};
use flowprobe_engine::CompileError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// The feature specification file could not be loaded.
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),

    /// The feature specification failed to compile.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from flowprobe-core.
    #[error("{0}")]
    Core(#[from] FlowprobeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                         |
    /// |------|---------------------------------|
    /// | 0    | Success                         |
    /// | 1    | General / command error         |
    /// | 2    | Configuration error             |
    /// | 3    | Specification or compile error  |
    /// | 10   | IO error                        |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Spec(_) | Self::Compile(_) => 3,
            Self::Io(_) => 10,
            Self::Core(core) => match core {
                FlowprobeError::Config(_) => 2,
                FlowprobeError::Spec(_) | FlowprobeError::Compile(_) => 3,
                FlowprobeError::Io(_) => 10,
                FlowprobeError::Export(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}
