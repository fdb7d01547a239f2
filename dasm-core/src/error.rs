//! The runtime/resource/security/cancellation error taxonomy.
//!
//! Assembler and bytecode errors live in their own crates (`dasm-asm`,
//! `dasm-bc`); this enum covers everything that can happen once a
//! [`crate::program::Program`] is loaded into the VM.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DasmError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("frame not found: {0}")]
    FrameNotFound(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid instruction")]
    InvalidInstruction,

    #[error("program ended without HALT")]
    NoHalt,

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("instruction limit exceeded")]
    InstructionLimit,

    #[error("memory limit exceeded")]
    MemoryLimit,

    #[error("file access denied: {0}")]
    FileAccessDenied(String),

    #[error("loading {format} {path}: {cause}")]
    LoaderFailure {
        format: &'static str,
        path: String,
        cause: String,
    },

    #[error("canceled")]
    Canceled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid register index: {0}")]
    InvalidRegister(u8),

    #[error("constant index out of range: {0}")]
    ConstantOutOfRange(u16),
}

impl DasmError {
    /// Stable short tag, matching the `err ∈ { ... }` enumeration of the
    /// VM embedding contract, for callers that want to match on kind
    /// without depending on message text.
    pub fn kind(&self) -> &'static str {
        match self {
            DasmError::ColumnNotFound(_) => "column-not-found",
            DasmError::FrameNotFound(_) => "frame-not-found",
            DasmError::DivisionByZero => "division-by-zero",
            DasmError::InvalidInstruction => "invalid-instruction",
            DasmError::NoHalt => "no-halt",
            DasmError::TypeMismatch(_) => "type-mismatch",
            DasmError::InstructionLimit => "instruction-limit",
            DasmError::MemoryLimit => "memory-limit",
            DasmError::FileAccessDenied(_) => "file-access-denied",
            DasmError::LoaderFailure { .. } => "loader-failure",
            DasmError::Canceled => "context-canceled",
            DasmError::DeadlineExceeded => "context-deadline-exceeded",
            DasmError::InvalidRegister(_) => "invalid-register",
            DasmError::ConstantOutOfRange(_) => "constant-out-of-range",
        }
    }
}
