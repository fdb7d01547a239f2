use thiserror::Error;

/// Wraps every phase's error taxonomy behind one type so `main` has a
/// single place to format a failure and pick an exit code.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Asm(#[from] dasm_asm::AsmError),

    #[error(transparent)]
    Bc(#[from] dasm_bc::BcError),

    #[error(transparent)]
    Vm(#[from] dasm_core::DasmError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("reading CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("reading JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parsing config file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("malformed --frame argument '{0}', expected NAME=PATH")]
    BadFrameArg(String),

    #[error("no terminating HALT encountered and no error was reported")]
    Unreachable,
}
