//! External collaborator interfaces. The VM core never parses a CSV,
//! JSON document, or Parquet file itself — it calls out to whatever
//! [`FrameLoader`] the embedder installed. Concrete ingestors live
//! outside this crate (see `dasm-cli` for a minimal CSV/JSON one).

use crate::error::DasmError;
use crate::frame::Frame;

pub trait FrameLoader {
    fn load_csv(&self, path: &str) -> Result<Frame, DasmError>;
    fn load_json(&self, path: &str) -> Result<Frame, DasmError>;
    fn load_parquet(&self, path: &str) -> Result<Frame, DasmError>;
}

/// A `FrameLoader` that refuses every request; useful as a default when
/// an embedder only runs programs that use `LOAD_FRAME`.
pub struct NoLoader;

impl FrameLoader for NoLoader {
    fn load_csv(&self, path: &str) -> Result<Frame, DasmError> {
        Err(DasmError::LoaderFailure {
            format: "csv",
            path: path.to_owned(),
            cause: "no FrameLoader installed".to_owned(),
        })
    }

    fn load_json(&self, path: &str) -> Result<Frame, DasmError> {
        Err(DasmError::LoaderFailure {
            format: "json",
            path: path.to_owned(),
            cause: "no FrameLoader installed".to_owned(),
        })
    }

    fn load_parquet(&self, path: &str) -> Result<Frame, DasmError> {
        Err(DasmError::LoaderFailure {
            format: "parquet",
            path: path.to_owned(),
            cause: "no FrameLoader installed".to_owned(),
        })
    }
}

/// Read-only name -> Frame mapping consumed by `LOAD_FRAME`.
pub trait FrameCatalog {
    fn get(&self, name: &str) -> Option<&Frame>;
}

impl FrameCatalog for std::collections::HashMap<String, Frame> {
    fn get(&self, name: &str) -> Option<&Frame> {
        std::collections::HashMap::get(self, name)
    }
}
