//! The one concrete `FrameLoader` the binary ships: minimal CSV and JSON
//! ingestion with per-column type inference. `LOAD_PARQUET` is wired
//! through to the same capability but always reports a loader failure —
//! a real Parquet reader is out of scope.

use dasm_core::{Column, ColumnData, DasmError, Frame};
use dasm_core::loader::FrameLoader;

pub struct CliFrameLoader;

impl FrameLoader for CliFrameLoader {
    fn load_csv(&self, path: &str) -> Result<Frame, DasmError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| loader_err("csv", path, e))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| loader_err("csv", path, e))?
            .iter()
            .map(str::to_owned)
            .collect();

        let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|e| loader_err("csv", path, e))?;
            for (i, field) in record.iter().enumerate() {
                if let Some(col) = raw_columns.get_mut(i) {
                    col.push(field.to_owned());
                }
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw_columns)
            .map(|(name, values)| infer_column(name, values))
            .collect();
        Ok(Frame::from_columns(columns))
    }

    fn load_json(&self, path: &str) -> Result<Frame, DasmError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DasmError::LoaderFailure { format: "json", path: path.to_owned(), cause: e.to_string() })?;
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&text)
            .map_err(|e| loader_err("json", path, e))?;

        let mut names: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values: Vec<String> = rows
                    .iter()
                    .map(|row| match row.get(&name) {
                        Some(serde_json::Value::Null) | None => String::new(),
                        Some(serde_json::Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                    })
                    .collect();
                infer_column(name, values)
            })
            .collect();
        Ok(Frame::from_columns(columns))
    }

    fn load_parquet(&self, path: &str) -> Result<Frame, DasmError> {
        Err(DasmError::LoaderFailure {
            format: "parquet",
            path: path.to_owned(),
            cause: "parquet ingestion is not implemented by this binary".to_owned(),
        })
    }
}

fn loader_err(format: &'static str, path: &str, cause: impl std::fmt::Display) -> DasmError {
    DasmError::LoaderFailure { format, path: path.to_owned(), cause: cause.to_string() }
}

/// Infers a single column type from its raw text cells: int64, else
/// float64, else bool, else string. An empty cell is a null of whichever
/// type the rest of the column settles on.
fn infer_column(name: String, raw: Vec<String>) -> Column {
    let all_int = raw.iter().all(|v| v.is_empty() || v.parse::<i64>().is_ok());
    if all_int {
        let values = raw.iter().map(|v| v.parse::<i64>().ok()).collect();
        return Column::new(name, ColumnData::Int64(values));
    }

    let all_float = raw.iter().all(|v| v.is_empty() || v.parse::<f64>().is_ok());
    if all_float {
        let values = raw.iter().map(|v| v.parse::<f64>().ok()).collect();
        return Column::new(name, ColumnData::Float64(values));
    }

    let all_bool = raw.iter().all(|v| v.is_empty() || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"));
    if all_bool {
        let values = raw.iter().map(|v| if v.is_empty() { None } else { Some(v.eq_ignore_ascii_case("true")) }).collect();
        return Column::new(name, ColumnData::Bool(values));
    }

    let values = raw.into_iter().map(|v| if v.is_empty() { None } else { Some(v) }).collect();
    Column::new(name, ColumnData::Str(values))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn infers_int_column() {
        let col = infer_column("n".into(), vec!["1".into(), "2".into(), "".into()]);
        assert_eq!(col.kind(), dasm_core::ColumnKind::Int64);
        assert_eq!(col.get_i64(0), Some(1));
        assert!(col.is_null(2));
    }

    #[test]
    fn mixed_int_and_float_cells_infer_as_float() {
        let col = infer_column("n".into(), vec!["1".into(), "2.5".into()]);
        assert_eq!(col.kind(), dasm_core::ColumnKind::Float64);
        assert_eq!(col.get_f64(0), Some(1.0));
        assert_eq!(col.get_f64(1), Some(2.5));
    }

    #[test]
    fn non_numeric_text_infers_as_string() {
        let col = infer_column("name".into(), vec!["alice".into(), "bob".into()]);
        assert_eq!(col.kind(), dasm_core::ColumnKind::Str);
        assert_eq!(col.get_str(0), Some("alice"));
    }

    #[test]
    fn parquet_always_fails() {
        let loader = CliFrameLoader;
        let err = loader.load_parquet("anything.parquet").unwrap_err();
        assert_eq!(err.kind(), "loader-failure");
    }
}
