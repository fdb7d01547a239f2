//! The typed-column ("series") abstraction the VM executes over.
//!
//! A [`Column`] is a named, finite sequence of values of exactly one
//! element kind, with a null indicator carried per cell via `Option`.

use crate::bitmap::Bitmap;
use crate::error::DasmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Int64,
    Float64,
    Str,
    Bool,
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Int64(_) => ColumnKind::Int64,
            ColumnData::Float64(_) => ColumnKind::Float64,
            ColumnData::Str(_) => ColumnKind::Str,
            ColumnData::Bool(_) => ColumnKind::Bool,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Column {
        Column { name: name.into(), data }
    }

    pub fn int64(name: impl Into<String>, values: Vec<Option<i64>>) -> Column {
        Column::new(name, ColumnData::Int64(values))
    }

    pub fn float64(name: impl Into<String>, values: Vec<Option<f64>>) -> Column {
        Column::new(name, ColumnData::Float64(values))
    }

    pub fn string(name: impl Into<String>, values: Vec<Option<String>>) -> Column {
        Column::new(name, ColumnData::Str(values))
    }

    pub fn bool(name: impl Into<String>, values: Vec<Option<bool>>) -> Column {
        Column::new(name, ColumnData::Bool(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Length of an absent column is defined as zero.
    pub fn length(&self) -> usize {
        self.data.len()
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn is_null(&self, i: usize) -> bool {
        match &self.data {
            ColumnData::Int64(v) => v.get(i).map_or(true, |x| x.is_none()),
            ColumnData::Float64(v) => v.get(i).map_or(true, |x| x.is_none()),
            ColumnData::Str(v) => v.get(i).map_or(true, |x| x.is_none()),
            ColumnData::Bool(v) => v.get(i).map_or(true, |x| x.is_none()),
        }
    }

    /// Numeric accessor that coerces from float (truncating toward zero).
    /// Out-of-range reads yield the typed zero, matching register-read
    /// semantics elsewhere in the VM.
    pub fn get_i64(&self, i: usize) -> Option<i64> {
        match &self.data {
            ColumnData::Int64(v) => v.get(i).copied().flatten(),
            ColumnData::Float64(v) => v.get(i).copied().flatten().map(|f| f as i64),
            _ => None,
        }
    }

    /// Numeric accessor that coerces from int (widening).
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Float64(v) => v.get(i).copied().flatten(),
            ColumnData::Int64(v) => v.get(i).copied().flatten().map(|n| n as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, i: usize) -> Option<&str> {
        match &self.data {
            ColumnData::Str(v) => v.get(i).and_then(|x| x.as_deref()),
            _ => None,
        }
    }

    pub fn get_bool(&self, i: usize) -> Option<bool> {
        match &self.data {
            ColumnData::Bool(v) => v.get(i).copied().flatten(),
            _ => None,
        }
    }

    pub fn clone_column(&self) -> Column {
        self.clone()
    }

    pub fn rename(&self, new_name: impl Into<String>) -> Column {
        Column { name: new_name.into(), data: self.data.clone() }
    }

    pub fn empty_like(&self) -> Column {
        let data = match self.kind() {
            ColumnKind::Int64 => ColumnData::Int64(Vec::new()),
            ColumnKind::Float64 => ColumnData::Float64(Vec::new()),
            ColumnKind::Str => ColumnData::Str(Vec::new()),
            ColumnKind::Bool => ColumnData::Bool(Vec::new()),
            ColumnKind::Unknown => ColumnData::Int64(Vec::new()),
        };
        Column::new(self.name.clone(), data)
    }

    /// Constructs a new column carrying `template`'s name and kind, backed
    /// by freshly computed `values`. Used by the VM when an opcode derives
    /// one column from another (e.g. `STR_UPPER`, `VEC_ADD_I`).
    pub fn build_from_values(template: &Column, data: ColumnData) -> Column {
        Column { name: template.name.clone(), data }
    }

    /// Interprets this column as a boolean mask; a cell counts as set iff
    /// it is a non-null `true`.
    pub fn as_mask(&self) -> Result<Bitmap, DasmError> {
        match &self.data {
            ColumnData::Bool(v) => {
                let mut bitmap = Bitmap::new(v.len());
                for (i, cell) in v.iter().enumerate() {
                    if *cell == Some(true) {
                        bitmap.set(i);
                    }
                }
                Ok(bitmap)
            }
            other => Err(DasmError::TypeMismatch(format!(
                "expected bool column for mask, found {:?}",
                other.kind()
            ))),
        }
    }

    /// Produces a new column with only the entries whose bit is set, in
    /// original order.
    pub fn filter_by_bitmap(&self, bitmap: &Bitmap) -> Column {
        macro_rules! filtered {
            ($v:expr) => {{
                let mut out = Vec::with_capacity(bitmap.popcount());
                for i in bitmap.iter_set() {
                    if let Some(cell) = $v.get(i) {
                        out.push(cell.clone());
                    }
                }
                out
            }};
        }

        let data = match &self.data {
            ColumnData::Int64(v) => ColumnData::Int64(filtered!(v)),
            ColumnData::Float64(v) => ColumnData::Float64(filtered!(v)),
            ColumnData::Str(v) => ColumnData::Str(filtered!(v)),
            ColumnData::Bool(v) => ColumnData::Bool(filtered!(v)),
        };
        Column::new(self.name.clone(), data)
    }

    /// `take[i] = self[indices[i]]`; an out-of-range index yields null.
    pub fn take(&self, indices: &[i64]) -> Column {
        macro_rules! taken {
            ($v:expr) => {{
                indices
                    .iter()
                    .map(|&idx| {
                        if idx < 0 {
                            None
                        } else {
                            $v.get(idx as usize).cloned().flatten()
                        }
                    })
                    .collect()
            }};
        }

        let data = match &self.data {
            ColumnData::Int64(v) => ColumnData::Int64(taken!(v)),
            ColumnData::Float64(v) => ColumnData::Float64(taken!(v)),
            ColumnData::Str(v) => ColumnData::Str(taken!(v)),
            ColumnData::Bool(v) => ColumnData::Bool(taken!(v)),
        };
        Column::new(self.name.clone(), data)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filter_length_matches_popcount() {
        let col = Column::int64("x", vec![Some(1), Some(2), Some(3), Some(4)]);
        let mask = Bitmap::from_bools(&[true, false, true, true]);
        let filtered = col.filter_by_bitmap(&mask);
        assert_eq!(filtered.length(), mask.popcount());
        assert_eq!(filtered.get_i64(0), Some(1));
        assert_eq!(filtered.get_i64(1), Some(3));
        assert_eq!(filtered.get_i64(2), Some(4));
    }

    #[test]
    fn filter_with_all_ones_clones() {
        let col = Column::int64("x", vec![Some(1), Some(2), Some(3)]);
        let mask = Bitmap::from_bools(&[true, true, true]);
        assert_eq!(col.filter_by_bitmap(&mask), col);
    }

    #[test]
    fn int_from_float_truncates_toward_zero() {
        let col = Column::float64("x", vec![Some(3.9), Some(-3.9)]);
        assert_eq!(col.get_i64(0), Some(3));
        assert_eq!(col.get_i64(1), Some(-3));
    }

    #[test]
    fn float_from_int_widens() {
        let col = Column::int64("x", vec![Some(7)]);
        assert_eq!(col.get_f64(0), Some(7.0));
    }

    #[test]
    fn take_out_of_range_yields_null() {
        let col = Column::int64("x", vec![Some(10), Some(20)]);
        let taken = col.take(&[0, 5, 1]);
        assert_eq!(taken.get_i64(0), Some(10));
        assert!(taken.is_null(1));
        assert_eq!(taken.get_i64(2), Some(20));
    }
}
