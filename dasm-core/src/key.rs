//! A hashable, equality-comparable representation of a single column
//! cell, shared by `GROUP_BY` and the join implementations.

use crate::series::{Column, ColumnKind};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RowKey {
    Int(i64),
    Float(u64), // IEEE-754 bit pattern so NaN/±0 compare exactly
    Str(String),
    Bool(bool),
    Null,
}

impl RowKey {
    pub(crate) fn from_column(col: &Column, i: usize) -> RowKey {
        if col.is_null(i) {
            return RowKey::Null;
        }
        match col.kind() {
            ColumnKind::Int64 => RowKey::Int(col.get_i64(i).unwrap()),
            ColumnKind::Float64 => RowKey::Float(col.get_f64(i).unwrap().to_bits()),
            ColumnKind::Str => RowKey::Str(col.get_str(i).unwrap().to_owned()),
            ColumnKind::Bool => RowKey::Bool(col.get_bool(i).unwrap()),
            ColumnKind::Unknown => RowKey::Null,
        }
    }
}

impl std::hash::Hash for RowKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RowKey::Int(v) => v.hash(state),
            RowKey::Float(bits) => bits.hash(state),
            RowKey::Str(s) => s.hash(state),
            RowKey::Bool(b) => b.hash(state),
            RowKey::Null => {}
        }
    }
}

impl Eq for RowKey {}
