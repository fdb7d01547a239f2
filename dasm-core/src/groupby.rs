//! `GROUP_BY` result: unique keys in order of first occurrence, plus the
//! list of original row indices each key occupied.

use std::collections::HashMap;

use crate::series::{Column, ColumnData, ColumnKind};

#[derive(Clone, Debug, PartialEq)]
enum KeyValue {
    Int(i64),
    Float(u64), // bit pattern, so it can be hashed/compared exactly
    Str(String),
    Bool(bool),
    Null,
}

impl KeyValue {
    fn from_column(col: &Column, i: usize) -> KeyValue {
        if col.is_null(i) {
            return KeyValue::Null;
        }
        match col.kind() {
            ColumnKind::Int64 => KeyValue::Int(col.get_i64(i).unwrap()),
            ColumnKind::Float64 => KeyValue::Float(col.get_f64(i).unwrap().to_bits()),
            ColumnKind::Str => KeyValue::Str(col.get_str(i).unwrap().to_owned()),
            ColumnKind::Bool => KeyValue::Bool(col.get_bool(i).unwrap()),
            ColumnKind::Unknown => KeyValue::Null,
        }
    }
}

impl std::hash::Hash for KeyValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            KeyValue::Int(v) => v.hash(state),
            KeyValue::Float(bits) => bits.hash(state),
            KeyValue::Str(s) => s.hash(state),
            KeyValue::Bool(b) => b.hash(state),
            KeyValue::Null => {}
        }
    }
}

impl Eq for KeyValue {}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupByResult {
    kind: ColumnKind,
    keys: Vec<KeyValue>,
    indices: Vec<Vec<usize>>,
    lookup: HashMap<KeyValue, usize>,
}

impl GroupByResult {
    /// Scans `key_column` once, grouping rows by key in order of first
    /// occurrence.
    pub fn build(key_column: &Column) -> GroupByResult {
        let mut result = GroupByResult {
            kind: key_column.kind(),
            keys: Vec::new(),
            indices: Vec::new(),
            lookup: HashMap::new(),
        };

        for row in 0..key_column.length() {
            let key = KeyValue::from_column(key_column, row);
            match result.lookup.get(&key) {
                Some(&slot) => result.indices[slot].push(row),
                None => {
                    let slot = result.keys.len();
                    result.lookup.insert(key.clone(), slot);
                    result.keys.push(key);
                    result.indices.push(vec![row]);
                }
            }
        }

        result
    }

    pub fn group_count(&self) -> usize {
        self.keys.len()
    }

    pub fn indices_for_group(&self, group: usize) -> &[usize] {
        &self.indices[group]
    }

    /// Unique keys in insertion order, rendered as a column of the
    /// source key column's kind.
    pub fn keys_column(&self, name: impl Into<String>) -> Column {
        let name = name.into();
        match self.kind {
            ColumnKind::Int64 => Column::new(
                name,
                ColumnData::Int64(
                    self.keys
                        .iter()
                        .map(|k| match k {
                            KeyValue::Int(v) => Some(*v),
                            _ => None,
                        })
                        .collect(),
                ),
            ),
            ColumnKind::Float64 => Column::new(
                name,
                ColumnData::Float64(
                    self.keys
                        .iter()
                        .map(|k| match k {
                            KeyValue::Float(bits) => Some(f64::from_bits(*bits)),
                            _ => None,
                        })
                        .collect(),
                ),
            ),
            ColumnKind::Str => Column::new(
                name,
                ColumnData::Str(
                    self.keys
                        .iter()
                        .map(|k| match k {
                            KeyValue::Str(s) => Some(s.clone()),
                            _ => None,
                        })
                        .collect(),
                ),
            ),
            ColumnKind::Bool | ColumnKind::Unknown => Column::new(
                name,
                ColumnData::Bool(
                    self.keys
                        .iter()
                        .map(|k| match k {
                            KeyValue::Bool(b) => Some(*b),
                            _ => None,
                        })
                        .collect(),
                ),
            ),
        }
    }

    pub fn counts_column(&self, name: impl Into<String>) -> Column {
        Column::new(
            name,
            ColumnData::Int64(self.indices.iter().map(|rows| Some(rows.len() as i64)).collect()),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keys_are_in_first_occurrence_order() {
        let col = Column::string(
            "category",
            vec![Some("A".into()), Some("B".into()), Some("A".into()), Some("C".into())],
        );
        let gb = GroupByResult::build(&col);
        let keys = gb.keys_column("category");
        assert_eq!(keys.get_str(0), Some("A"));
        assert_eq!(keys.get_str(1), Some("B"));
        assert_eq!(keys.get_str(2), Some("C"));
    }

    #[test]
    fn group_counts_match_row_distribution() {
        let col = Column::string(
            "category",
            vec![Some("A".into()), Some("B".into()), Some("A".into()), Some("C".into())],
        );
        let gb = GroupByResult::build(&col);
        let counts = gb.counts_column("n");
        assert_eq!(counts.get_i64(0), Some(2));
        assert_eq!(counts.get_i64(1), Some(1));
        assert_eq!(counts.get_i64(2), Some(1));
    }

    #[test]
    fn stable_under_permutation_preserving_first_occurrence() {
        let a = Column::string("k", vec![Some("x".into()), Some("y".into()), Some("x".into())]);
        let b = Column::string(
            "k",
            vec![Some("x".into()), Some("y".into()), Some("x".into()), Some("x".into())],
        );
        assert_eq!(GroupByResult::build(&a).keys_column("k").get_str(0), Some("x"));
        assert_eq!(GroupByResult::build(&b).keys_column("k").get_str(0), Some("x"));
    }
}
