//! Hash-join implementation shared by `JOIN_INNER`/`JOIN_LEFT`/`JOIN_RIGHT`/`JOIN_OUTER`.

use std::collections::HashMap;

use crate::error::DasmError;
use crate::frame::Frame;
use crate::key::RowKey;
use crate::series::Column;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinMode {
    Inner,
    Left,
    Right,
    Outer,
}

fn build_index(key_col: &Column) -> HashMap<RowKey, Vec<usize>> {
    let mut index: HashMap<RowKey, Vec<usize>> = HashMap::new();
    for i in 0..key_col.length() {
        index.entry(RowKey::from_column(key_col, i)).or_default().push(i);
    }
    index
}

fn take_optional(col: &Column, indices: &[Option<usize>]) -> Column {
    let signed: Vec<i64> = indices.iter().map(|idx| idx.map_or(-1, |i| i as i64)).collect();
    col.take(&signed)
}

/// Left columns (names preserved) followed by every right column except
/// the key, each renamed `right_<name>`.
fn output_columns(
    left: &Frame,
    right: &Frame,
    key_name: &str,
    rows: &[(Option<usize>, Option<usize>)],
) -> Vec<Column> {
    let mut columns = Vec::with_capacity(left.col_count() + right.col_count());

    let left_indices: Vec<Option<usize>> = rows.iter().map(|&(li, _)| li).collect();
    for col in left.columns() {
        columns.push(take_optional(col, &left_indices));
    }

    let right_indices: Vec<Option<usize>> = rows.iter().map(|&(_, ri)| ri).collect();
    for col in right.columns() {
        if col.name() == key_name {
            continue;
        }
        columns.push(take_optional(col, &right_indices).rename(format!("right_{}", col.name())));
    }

    columns
}

/// Joins `left` and `right` on their shared `key_name` column.
///
/// Row ordering: INNER/LEFT/OUTER iterate left rows in order, emitting one
/// output row per matching right row (LEFT/OUTER additionally emit an
/// unmatched-left row with a null right side); OUTER then appends any
/// right rows that matched nothing, in right order. RIGHT iterates right
/// rows in order against an index built on the left.
pub fn join_frames(left: &Frame, right: &Frame, key_name: &str, mode: JoinMode) -> Result<Frame, DasmError> {
    let left_key = left.column(key_name).ok_or_else(|| DasmError::ColumnNotFound(key_name.to_owned()))?;
    let right_key = right.column(key_name).ok_or_else(|| DasmError::ColumnNotFound(key_name.to_owned()))?;

    let mut rows: Vec<(Option<usize>, Option<usize>)> = Vec::new();

    match mode {
        JoinMode::Inner | JoinMode::Left | JoinMode::Outer => {
            let right_index = build_index(right_key);
            let mut matched_right = vec![false; right_key.length()];
            for li in 0..left_key.length() {
                let key = RowKey::from_column(left_key, li);
                match right_index.get(&key) {
                    Some(matches) => {
                        for &ri in matches {
                            matched_right[ri] = true;
                            rows.push((Some(li), Some(ri)));
                        }
                    }
                    None => {
                        if matches!(mode, JoinMode::Left | JoinMode::Outer) {
                            rows.push((Some(li), None));
                        }
                    }
                }
            }
            if matches!(mode, JoinMode::Outer) {
                for (ri, was_matched) in matched_right.into_iter().enumerate() {
                    if !was_matched {
                        rows.push((None, Some(ri)));
                    }
                }
            }
        }
        JoinMode::Right => {
            let left_index = build_index(left_key);
            for ri in 0..right_key.length() {
                let key = RowKey::from_column(right_key, ri);
                match left_index.get(&key) {
                    Some(matches) => {
                        for &li in matches {
                            rows.push((Some(li), Some(ri)));
                        }
                    }
                    None => rows.push((None, Some(ri))),
                }
            }
        }
    }

    Ok(Frame::from_columns(output_columns(left, right, key_name, &rows)))
}
