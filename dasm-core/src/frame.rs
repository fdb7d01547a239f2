//! A [`Frame`] is an ordered sequence of named, equal-length columns.

use crate::series::Column;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Frame {
        Frame { columns: Vec::new() }
    }

    pub fn from_columns(columns: Vec<Column>) -> Frame {
        Frame { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Appends a column, replacing any existing column of the same name
    /// so that names stay unique within the frame.
    pub fn add_column(&mut self, column: Column) {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name() == column.name()) {
            *existing = column;
        } else {
            self.columns.push(column);
        }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.length())
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }
}
