//! Shared parse state
use crate::{converter::Value, fields::Fields};
use nalgebra::DMatrix;
use std::collections::BTreeMap;

/// One parsed record: field name and value
pub type Row = BTreeMap<String, Value>;

impl From<&Fields> for Row {
    fn from(fields: &Fields) -> Self {
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

/// Content stored in [ParseState::data]
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    /// One row per record
    Table(Vec<Row>),
    /// Dense matrix
    Matrix(DMatrix<f64>),
}

/// [ParseState] is the standard state handed to record handlers:
/// `data` is the growing result, `meta` gathers header facts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseState {
    pub data: BTreeMap<String, DataItem>,
    pub meta: BTreeMap<String, Value>,
}

impl ParseState {
    /// Appends a row to the table named `namespace`.
    /// Matrix content stored under this name is replaced.
    pub fn push_row(&mut self, namespace: &str, row: Row) {
        match self.data.get_mut(namespace) {
            Some(DataItem::Table(rows)) => rows.push(row),
            _ => {
                self.data
                    .insert(namespace.to_string(), DataItem::Table(vec![row]));
            },
        }
    }
    pub fn table(&self, namespace: &str) -> Option<&[Row]> {
        match self.data.get(namespace) {
            Some(DataItem::Table(rows)) => Some(rows.as_slice()),
            _ => None,
        }
    }
    pub fn table_mut(&mut self, namespace: &str) -> Option<&mut Vec<Row>> {
        match self.data.get_mut(namespace) {
            Some(DataItem::Table(rows)) => Some(rows),
            _ => None,
        }
    }
    pub fn set_matrix(&mut self, namespace: &str, matrix: DMatrix<f64>) {
        self.data
            .insert(namespace.to_string(), DataItem::Matrix(matrix));
    }
    pub fn matrix(&self, namespace: &str) -> Option<&DMatrix<f64>> {
        match self.data.get(namespace) {
            Some(DataItem::Matrix(m)) => Some(m),
            _ => None,
        }
    }
    /// Moves data from `from` to `to`. Returns false if `from` does not exist.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.data.remove(from) {
            Some(item) => {
                self.data.insert(to.to_string(), item);
                true
            },
            None => false,
        }
    }
    pub fn set_meta(&mut self, key: &str, value: Value) {
        self.meta.insert(key.to_string(), value);
    }
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }
    /// Text meta value, if any
    pub fn meta_text(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn tables_and_matrices() {
        let mut state = ParseState::default();
        let mut row = Row::new();
        row.insert("index".to_string(), Value::Integer(1));
        state.push_row("SOLUTION/ESTIMATE", row.clone());
        state.push_row("SOLUTION/ESTIMATE", row);
        assert_eq!(state.table("SOLUTION/ESTIMATE").map(|t| t.len()), Some(2));
        assert!(state.matrix("SOLUTION/ESTIMATE").is_none());

        state.set_matrix("M", DMatrix::identity(2, 2));
        assert!(state.rename("M", "M/CORR"));
        assert!(!state.rename("M", "M/CORR"));
        assert_eq!(state.matrix("M/CORR"), Some(&DMatrix::identity(2, 2)));

        state.set_meta("version", Value::Float(2.02));
        state.set_meta("agency", Value::from("IGS"));
        assert_eq!(state.meta_text("agency"), Some("IGS"));
        assert_eq!(state.meta("version"), Some(&Value::Float(2.02)));
    }
}
