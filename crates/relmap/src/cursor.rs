//! Result cursor contract consumed by the mappers.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::VecDeque;

/// One column of a result set as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Zero-based position in the result set.
    pub ordinal: usize,
    /// Driver-reported nullability, when known.
    pub nullable: Option<bool>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            ordinal,
            nullable: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }
}

/// Sink for one column of a scanned row.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScanTarget {
    /// Receive the column value.
    Capture(Value),
    /// Accept and drop whatever the driver produces.
    #[default]
    Discard,
}

impl ScanTarget {
    /// An empty capturing sink.
    pub fn capture() -> Self {
        ScanTarget::Capture(Value::Null)
    }

    /// Store a scanned value. Discard sinks ignore it.
    pub fn store(&mut self, value: Value) {
        if let ScanTarget::Capture(slot) = self {
            *slot = value;
        }
    }

    /// Take the captured value, if this is a capturing sink.
    pub fn into_value(self) -> Option<Value> {
        match self {
            ScanTarget::Capture(value) => Some(value),
            ScanTarget::Discard => None,
        }
    }
}

/// Forward-only row cursor.
///
/// `scan` must be called with exactly one target per column and reads the
/// whole current row in one call.
pub trait Cursor {
    /// Columns of the current result set.
    fn columns(&self) -> &[ColumnDescriptor];

    /// Move to the next row. Returns `false` once the cursor is exhausted.
    fn advance(&mut self) -> OrmResult<bool>;

    /// Copy the current row into `targets`.
    fn scan(&mut self, targets: &mut [ScanTarget]) -> OrmResult<()>;
}

impl<C: Cursor + ?Sized> Cursor for &mut C {
    fn columns(&self) -> &[ColumnDescriptor] {
        (**self).columns()
    }

    fn advance(&mut self) -> OrmResult<bool> {
        (**self).advance()
    }

    fn scan(&mut self, targets: &mut [ScanTarget]) -> OrmResult<()> {
        (**self).scan(targets)
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    fn columns(&self) -> &[ColumnDescriptor] {
        (**self).columns()
    }

    fn advance(&mut self) -> OrmResult<bool> {
        (**self).advance()
    }

    fn scan(&mut self, targets: &mut [ScanTarget]) -> OrmResult<()> {
        (**self).scan(targets)
    }
}

/// In-memory cursor over fully buffered rows.
#[derive(Debug, Clone, Default)]
pub struct VecCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl VecCursor {
    /// Build a cursor from column names and rows.
    ///
    /// # Example
    /// ```ignore
    /// let cursor = VecCursor::new(["id", "name"], vec![vec![1.into(), "go".into()]]);
    /// ```
    pub fn new<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(ordinal, name)| ColumnDescriptor::new(name, ordinal))
            .collect();
        Self::from_descriptors(columns, rows)
    }

    pub fn from_descriptors(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            current: None,
        }
    }

    /// Rows not yet advanced to.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for VecCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn advance(&mut self) -> OrmResult<bool> {
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn scan(&mut self, targets: &mut [ScanTarget]) -> OrmResult<()> {
        if targets.len() != self.columns.len() {
            return Err(OrmError::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: targets.len(),
            });
        }
        let Some(row) = &self.current else {
            return Err(OrmError::driver("scan called without a current row"));
        };
        if row.len() != self.columns.len() {
            return Err(OrmError::driver(format!(
                "row has {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        for (target, value) in targets.iter_mut().zip(row) {
            target.store(value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_current_row_and_discards() {
        let mut cursor = VecCursor::new(
            ["id", "name"],
            vec![vec![Value::Int(1), Value::from("go")]],
        );
        assert_eq!(cursor.columns()[1].ordinal, 1);
        assert!(cursor.advance().unwrap());

        let mut targets = [ScanTarget::Discard, ScanTarget::capture()];
        cursor.scan(&mut targets).unwrap();
        assert_eq!(targets[0], ScanTarget::Discard);
        assert_eq!(targets[1].clone().into_value(), Some(Value::from("go")));

        assert!(!cursor.advance().unwrap());
    }

    #[test]
    fn scan_requires_matching_target_count() {
        let mut cursor = VecCursor::new(["a", "b"], vec![vec![Value::Null, Value::Null]]);
        cursor.advance().unwrap();
        let err = cursor.scan(&mut [ScanTarget::capture()]).unwrap_err();
        assert!(matches!(
            err,
            OrmError::ColumnCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn scan_before_advance_fails() {
        let mut cursor = VecCursor::new(["a"], vec![vec![Value::Null]]);
        let err = cursor.scan(&mut [ScanTarget::capture()]).unwrap_err();
        assert!(matches!(err, OrmError::Driver(_)));
    }
}
