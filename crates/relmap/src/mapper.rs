//! Row and collection mappers.
//!
//! Each row is scanned in one call, converted into a fresh staging instance,
//! and only then moved into the caller's destination. A conversion failure
//! therefore never leaves a destination half written.

use crate::cursor::{ColumnDescriptor, Cursor, ScanTarget};
use crate::error::{OrmError, OrmResult};
use crate::registry::Registry;
use crate::schema::{Mapped, Schema};

/// Column position in the result set -> column index in the schema.
pub(crate) type RowPlan = Vec<Option<usize>>;

pub(crate) fn plan_row<T>(schema: &Schema<T>, columns: &[ColumnDescriptor]) -> RowPlan {
    columns.iter().map(|c| schema.position(&c.name)).collect()
}

pub(crate) fn scan_targets<I>(slots: I) -> Vec<ScanTarget>
where
    I: IntoIterator<Item = bool>,
{
    slots
        .into_iter()
        .map(|mapped| {
            if mapped {
                ScanTarget::capture()
            } else {
                ScanTarget::Discard
            }
        })
        .collect()
}

/// Scan the current row into a new `T`, returning it with the schema
/// columns it touched.
fn stage_row<T, C>(schema: &Schema<T>, plan: &RowPlan, cursor: &mut C) -> OrmResult<(T, Vec<bool>)>
where
    T: Mapped,
    C: Cursor + ?Sized,
{
    let mut targets = scan_targets(plan.iter().map(Option::is_some));
    cursor.scan(&mut targets)?;

    let mut staged = T::default();
    let mut touched = vec![false; schema.columns().len()];
    for (slot, target) in plan.iter().zip(targets) {
        if let (Some(index), Some(value)) = (slot, target.into_value()) {
            schema.columns()[*index].write(&mut staged, value)?;
            touched[*index] = true;
        }
    }
    Ok((staged, touched))
}

/// Move the touched fields of `staged` into `dest`.
pub(crate) fn commit_fields<T>(schema: &Schema<T>, staged: &mut T, dest: &mut T, touched: &[bool]) {
    for (column, _) in schema
        .columns()
        .iter()
        .zip(touched)
        .filter(|(_, touched)| **touched)
    {
        column.transfer(staged, dest);
    }
}

impl Registry {
    /// Advance once and map that row into `dest`.
    ///
    /// Columns with no matching field are scanned into a discard sink.
    /// Fields of `dest` whose column is absent from the row keep their value.
    /// An exhausted cursor yields [`OrmError::RecordNotFound`].
    pub fn map_row<T, C>(&self, cursor: &mut C, dest: &mut T) -> OrmResult<()>
    where
        T: Mapped,
        C: Cursor + ?Sized,
    {
        let schema = self.schema::<T>()?;
        if !cursor.advance()? {
            return Err(OrmError::RecordNotFound);
        }
        let plan = plan_row(&schema, cursor.columns());
        let (mut staged, touched) = stage_row(&schema, &plan, cursor)?;
        commit_fields(&schema, &mut staged, dest, &touched);
        Ok(())
    }

    /// Like [`Registry::map_row`] but an exhausted cursor yields `None`.
    pub fn map_optional<T, C>(&self, cursor: &mut C) -> OrmResult<Option<T>>
    where
        T: Mapped,
        C: Cursor + ?Sized,
    {
        let schema = self.schema::<T>()?;
        if !cursor.advance()? {
            return Ok(None);
        }
        let plan = plan_row(&schema, cursor.columns());
        let (staged, _) = stage_row(&schema, &plan, cursor)?;
        Ok(Some(staged))
    }

    /// Map every remaining row into a new `T`.
    ///
    /// Zero rows is [`OrmError::RecordNotFound`], not an empty vector.
    pub fn map_rows<T, C>(&self, cursor: &mut C) -> OrmResult<Vec<T>>
    where
        T: Mapped,
        C: Cursor + ?Sized,
    {
        let mut rows = Vec::new();
        self.map_rows_into(cursor, &mut rows)?;
        Ok(rows)
    }

    /// Append every remaining row to `dest`.
    ///
    /// Rows already in `dest` are kept. Fails with
    /// [`OrmError::RecordNotFound`] when the cursor produced no row. `dest`
    /// is extended only after every row mapped.
    pub fn map_rows_into<T, C>(&self, cursor: &mut C, dest: &mut Vec<T>) -> OrmResult<()>
    where
        T: Mapped,
        C: Cursor + ?Sized,
    {
        let schema = self.schema::<T>()?;
        let plan = plan_row(&schema, cursor.columns());
        let mut rows = Vec::new();
        while cursor.advance()? {
            let (staged, _) = stage_row(&schema, &plan, cursor)?;
            rows.push(staged);
        }
        if rows.is_empty() {
            return Err(OrmError::RecordNotFound);
        }
        dest.extend(rows);
        Ok(())
    }
}
