//! Serial (join) mapping: one joined row split into several destinations.
//!
//! The caller supplies one head column per destination through a splitter
//! `segment index -> head column name`. Columns are walked left to right;
//! segment `i` starts at a column named `splitter(i)` and runs until the
//! next column named `splitter(i + 1)`, or the end of the row.
//!
//! ```ignore
//! let mut user = User::default();
//! let mut group: Option<GroupUser> = None;
//! registry.map_serial(
//!     &mut cursor,
//!     &serial::heads(&["id", "id"]),
//!     &mut [&mut serial::required(&mut user), &mut serial::optional(&mut group)],
//! )?;
//! ```

use crate::cursor::{ColumnDescriptor, Cursor};
use crate::error::{OrmError, OrmResult};
use crate::mapper::{commit_fields, scan_targets};
use crate::registry::Registry;
use crate::schema::{Mapped, Schema};
use crate::value::Value;
use std::ops::Range;
use std::sync::Arc;

/// One destination of a serial mapping.
///
/// Implemented by [`Required`] and [`Optional`]; build them with
/// [`required`] and [`optional`].
pub trait SerialDest {
    /// Destination type name, for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Whether an all-NULL segment means "absent" rather than an error.
    fn is_optional(&self) -> bool;

    /// Resolve the destination schema. Called before any row is read.
    fn resolve(&mut self, registry: &Registry) -> OrmResult<()>;

    /// Schema index of the field mapped to `column`.
    fn field_for(&self, column: &str) -> OrmResult<Option<usize>>;

    /// Convert the segment values into a staged instance.
    fn stage(&mut self, values: Vec<(usize, Value)>) -> OrmResult<()>;

    /// Record that the segment carried no data.
    fn set_absent(&mut self);

    /// Move the staged result into the destination.
    fn commit(&mut self);
}

enum Staged<T> {
    Pending,
    Absent,
    Present(T, Vec<bool>),
}

struct Slot<T> {
    schema: Option<Arc<Schema<T>>>,
    staged: Staged<T>,
}

impl<T: Mapped> Slot<T> {
    fn new() -> Self {
        Self {
            schema: None,
            staged: Staged::Pending,
        }
    }

    fn schema(&self) -> OrmResult<&Schema<T>> {
        self.schema.as_deref().ok_or_else(|| {
            OrmError::InvalidDestination(format!(
                "serial destination {} used before its schema was resolved",
                std::any::type_name::<T>()
            ))
        })
    }

    fn resolve(&mut self, registry: &Registry) -> OrmResult<()> {
        self.schema = Some(registry.schema::<T>()?);
        self.staged = Staged::Pending;
        Ok(())
    }

    fn field_for(&self, column: &str) -> OrmResult<Option<usize>> {
        Ok(self.schema()?.position(column))
    }

    fn stage(&mut self, values: Vec<(usize, Value)>) -> OrmResult<()> {
        let schema = self.schema()?;
        let mut staged = T::default();
        let mut touched = vec![false; schema.columns().len()];
        for (index, value) in values {
            schema.columns()[index].write(&mut staged, value)?;
            touched[index] = true;
        }
        self.staged = Staged::Present(staged, touched);
        Ok(())
    }

    fn take(&mut self) -> Staged<T> {
        std::mem::replace(&mut self.staged, Staged::Pending)
    }
}

/// A destination that must be present in every row.
pub struct Required<'a, T> {
    dest: &'a mut T,
    slot: Slot<T>,
}

/// A destination that may be absent, as produced by an outer join.
pub struct Optional<'a, T> {
    dest: &'a mut Option<T>,
    slot: Slot<T>,
}

/// Wrap a destination that must be present.
pub fn required<T: Mapped>(dest: &mut T) -> Required<'_, T> {
    Required {
        dest,
        slot: Slot::new(),
    }
}

/// Wrap a destination that becomes `None` when its segment is entirely NULL.
pub fn optional<T: Mapped>(dest: &mut Option<T>) -> Optional<'_, T> {
    Optional {
        dest,
        slot: Slot::new(),
    }
}

/// Splitter returning `heads[i]`, or an empty name past the end.
pub fn heads<'a>(heads: &'a [&'a str]) -> impl Fn(usize) -> String + 'a {
    move |segment| heads.get(segment).copied().unwrap_or_default().to_string()
}

impl<T: Mapped> SerialDest for Required<'_, T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn is_optional(&self) -> bool {
        false
    }

    fn resolve(&mut self, registry: &Registry) -> OrmResult<()> {
        self.slot.resolve(registry)
    }

    fn field_for(&self, column: &str) -> OrmResult<Option<usize>> {
        self.slot.field_for(column)
    }

    fn stage(&mut self, values: Vec<(usize, Value)>) -> OrmResult<()> {
        self.slot.stage(values)
    }

    fn set_absent(&mut self) {
        self.slot.staged = Staged::Absent;
    }

    fn commit(&mut self) {
        let Some(schema) = self.slot.schema.clone() else {
            return;
        };
        if let Staged::Present(mut staged, touched) = self.slot.take() {
            commit_fields(&schema, &mut staged, self.dest, &touched);
        }
    }
}

impl<T: Mapped> SerialDest for Optional<'_, T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn resolve(&mut self, registry: &Registry) -> OrmResult<()> {
        self.slot.resolve(registry)
    }

    fn field_for(&self, column: &str) -> OrmResult<Option<usize>> {
        self.slot.field_for(column)
    }

    fn stage(&mut self, values: Vec<(usize, Value)>) -> OrmResult<()> {
        self.slot.stage(values)
    }

    fn set_absent(&mut self) {
        self.slot.staged = Staged::Absent;
    }

    fn commit(&mut self) {
        let Some(schema) = self.slot.schema.clone() else {
            return;
        };
        match self.slot.take() {
            Staged::Pending => {}
            Staged::Absent => *self.dest = None,
            Staged::Present(mut staged, touched) => match self.dest.as_mut() {
                Some(existing) => commit_fields(&schema, &mut staged, existing, &touched),
                None => *self.dest = Some(staged),
            },
        }
    }
}

/// Split `columns` into one contiguous range per head.
fn split_segments(columns: &[ColumnDescriptor], heads: &[String]) -> OrmResult<Vec<Range<usize>>> {
    let mut segments = Vec::with_capacity(heads.len());
    let mut c = 0;

    for (segment, expected) in heads.iter().enumerate() {
        let last = segment + 1 == heads.len();
        let Some(column) = columns.get(c) else {
            // Only the final destination may be starved of columns.
            if last && segment > 0 {
                segments.push(c..c);
                break;
            }
            return Err(OrmError::HeadColumnMismatch {
                segment,
                expected: expected.clone(),
                actual: None,
            });
        };
        if column.name != *expected {
            return Err(OrmError::HeadColumnMismatch {
                segment,
                expected: expected.clone(),
                actual: Some(column.name.clone()),
            });
        }

        let start = c;
        c += 1;
        let next = heads.get(segment + 1);
        while c < columns.len() && next != Some(&columns[c].name) {
            c += 1;
        }
        segments.push(start..c);
    }
    Ok(segments)
}

impl Registry {
    /// Map the next row into several destinations, one segment each.
    ///
    /// Every destination schema is resolved before the row is read, the row
    /// is scanned in one call, and destinations are written only after all
    /// segments converted successfully.
    ///
    /// A segment whose mapped columns are all NULL makes an optional
    /// destination `None` and fails a required one with
    /// [`OrmError::RequiredSegmentNull`]. Unmapped columns of a segment are
    /// never inspected, so a segment with no mapped column at all (including
    /// an empty final segment) is treated the same way.
    pub fn map_serial<C>(
        &self,
        cursor: &mut C,
        splitter: &dyn Fn(usize) -> String,
        dests: &mut [&mut dyn SerialDest],
    ) -> OrmResult<()>
    where
        C: Cursor + ?Sized,
    {
        if dests.is_empty() {
            return Err(OrmError::EmptyDestinationList);
        }
        for dest in dests.iter_mut() {
            dest.resolve(self)?;
        }
        if !cursor.advance()? {
            return Err(OrmError::RecordNotFound);
        }

        let heads: Vec<String> = (0..dests.len()).map(splitter).collect();
        let segments = split_segments(cursor.columns(), &heads)?;

        // Result-set column -> (destination, schema index)
        let mut plan: Vec<Option<(usize, usize)>> = vec![None; cursor.columns().len()];
        for (d, range) in segments.iter().enumerate() {
            for c in range.clone() {
                if let Some(field) = dests[d].field_for(&cursor.columns()[c].name)? {
                    plan[c] = Some((d, field));
                }
            }
        }

        let mut targets = scan_targets(plan.iter().map(Option::is_some));
        cursor.scan(&mut targets)?;

        let mut values: Vec<Vec<(usize, Value)>> = (0..dests.len()).map(|_| Vec::new()).collect();
        for (slot, target) in plan.into_iter().zip(targets) {
            if let (Some((d, field)), Some(value)) = (slot, target.into_value()) {
                values[d].push((field, value));
            }
        }

        for (segment, (dest, values)) in dests.iter_mut().zip(values).enumerate() {
            // A segment without mapped values counts as entirely NULL.
            if values.iter().all(|(_, v)| v.is_null()) {
                if !dest.is_optional() {
                    return Err(OrmError::RequiredSegmentNull {
                        segment,
                        type_name: dest.type_name().to_string(),
                    });
                }
                dest.set_absent();
                continue;
            }
            dest.stage(values)?;
        }

        for dest in dests.iter_mut() {
            dest.commit();
        }
        Ok(())
    }
}
