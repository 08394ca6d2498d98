//! Registration-time schema descriptors.
//!
//! A type opts into mapping by implementing [`Mapped`] (usually via
//! `#[derive(Mapped)]`). [`Mapped::describe`] registers each field once with
//! typed accessors and one tag per namespace; [`Schema::build`] turns that
//! declaration into an ordered column table and validates it up front, so no
//! check is repeated on the per-row path.
//!
//! # Example
//! ```ignore
//! #[derive(Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Mapped for User {
//!     fn table_name() -> &'static str {
//!         "users"
//!     }
//!
//!     fn describe(fields: &mut FieldSet<Self>) {
//!         fields.field("id", |u| &u.id, |u| &mut u.id).tag("column:id;primary;auto_increment");
//!         fields.field("name", |u| &u.name, |u| &mut u.name).tag("column:name");
//!     }
//! }
//! ```

use crate::config::DEFAULT_NAMESPACE;
use crate::error::{MetadataError, OrmError, OrmResult};
use crate::tag::FieldTag;
use crate::value::{FieldKind, SqlType, Value};
use std::collections::HashMap;
use std::fmt;

/// A struct that can be mapped to and from table rows.
pub trait Mapped: Default + Send + Sync + 'static {
    /// Table backing this type.
    fn table_name() -> &'static str;

    /// Register every field that may take part in mapping.
    fn describe(fields: &mut FieldSet<Self>);
}

type Reader<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Writer<T> = Box<dyn Fn(&mut T, Value) -> Result<(), String> + Send + Sync>;
type Transfer<T> = Box<dyn Fn(&mut T, &mut T) + Send + Sync>;

/// One registered field and its tags.
pub struct FieldDecl<T> {
    name: &'static str,
    kind: FieldKind,
    nullable: bool,
    tags: Vec<(String, String)>,
    read: Reader<T>,
    write: Writer<T>,
    transfer: Transfer<T>,
}

impl<T> FieldDecl<T> {
    /// Attach a tag in the default namespace.
    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tag_in(DEFAULT_NAMESPACE, tag)
    }

    /// Attach a tag in `namespace`. A later tag replaces an earlier one.
    pub fn tag_in(&mut self, namespace: impl Into<String>, tag: impl Into<String>) -> &mut Self {
        let namespace = namespace.into();
        let tag = tag.into();
        match self.tags.iter_mut().find(|(ns, _)| *ns == namespace) {
            Some(entry) => entry.1 = tag,
            None => self.tags.push((namespace, tag)),
        }
        self
    }

    fn tag_for(&self, namespace: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, tag)| tag.as_str())
    }
}

/// Field declarations collected by [`Mapped::describe`].
pub struct FieldSet<T> {
    fields: Vec<FieldDecl<T>>,
}

impl<T: 'static> FieldSet<T> {
    fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Register a field through a getter pair.
    pub fn field<F: SqlType + 'static>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> &mut FieldDecl<T> {
        let index = self.fields.len();
        self.fields.push(FieldDecl {
            name,
            kind: F::KIND,
            nullable: F::NULLABLE,
            tags: Vec::new(),
            read: Box::new(move |target: &T| get(target).to_value()),
            write: Box::new(move |target: &mut T, value: Value| {
                *get_mut(target) = F::from_value(value)?;
                Ok(())
            }),
            transfer: Box::new(move |from: &mut T, to: &mut T| {
                std::mem::swap(get_mut(from), get_mut(to))
            }),
        });
        &mut self.fields[index]
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A mapped column of `T`.
pub struct ColumnMeta<T> {
    column: String,
    field: &'static str,
    field_index: usize,
    primary: bool,
    auto_increment: bool,
    type_hint: Option<String>,
    kind: FieldKind,
    nullable: bool,
    read: Reader<T>,
    write: Writer<T>,
    transfer: Transfer<T>,
}

impl<T> ColumnMeta<T> {
    /// Column name.
    pub fn name(&self) -> &str {
        &self.column
    }

    /// Rust field name.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Position of the field in declaration order.
    pub fn field_index(&self) -> usize {
        self.field_index
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn type_hint(&self) -> Option<&str> {
        self.type_hint.as_deref()
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Read the field as a bindable value.
    pub fn read(&self, target: &T) -> Value {
        (self.read)(target)
    }

    /// Convert `value` and store it in the field.
    pub fn write(&self, target: &mut T, value: Value) -> OrmResult<()> {
        (self.write)(target, value).map_err(|message| OrmError::decode(&self.column, message))
    }

    /// Swap this field between two instances.
    pub(crate) fn transfer(&self, from: &mut T, to: &mut T) {
        (self.transfer)(from, to)
    }
}

impl<T> fmt::Debug for ColumnMeta<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMeta")
            .field("column", &self.column)
            .field("field", &self.field)
            .field("primary", &self.primary)
            .field("auto_increment", &self.auto_increment)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Validated column table for `T`.
pub struct Schema<T> {
    table: &'static str,
    type_name: &'static str,
    columns: Vec<ColumnMeta<T>>,
    by_name: HashMap<String, usize>,
    auto_increment: Option<usize>,
}

impl<T: Mapped> Schema<T> {
    /// Describe `T` and keep the fields tagged in `namespace`.
    pub fn build(namespace: &str) -> OrmResult<Self> {
        let type_name = std::any::type_name::<T>();
        let table = T::table_name();
        if table.trim().is_empty() {
            return Err(MetadataError::EmptyTableName {
                type_name: type_name.to_string(),
            }
            .into());
        }

        let mut set = FieldSet::new();
        T::describe(&mut set);

        let mut columns = Vec::with_capacity(set.len());
        let mut by_name = HashMap::with_capacity(set.len());
        let mut auto_increment = None;

        for (field_index, decl) in set.fields.into_iter().enumerate() {
            let Some(raw) = decl.tag_for(namespace) else {
                continue;
            };
            let tag = FieldTag::parse(raw).map_err(|source| OrmError::TagParse {
                field: decl.name.to_string(),
                source,
            })?;
            let Some(column) = tag.column else {
                return Err(MetadataError::MissingColumn {
                    field: decl.name.to_string(),
                }
                .into());
            };
            if decl.kind == FieldKind::Pointer {
                return Err(MetadataError::PointerFieldNotAllowed {
                    field: decl.name.to_string(),
                }
                .into());
            }
            if by_name.contains_key(&column) {
                return Err(MetadataError::DuplicateColumn {
                    type_name: type_name.to_string(),
                    column,
                }
                .into());
            }
            if tag.auto_increment {
                if auto_increment.is_some() {
                    return Err(MetadataError::MultipleAutoIncrement {
                        table: table.to_string(),
                    }
                    .into());
                }
                auto_increment = Some(columns.len());
            }

            by_name.insert(column.clone(), columns.len());
            columns.push(ColumnMeta {
                column,
                field: decl.name,
                field_index,
                primary: tag.primary,
                auto_increment: tag.auto_increment,
                type_hint: tag.type_hint,
                kind: decl.kind,
                nullable: decl.nullable,
                read: decl.read,
                write: decl.write,
                transfer: decl.transfer,
            });
        }

        if columns.is_empty() {
            return Err(MetadataError::NoMappedFields {
                type_name: type_name.to_string(),
                namespace: namespace.to_string(),
            }
            .into());
        }

        Ok(Self {
            table,
            type_name,
            columns,
            by_name,
            auto_increment,
        })
    }
}

impl<T> Schema<T> {
    /// Table name.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Rust type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Mapped columns in declaration order.
    pub fn columns(&self) -> &[ColumnMeta<T>] {
        &self.columns
    }

    /// Index of `column` in [`Schema::columns`].
    pub fn position(&self, column: &str) -> Option<usize> {
        self.by_name.get(column).copied()
    }

    /// Look up a column by name.
    pub fn column(&self, column: &str) -> Option<&ColumnMeta<T>> {
        self.position(column).map(|i| &self.columns[i])
    }

    /// Columns flagged `primary`.
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnMeta<T>> {
        self.columns.iter().filter(|c| c.primary)
    }

    /// The `auto_increment` column, if any.
    pub fn auto_increment(&self) -> Option<&ColumnMeta<T>> {
        self.auto_increment.map(|i| &self.columns[i])
    }

    /// Fail with [`MetadataError::NoPrimaryKey`] unless a primary column exists.
    pub fn require_primary_key(&self) -> OrmResult<()> {
        if self.primary_keys().next().is_none() {
            return Err(MetadataError::NoPrimaryKey {
                table: self.table.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("table", &self.table)
            .field("type_name", &self.type_name)
            .field("columns", &self.columns)
            .finish()
    }
}
