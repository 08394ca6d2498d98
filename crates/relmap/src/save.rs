//! INSERT / UPDATE derivation from mapped instances.

use crate::config::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::registry::Registry;
use crate::schema::{Mapped, Schema};
use crate::sql::{BuiltQuery, SqlWriter};
use crate::value::{FieldKind, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Write-back handle for a generated key.
struct KeyTarget<'a> {
    kind: FieldKind,
    write: Box<dyn FnMut(Value) -> OrmResult<()> + Send + 'a>,
}

/// A derived save statement.
///
/// For inserts it may hold an exclusive borrow of the instance so the
/// generated key can be written back after execution.
pub struct SaveQuery<'a> {
    /// Statement text.
    pub sql: String,
    /// Inserted or assigned columns, in argument order.
    pub columns: Vec<String>,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Whether the statement returns the generated key as a row.
    pub returns_key: bool,
    generated_key: Option<KeyTarget<'a>>,
}

impl<'a> SaveQuery<'a> {
    fn new(sql: String, columns: Vec<String>, args: Vec<Value>) -> Self {
        Self {
            sql,
            columns,
            args,
            returns_key: false,
            generated_key: None,
        }
    }

    /// Whether a field will receive the generated key.
    pub fn has_generated_key(&self) -> bool {
        self.generated_key.is_some()
    }

    /// Write a generated key into the auto-increment field.
    ///
    /// Only fields declared as 64-bit signed or unsigned integers are
    /// written; returns whether the field was updated.
    pub fn write_generated_key(&mut self, id: i64) -> OrmResult<bool> {
        let Some(target) = self.generated_key.as_mut() else {
            return Ok(false);
        };
        if !target.kind.is_integer64() {
            return Ok(false);
        }
        let value = match target.kind {
            FieldKind::UInt(_) => match u64::try_from(id) {
                Ok(id) => Value::UInt(id),
                Err(_) => return Ok(false),
            },
            _ => Value::Int(id),
        };
        (target.write)(value)?;
        Ok(true)
    }

    /// Statement text and arguments, without the write-back handle.
    pub fn to_built(&self) -> BuiltQuery {
        BuiltQuery::new(self.sql.clone(), self.args.clone())
    }
}

impl fmt::Debug for SaveQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveQuery")
            .field("sql", &self.sql)
            .field("columns", &self.columns)
            .field("args", &self.args)
            .field("returns_key", &self.returns_key)
            .field("generated_key", &self.generated_key.as_ref().map(|k| k.kind))
            .finish()
    }
}

fn insert_sql<T>(schema: &Schema<T>, dialect: Dialect, columns: &[String], args: Vec<Value>) -> String {
    let mut w = SqlWriter::new(dialect);
    w.push("INSERT INTO ").push_ident(schema.table());
    if columns.is_empty() {
        match dialect {
            Dialect::MySql => w.push(" () VALUES ()"),
            Dialect::Postgres => w.push(" DEFAULT VALUES"),
        };
    } else {
        w.push(" (")
            .push_ident_list(columns.iter().map(String::as_str))
            .push(") VALUES (")
            .push_bind_list(args)
            .push(")");
    }
    if let Some(key) = schema.auto_increment()
        && dialect.returns_generated_key()
    {
        w.push(" RETURNING ").push_ident(key.name());
    }
    w.finish().sql
}

impl Registry {
    /// Build `INSERT INTO <table> (...) VALUES (...)` for `instance`.
    ///
    /// The auto-increment column is left out of the column list and becomes
    /// the generated-key target. Fails with `NoPrimaryKey` when `T` declares
    /// no primary column.
    pub fn query_for_insert<'a, T: Mapped>(&self, instance: &'a mut T) -> OrmResult<SaveQuery<'a>> {
        let schema = self.schema::<T>()?;
        schema.require_primary_key()?;

        let mut columns = Vec::with_capacity(schema.columns().len());
        let mut args = Vec::with_capacity(schema.columns().len());
        for column in schema.columns().iter().filter(|c| !c.is_auto_increment()) {
            columns.push(column.name().to_string());
            args.push(column.read(instance));
        }

        let dialect = self.dialect();
        let sql = insert_sql(&schema, dialect, &columns, args.clone());
        let mut query = SaveQuery::new(sql, columns, args);

        if let Some(index) = schema.auto_increment().and_then(|c| schema.position(c.name())) {
            query.returns_key = dialect.returns_generated_key();
            let kind = schema.columns()[index].kind();
            let schema = Arc::clone(&schema);
            query.generated_key = Some(KeyTarget {
                kind,
                write: Box::new(move |value: Value| schema.columns()[index].write(instance, value)),
            });
        }
        Ok(query)
    }

    /// Build `UPDATE <table> SET ... WHERE ...` from raw column values.
    ///
    /// SET assignments are rendered in lexicographic column order. The table
    /// and the value map must be non-empty and the condition must render to
    /// a non-empty fragment.
    pub fn query_for_update<I, K, V>(
        &self,
        table: &str,
        values: I,
        condition: &Expr,
    ) -> OrmResult<SaveQuery<'static>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        if table.trim().is_empty() {
            return Err(OrmError::validation("update requires a table name"));
        }
        let values: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if values.is_empty() {
            return Err(OrmError::validation(format!(
                "update of '{table}' has no values to set"
            )));
        }
        self.render_update(table, values.into_iter().collect(), condition)
    }

    /// Build an UPDATE for `instance` keyed by its primary columns.
    ///
    /// Every non-primary, non-auto-increment column is SET.
    pub fn query_for_update_by_key<T: Mapped>(&self, instance: &T) -> OrmResult<SaveQuery<'static>> {
        let schema = self.schema::<T>()?;
        schema.require_primary_key()?;

        let assignments: Vec<(String, Value)> = schema
            .columns()
            .iter()
            .filter(|c| !c.is_primary() && !c.is_auto_increment())
            .map(|c| (c.name().to_string(), c.read(instance)))
            .collect();
        if assignments.is_empty() {
            return Err(OrmError::validation(format!(
                "table '{}' has no updatable columns",
                schema.table()
            )));
        }

        let key = Expr::all(
            schema
                .primary_keys()
                .map(|c| Expr::eq(c.name(), c.read(instance)))
                .collect(),
        );
        self.render_update(schema.table(), assignments, &key)
    }

    fn render_update(
        &self,
        table: &str,
        assignments: Vec<(String, Value)>,
        condition: &Expr,
    ) -> OrmResult<SaveQuery<'static>> {
        let mut w = SqlWriter::new(self.dialect());
        w.push("UPDATE ").push_ident(table).push(" SET ");

        let mut columns = Vec::with_capacity(assignments.len());
        for (i, (column, value)) in assignments.into_iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_ident(&column).push(" = ").push_bind(value);
            columns.push(column);
        }

        w.push(" WHERE ");
        condition.render(&mut w)?;
        let built = w.finish().ensure_safe()?;
        Ok(SaveQuery::new(built.sql, columns, built.args))
    }
}
