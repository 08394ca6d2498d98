//! SELECT and DELETE statement builders.

use crate::config::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::schema::Schema;
use crate::sql::{BuiltQuery, SqlWriter, ensure_fragment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    Asc,
    Desc,
}

/// SELECT builder.
///
/// # Example
/// ```ignore
/// let q = SelectQuery::new("users")
///     .columns(["id", "name"])
///     .filter(Expr::gt("age", 18))
///     .order_by_desc("id")
///     .limit(10)
///     .build(Dialect::MySql)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    joins: Vec<(&'static str, String, String)>,
    filter: Option<Expr>,
    order: Vec<(String, SortOrder)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    /// `SELECT * FROM table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            filter: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Select every mapped column of a schema, in declaration order.
    pub fn of<T>(schema: &Schema<T>) -> Self {
        Self::new(schema.table()).columns(schema.columns().iter().map(|c| c.name().to_string()))
    }

    /// Replace the column list. An empty list selects `*`.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// `INNER JOIN table ON <on>`; `on` is raw SQL.
    pub fn inner_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(("INNER JOIN", table.into(), on.into()));
        self
    }

    /// `LEFT JOIN table ON <on>`; `on` is raw SQL.
    pub fn left_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(("LEFT JOIN", table.into(), on.into()));
        self
    }

    /// Add a WHERE condition, ANDed with any earlier one.
    pub fn filter(mut self, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), SortOrder::Asc));
        self
    }

    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), SortOrder::Desc));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn build(&self, dialect: Dialect) -> OrmResult<BuiltQuery> {
        ensure_fragment(&self.table, "table name")?;

        let mut w = SqlWriter::new(dialect);
        w.push("SELECT ");
        if self.columns.is_empty() {
            w.push("*");
        } else {
            w.push_ident_list(self.columns.iter().map(String::as_str));
        }
        w.push(" FROM ").push_ident(&self.table);

        for (kind, table, on) in &self.joins {
            ensure_fragment(on, "join condition")?;
            w.push(" ")
                .push(kind)
                .push(" ")
                .push_ident(table)
                .push(" ON ")
                .push(on);
        }

        if let Some(filter) = &self.filter {
            w.push(" WHERE ");
            filter.render(&mut w)?;
        }

        for (i, (column, order)) in self.order.iter().enumerate() {
            w.push(if i == 0 { " ORDER BY " } else { ", " });
            w.push_ident(column);
            if *order == SortOrder::Desc {
                w.push(" DESC");
            }
        }

        if let Some(limit) = self.limit {
            w.push(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            w.push(&format!(" OFFSET {offset}"));
        }
        Ok(w.finish())
    }
}

/// DELETE builder. Refuses to build without a WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    table: String,
    filter: Option<Expr>,
}

impl DeleteQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    /// Add a WHERE condition, ANDed with any earlier one.
    pub fn filter(mut self, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn build(&self, dialect: Dialect) -> OrmResult<BuiltQuery> {
        ensure_fragment(&self.table, "table name")?;
        let Some(filter) = &self.filter else {
            return Err(OrmError::dangerous(format!(
                "DELETE FROM {} without a WHERE condition",
                self.table
            )));
        };

        let mut w = SqlWriter::new(dialect);
        w.push("DELETE FROM ").push_ident(&self.table).push(" WHERE ");
        filter.render(&mut w)?;
        Ok(w.finish())
    }
}
