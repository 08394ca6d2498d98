//! Composable WHERE expressions.
//!
//! [`Expr`] is an immutable tree: column leaves carry an [`Op`], raw leaves
//! carry a fragment with `?` placeholders, and `And`/`Or`/`Not` compose them.
//! Nothing is checked at construction time; [`Expr::build`] renders the tree
//! and rejects any empty fragment with [`OrmError::DangerousQuery`].
//!
//! [`Conditions`] is the key/value form: an unordered column -> operator map
//! that always renders in lexicographic column order.
//!
//! # Example
//! ```ignore
//! let where_ = Conditions::new()
//!     .value("id", 1)
//!     .op("age", Op::between(0, 20));
//! let q = Expr::from(where_).build(Dialect::MySql)?;
//! assert_eq!(q.sql, "(`age` BETWEEN ? AND ? AND `id` = ?)");
//! ```

use crate::config::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::sql::{BuiltQuery, SqlWriter, ensure_fragment};
use crate::value::Value;
use std::collections::HashMap;

/// Operator applied to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Like(Value),
    NotLike(Value),
    IsNull,
    IsNotNull,
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Between(Value, Value),
    NotBetween(Value, Value),
}

impl Op {
    pub fn eq(value: impl Into<Value>) -> Self {
        Op::Eq(value.into())
    }

    pub fn ne(value: impl Into<Value>) -> Self {
        Op::Ne(value.into())
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Op::Gt(value.into())
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Op::Gte(value.into())
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Op::Lt(value.into())
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Op::Lte(value.into())
    }

    pub fn like(pattern: impl Into<Value>) -> Self {
        Op::Like(pattern.into())
    }

    pub fn not_like(pattern: impl Into<Value>) -> Self {
        Op::NotLike(pattern.into())
    }

    pub fn is_null() -> Self {
        Op::IsNull
    }

    pub fn is_not_null() -> Self {
        Op::IsNotNull
    }

    /// `IN (...)`. An empty list is rejected when rendered.
    pub fn in_list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Op::In(values.into_iter().map(Into::into).collect())
    }

    /// `NOT IN (...)`. An empty list is rejected when rendered.
    pub fn not_in<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Op::NotIn(values.into_iter().map(Into::into).collect())
    }

    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::Between(from.into(), to.into())
    }

    pub fn not_between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::NotBetween(from.into(), to.into())
    }

    fn render(&self, column: &str, w: &mut SqlWriter) -> OrmResult<()> {
        w.push_ident(column);
        match self {
            Op::Eq(v) => compare(w, "=", v),
            Op::Ne(v) => compare(w, "<>", v),
            Op::Gt(v) => compare(w, ">", v),
            Op::Gte(v) => compare(w, ">=", v),
            Op::Lt(v) => compare(w, "<", v),
            Op::Lte(v) => compare(w, "<=", v),
            Op::Like(v) => compare(w, "LIKE", v),
            Op::NotLike(v) => compare(w, "NOT LIKE", v),
            Op::IsNull => {
                w.push(" IS NULL");
            }
            Op::IsNotNull => {
                w.push(" IS NOT NULL");
            }
            Op::In(values) | Op::NotIn(values) => {
                let keyword = if matches!(self, Op::In(_)) { "IN" } else { "NOT IN" };
                if values.is_empty() {
                    return Err(OrmError::dangerous(format!(
                        "empty {keyword} list for column '{column}'"
                    )));
                }
                w.push(" ")
                    .push(keyword)
                    .push(" (")
                    .push_bind_list(values.iter().cloned())
                    .push(")");
            }
            Op::Between(from, to) | Op::NotBetween(from, to) => {
                let keyword = if matches!(self, Op::Between(..)) {
                    " BETWEEN "
                } else {
                    " NOT BETWEEN "
                };
                w.push(keyword)
                    .push_bind(from.clone())
                    .push(" AND ")
                    .push_bind(to.clone());
            }
        }
        Ok(())
    }
}

fn compare(w: &mut SqlWriter, op: &str, value: &Value) {
    w.push(" ").push(op).push(" ").push_bind(value.clone());
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `column op ...`
    Column { column: String, op: Op },
    /// Raw fragment with `?` placeholders bound to `args` in order.
    Raw { sql: String, args: Vec<Value> },
    /// All children must hold.
    And(Vec<Expr>),
    /// At least one child must hold.
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Bind `op` to `column`.
    pub fn col(column: impl Into<String>, op: Op) -> Self {
        Expr::Column {
            column: column.into(),
            op,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::col(column, Op::eq(value))
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::col(column, Op::ne(value))
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::col(column, Op::gt(value))
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::col(column, Op::gte(value))
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::col(column, Op::lt(value))
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::col(column, Op::lte(value))
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::col(column, Op::like(pattern))
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::col(column, Op::not_like(pattern))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::col(column, Op::IsNull)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::col(column, Op::IsNotNull)
    }

    pub fn in_list<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::col(column, Op::in_list(values))
    }

    pub fn not_in<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::col(column, Op::not_in(values))
    }

    pub fn between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::col(column, Op::between(from, to))
    }

    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::col(column, Op::not_between(from, to))
    }

    /// Raw fragment without arguments.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::raw_with(sql, Vec::new())
    }

    /// Raw fragment with `?` placeholders.
    ///
    /// # Example
    /// ```ignore
    /// Expr::raw_with("a = ? OR b = ?", vec![1.into(), 2.into()])
    /// ```
    pub fn raw_with(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Expr::Raw {
            sql: sql.into(),
            args,
        }
    }

    pub fn all(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    pub fn any(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// Conjunction with `other`, flattening into an existing AND group.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut exprs) => {
                exprs.push(other);
                Expr::And(exprs)
            }
            this => Expr::And(vec![this, other]),
        }
    }

    /// Disjunction with `other`, flattening into an existing OR group.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut exprs) => {
                exprs.push(other);
                Expr::Or(exprs)
            }
            this => Expr::Or(vec![this, other]),
        }
    }

    /// Render into a standalone statement fragment.
    pub fn build(&self, dialect: Dialect) -> OrmResult<BuiltQuery> {
        let mut w = SqlWriter::new(dialect);
        self.render(&mut w)?;
        w.finish().ensure_safe()
    }

    /// Append this expression to `w`.
    pub fn render(&self, w: &mut SqlWriter) -> OrmResult<()> {
        match self {
            Expr::Column { column, op } => {
                ensure_fragment(column, "column name")?;
                op.render(column, w)
            }
            Expr::Raw { sql, args } => {
                ensure_fragment(sql, "raw fragment")?;
                w.push_template(sql, args)?;
                Ok(())
            }
            Expr::And(exprs) => render_group(w, exprs, " AND ", "AND"),
            Expr::Or(exprs) => render_group(w, exprs, " OR ", "OR"),
            Expr::Not(inner) => {
                w.push("NOT ");
                if matches!(**inner, Expr::And(_) | Expr::Or(_)) {
                    inner.render(w)
                } else {
                    w.push("(");
                    inner.render(w)?;
                    w.push(")");
                    Ok(())
                }
            }
        }
    }
}

fn render_group(w: &mut SqlWriter, exprs: &[Expr], sep: &str, name: &str) -> OrmResult<()> {
    if exprs.is_empty() {
        return Err(OrmError::dangerous(format!("empty {name} group")));
    }
    w.push("(");
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            w.push(sep);
        }
        // Raw fragments may carry their own AND/OR; keep them atomic.
        if matches!(expr, Expr::Raw { .. }) {
            w.push("(");
            expr.render(w)?;
            w.push(")");
        } else {
            expr.render(w)?;
        }
    }
    w.push(")");
    Ok(())
}

/// Unordered column -> operator conditions joined by AND.
///
/// Rendering sorts columns lexicographically, so the SQL text and argument
/// order never depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    entries: HashMap<String, Op>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = value`
    pub fn value(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(column, Op::eq(value))
    }

    /// `column <op>`; replaces an earlier entry for the same column.
    pub fn op(mut self, column: impl Into<String>, op: Op) -> Self {
        self.insert(column, op);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, op: Op) -> Option<Op> {
        self.entries.insert(column.into(), op)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in rendering order.
    pub fn sorted(&self) -> Vec<(&str, &Op)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn build(&self, dialect: Dialect) -> OrmResult<BuiltQuery> {
        Expr::from(self.clone()).build(dialect)
    }
}

impl<K: Into<String>> FromIterator<(K, Op)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, Op)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, op)| (k.into(), op)).collect(),
        }
    }
}

impl From<Conditions> for Expr {
    fn from(conditions: Conditions) -> Self {
        let mut entries: Vec<(String, Op)> = conditions.entries.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        Expr::And(
            entries
                .into_iter()
                .map(|(column, op)| Expr::Column { column, op })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests;
