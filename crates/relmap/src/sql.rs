//! Parameterized SQL text assembly.
//!
//! [`SqlWriter`] stores SQL text and arguments side by side and emits the
//! dialect's placeholders as values are bound, so placeholder order always
//! matches argument order.

use crate::config::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// A finished statement: SQL text plus positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

impl BuiltQuery {
    /// Create a new built query.
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Fail with [`OrmError::DangerousQuery`] when the SQL is empty or whitespace.
    pub fn ensure_safe(self) -> OrmResult<Self> {
        ensure_fragment(&self.sql, "statement")?;
        Ok(self)
    }
}

/// Reject an empty or whitespace-only SQL fragment.
pub fn ensure_fragment(sql: &str, what: &str) -> OrmResult<()> {
    if sql.trim().is_empty() {
        return Err(OrmError::dangerous(format!("empty {what}")));
    }
    Ok(())
}

/// Number of `?` outside single-quoted literals. A doubled `''` escape
/// toggles twice and stays inside the literal.
fn placeholder_count(template: &str) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for ch in template.chars() {
        match ch {
            '\'' => quoted = !quoted,
            '?' if !quoted => count += 1,
            _ => {}
        }
    }
    count
}

/// Incremental SQL builder bound to one dialect.
#[derive(Debug, Clone)]
pub struct SqlWriter {
    dialect: Dialect,
    sql: String,
    args: Vec<Value>,
}

impl SqlWriter {
    /// Start an empty statement.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(128),
            args: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Append raw SQL text.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a quoted identifier.
    pub fn push_ident(&mut self, ident: &str) -> &mut Self {
        let quoted = self.dialect.quote_ident(ident);
        self.sql.push_str(&quoted);
        self
    }

    /// Append a comma separated list of quoted identifiers.
    pub fn push_ident_list<'a>(&mut self, idents: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for (i, ident) in idents.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_ident(ident);
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: Value) -> &mut Self {
        self.args.push(value);
        let placeholder = self.dialect.placeholder(self.args.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// Append a comma separated list of placeholders.
    pub fn push_bind_list(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_bind(value);
        }
        self
    }

    /// Append a fragment containing `?` placeholders, binding `args` in order.
    ///
    /// A `?` inside a single-quoted literal is copied as text. Every other
    /// `?` is a placeholder, so Postgres' jsonb `?` operators must be written
    /// as their function form (`jsonb_exists`). The number of placeholders
    /// must equal the number of arguments.
    pub fn push_template(&mut self, template: &str, args: &[Value]) -> OrmResult<&mut Self> {
        let expected = placeholder_count(template);
        if expected != args.len() {
            return Err(OrmError::validation(format!(
                "fragment '{template}' has {expected} placeholders but {} arguments",
                args.len()
            )));
        }

        let mut args = args.iter();
        let mut quoted = false;
        for ch in template.chars() {
            if ch == '\'' {
                quoted = !quoted;
            }
            if ch != '?' || quoted {
                self.sql.push(ch);
            } else if let Some(arg) = args.next() {
                self.push_bind(arg.clone());
            }
        }
        Ok(self)
    }

    /// Current SQL text.
    pub fn as_str(&self) -> &str {
        &self.sql
    }

    /// Number of bound arguments so far.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Finish the statement.
    pub fn finish(self) -> BuiltQuery {
        BuiltQuery {
            sql: self.sql,
            args: self.args,
        }
    }
}
