//! Async statement executor contract.

use crate::cursor::Cursor;
use crate::error::OrmResult;
use crate::value::Value;
use std::future::Future;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Key generated by an insert, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// Something that runs parameterized SQL: a connection, a transaction, or a
/// test double.
///
/// Cancellation is the caller's concern: dropping the returned future
/// abandons the statement.
pub trait Executor: Send + Sync {
    type Cursor: Cursor + Send;

    /// Run a read statement.
    fn query(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Self::Cursor>> + Send;

    /// Run a write statement.
    fn execute(&self, sql: &str, args: &[Value]) -> impl Future<Output = OrmResult<ExecResult>> + Send;

    /// Run an insert. When `returns_key` is set the statement ends with a
    /// `RETURNING` clause and the key is read from the first row.
    ///
    /// The default implementation ignores `returns_key` and calls
    /// [`Executor::execute`].
    fn insert(
        &self,
        sql: &str,
        args: &[Value],
        returns_key: bool,
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        let _ = returns_key;
        self.execute(sql, args)
    }
}

impl<E: Executor> Executor for &E {
    type Cursor = E::Cursor;

    fn query(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Self::Cursor>> + Send {
        (**self).query(sql, args)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        (**self).execute(sql, args)
    }

    fn insert(
        &self,
        sql: &str,
        args: &[Value],
        returns_key: bool,
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send {
        (**self).insert(sql, args, returns_key)
    }
}
