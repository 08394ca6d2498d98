//! High-level facade tying a [`Registry`] to an [`Executor`].
//!
//! Every statement passes the empty-statement guard, is logged on the
//! `relmap.sql` tracing target, and is bounded by the optional query timeout.

use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecResult, Executor};
use crate::expr::Expr;
use crate::query::{DeleteQuery, SelectQuery};
use crate::registry::Registry;
use crate::schema::Mapped;
use crate::serial::SerialDest;
use crate::sql::{BuiltQuery, ensure_fragment};
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Executor plus mapping registry.
///
/// # Example
/// ```ignore
/// let db = Db::new(client).query_timeout(Duration::from_secs(5));
/// let users: Vec<User> = db.find(Expr::gt("age", 18)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Db<E> {
    executor: E,
    registry: Arc<Registry>,
    query_timeout: Option<Duration>,
}

impl<E: Executor> Db<E> {
    /// Wrap an executor with a default registry.
    pub fn new(executor: E) -> Self {
        Self::with_registry(executor, Arc::new(Registry::default()))
    }

    /// Wrap an executor with a shared registry.
    pub fn with_registry(executor: E, registry: Arc<Registry>) -> Self {
        Self {
            executor,
            registry,
            query_timeout: None,
        }
    }

    /// Bound every statement by `timeout`.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    fn guard<Q>(&self, kind: &'static str, built: OrmResult<Q>) -> OrmResult<Q> {
        built.inspect_err(|err| {
            if err.is_dangerous() {
                tracing::warn!(target: "relmap.sql", kind, error = %err, "rejected dangerous statement");
            }
        })
    }

    fn log(&self, kind: &'static str, sql: &str, args: &[Value]) -> OrmResult<()> {
        self.guard(kind, ensure_fragment(sql, "statement"))?;
        tracing::debug!(
            target: "relmap.sql",
            kind,
            param_count = args.len(),
            sql = %self.registry.config().truncate_sql(sql),
            "executing statement"
        );
        Ok(())
    }

    async fn timed<R>(&self, fut: impl Future<Output = OrmResult<R>>) -> OrmResult<R> {
        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| OrmError::Timeout(limit))?,
            None => fut.await,
        }
    }

    /// Run a read statement and return the raw cursor.
    pub async fn query(&self, query: &BuiltQuery) -> OrmResult<E::Cursor> {
        self.log("query", &query.sql, &query.args)?;
        self.timed(self.executor.query(&query.sql, &query.args)).await
    }

    /// Run a write statement.
    pub async fn execute(&self, query: &BuiltQuery) -> OrmResult<ExecResult> {
        self.log("execute", &query.sql, &query.args)?;
        self.timed(self.executor.execute(&query.sql, &query.args)).await
    }

    /// First row mapped into `T`; no row is [`OrmError::RecordNotFound`].
    pub async fn fetch_one<T: Mapped>(&self, query: &BuiltQuery) -> OrmResult<T> {
        let mut cursor = self.query(query).await?;
        let mut row = T::default();
        self.registry.map_row(&mut cursor, &mut row)?;
        Ok(row)
    }

    /// First row mapped into `T`, or `None`.
    pub async fn fetch_optional<T: Mapped>(&self, query: &BuiltQuery) -> OrmResult<Option<T>> {
        let mut cursor = self.query(query).await?;
        self.registry.map_optional(&mut cursor)
    }

    /// Every row mapped into `T`; no row is [`OrmError::RecordNotFound`].
    pub async fn fetch_all<T: Mapped>(&self, query: &BuiltQuery) -> OrmResult<Vec<T>> {
        let mut cursor = self.query(query).await?;
        self.registry.map_rows(&mut cursor)
    }

    /// First row split across `dests`; see [`Registry::map_serial`].
    pub async fn fetch_serial(
        &self,
        query: &BuiltQuery,
        splitter: &dyn Fn(usize) -> String,
        dests: &mut [&mut dyn SerialDest],
    ) -> OrmResult<()> {
        let mut cursor = self.query(query).await?;
        self.registry.map_serial(&mut cursor, splitter, dests)
    }

    /// Select every mapped column of `T` matching `filter`.
    pub async fn find<T: Mapped>(&self, filter: impl Into<Expr>) -> OrmResult<Vec<T>> {
        let schema = self.registry.schema::<T>()?;
        let built = self.guard(
            "find",
            SelectQuery::of(&schema)
                .filter(filter)
                .build(self.registry.dialect()),
        )?;
        self.fetch_all(&built).await
    }

    /// Insert `model` and write the generated key back into it.
    pub async fn insert<T: Mapped>(&self, model: &mut T) -> OrmResult<ExecResult> {
        let mut save = self.guard("insert", self.registry.query_for_insert(model))?;
        self.log("insert", &save.sql, &save.args)?;
        let result = self
            .timed(self.executor.insert(&save.sql, &save.args, save.returns_key))
            .await?;
        if let Some(id) = result.last_insert_id {
            save.write_generated_key(id)?;
        }
        Ok(result)
    }

    /// `UPDATE table SET ... WHERE condition`; returns the affected row count.
    pub async fn update<I, K, V>(&self, table: &str, values: I, condition: &Expr) -> OrmResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let save = self.guard("update", self.registry.query_for_update(table, values, condition))?;
        self.log("update", &save.sql, &save.args)?;
        let result = self.timed(self.executor.execute(&save.sql, &save.args)).await?;
        Ok(result.rows_affected)
    }

    /// Update `model` by its primary key; returns the affected row count.
    pub async fn update_by_key<T: Mapped>(&self, model: &T) -> OrmResult<u64> {
        let save = self.guard("update", self.registry.query_for_update_by_key(model))?;
        self.log("update", &save.sql, &save.args)?;
        let result = self.timed(self.executor.execute(&save.sql, &save.args)).await?;
        Ok(result.rows_affected)
    }

    /// Run a DELETE; returns the affected row count.
    pub async fn delete(&self, query: &DeleteQuery) -> OrmResult<u64> {
        let built = self.guard("delete", query.build(self.registry.dialect()))?;
        Ok(self.execute(&built).await?.rows_affected)
    }
}
