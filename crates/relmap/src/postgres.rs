//! tokio-postgres executor.
//!
//! Statements are prepared first so the result-set columns are known even
//! when no row comes back; rows are then served through a [`PgCursor`].

use crate::cursor::{ColumnDescriptor, Cursor, ScanTarget};
use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecResult, Executor};
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Row, Statement};
use uuid::Uuid;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::UInt(v) => Value::Int(i64::try_from(*v)?).to_sql(ty, out),
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Time(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                Type::DATE => v.date().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn column_value<'a, T>(row: &'a Row, index: usize) -> OrmResult<Option<T>>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index)
        .map_err(|e| OrmError::decode(row.columns()[index].name(), e.to_string()))
}

/// Decode one column of `row` into a [`Value`].
pub fn decode_column(row: &Row, index: usize) -> OrmResult<Value> {
    let column = &row.columns()[index];
    let value = match *column.type_() {
        Type::BOOL => column_value::<bool>(row, index)?.map(Value::Bool),
        Type::INT2 => column_value::<i16>(row, index)?.map(|v| Value::Int(v.into())),
        Type::INT4 => column_value::<i32>(row, index)?.map(|v| Value::Int(v.into())),
        Type::INT8 => column_value::<i64>(row, index)?.map(Value::Int),
        Type::OID => column_value::<u32>(row, index)?.map(|v| Value::UInt(v.into())),
        Type::FLOAT4 => column_value::<f32>(row, index)?.map(|v| Value::Float(v.into())),
        Type::FLOAT8 => column_value::<f64>(row, index)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            column_value::<String>(row, index)?.map(Value::Text)
        }
        Type::BYTEA => column_value::<Vec<u8>>(row, index)?.map(Value::Bytes),
        Type::TIMESTAMP => column_value::<NaiveDateTime>(row, index)?.map(Value::Time),
        Type::TIMESTAMPTZ => {
            column_value::<DateTime<Utc>>(row, index)?.map(|v| Value::Time(v.naive_utc()))
        }
        Type::DATE => {
            column_value::<NaiveDate>(row, index)?.map(|v| Value::Time(v.and_time(NaiveTime::MIN)))
        }
        Type::UUID => column_value::<Uuid>(row, index)?.map(Value::Uuid),
        Type::JSON | Type::JSONB => column_value::<serde_json::Value>(row, index)?.map(Value::Json),
        ref other => {
            return Err(OrmError::decode(
                column.name(),
                format!("unsupported column type {other}"),
            ));
        }
    };
    Ok(value.unwrap_or_default())
}

/// Cursor over buffered Postgres rows.
///
/// Columns are decoded only when a scan target captures them, so a column
/// of a type [`decode_column`] does not support fails only if a field
/// claims it.
pub struct PgCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Row>,
    current: Option<Row>,
}

impl PgCursor {
    pub fn new(statement: &Statement, rows: Vec<Row>) -> Self {
        let columns = statement
            .columns()
            .iter()
            .enumerate()
            .map(|(ordinal, c)| ColumnDescriptor::new(c.name(), ordinal))
            .collect();
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

impl fmt::Debug for PgCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgCursor")
            .field("columns", &self.columns)
            .field("remaining", &self.rows.len())
            .finish()
    }
}

impl Cursor for PgCursor {
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
        scan_captured(targets, |index| decode_column(row, index))
    }
}

/// Fill the capturing targets with `decode(index)`; discarded columns are
/// never decoded.
fn scan_captured<F>(targets: &mut [ScanTarget], mut decode: F) -> OrmResult<()>
where
    F: FnMut(usize) -> OrmResult<Value>,
{
    for (index, target) in targets.iter_mut().enumerate() {
        if let ScanTarget::Capture(slot) = target {
            *slot = decode(index)?;
        }
    }
    Ok(())
}

fn generated_key(row: &Row) -> OrmResult<Option<i64>> {
    if row.is_empty() {
        return Ok(None);
    }
    match decode_column(row, 0)? {
        Value::Int(id) => Ok(Some(id)),
        Value::UInt(id) => Ok(i64::try_from(id).ok()),
        _ => Ok(None),
    }
}

macro_rules! impl_executor {
    ($($client:ty),* $(,)?) => {
        $(
            impl Executor for $client {
                type Cursor = PgCursor;

                async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<PgCursor> {
                    let statement = <$client>::prepare(self, sql).await?;
                    let rows = <$client>::query(self, &statement, &params(args)).await?;
                    Ok(PgCursor::new(&statement, rows))
                }

                async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
                    let rows_affected = <$client>::execute(self, sql, &params(args)).await?;
                    Ok(ExecResult {
                        rows_affected,
                        last_insert_id: None,
                    })
                }

                async fn insert(
                    &self,
                    sql: &str,
                    args: &[Value],
                    returns_key: bool,
                ) -> OrmResult<ExecResult> {
                    if !returns_key {
                        return Executor::execute(self, sql, args).await;
                    }
                    let rows = <$client>::query(self, sql, &params(args)).await?;
                    let last_insert_id = match rows.first() {
                        Some(row) => generated_key(row)?,
                        None => None,
                    };
                    Ok(ExecResult {
                        rows_affected: rows.len() as u64,
                        last_insert_id,
                    })
                }
            }
        )*
    };
}

impl_executor!(
    tokio_postgres::Client,
    tokio_postgres::Transaction<'_>,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discarded_columns_are_never_decoded() {
        let mut targets = [ScanTarget::capture(), ScanTarget::Discard, ScanTarget::capture()];
        scan_captured(&mut targets, |index| match index {
            1 => Err(OrmError::decode("price", "unsupported column type numeric")),
            other => Ok(Value::Int(other as i64)),
        })
        .unwrap();
        assert_eq!(targets[0], ScanTarget::Capture(Value::Int(0)));
        assert_eq!(targets[1], ScanTarget::Discard);
        assert_eq!(targets[2], ScanTarget::Capture(Value::Int(2)));
    }

    #[test]
    fn captured_unsupported_column_fails() {
        let mut targets = [ScanTarget::capture(), ScanTarget::capture()];
        let err = scan_captured(&mut targets, |index| match index {
            1 => Err(OrmError::decode("price", "unsupported column type numeric")),
            _ => Ok(Value::Null),
        })
        .unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "price"));
    }

    #[test]
    fn value_binds_null() {
        let mut out = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::INT8, &mut out),
            Ok(IsNull::Yes)
        ));
        assert!(matches!(
            Value::Int(5).to_sql(&Type::INT4, &mut out),
            Ok(IsNull::No)
        ));
        assert_eq!(out.len(), 4);
    }
}
