//! # relmap
//!
//! Tag-driven relational mapping for Rust.
//!
//! ## Features
//!
//! - **Tagged schemas**: a type declares its columns once (`column:id;primary;auto_increment`)
//!   and the registry validates them before any row is touched
//! - **Row mapping**: result rows map into structs, unknown columns are discarded
//! - **Serial mapping**: one joined row splits into several structs, LEFT JOIN
//!   misses become `None`
//! - **Deterministic SQL**: key/value conditions render in sorted column order
//! - **Safe defaults**: empty WHERE fragments and unconditioned DELETEs are refused
//! - **Driver neutral**: anything implementing [`Executor`]; tokio-postgres is built in
//!
//! ## Example
//!
//! ```ignore
//! use relmap::{Db, Expr, Mapped, serial};
//!
//! #[derive(Debug, Default, Mapped)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm("column:id;primary;auto_increment")]
//!     id: i64,
//!     #[orm("column:name")]
//!     name: String,
//! }
//!
//! let db = Db::new(client);
//! let mut user = User { id: 0, name: "go".into() };
//! db.insert(&mut user).await?;
//! let found: Vec<User> = db.find(Expr::eq("name", "go")).await?;
//! ```

extern crate self as relmap;

pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod executor;
pub mod expr;
mod mapper;
pub mod postgres;
pub mod query;
pub mod registry;
pub mod save;
pub mod schema;
pub mod serial;
pub mod sql;
pub mod tag;
pub mod value;

pub use config::{DEFAULT_NAMESPACE, Dialect, MapperConfig};
pub use cursor::{ColumnDescriptor, Cursor, ScanTarget, VecCursor};
pub use db::Db;
pub use error::{MetadataError, OrmError, OrmResult, TagError};
pub use executor::{ExecResult, Executor};
pub use expr::{Conditions, Expr, Op};
pub use query::{DeleteQuery, SelectQuery};
pub use registry::Registry;
pub use save::SaveQuery;
pub use schema::{ColumnMeta, FieldDecl, FieldSet, Mapped, Schema};
pub use serial::SerialDest;
pub use sql::{BuiltQuery, SqlWriter};
pub use tag::{FieldTag, parse_tags};
pub use value::{FieldKind, SqlType, Value};

#[cfg(feature = "derive")]
pub use relmap_derive::Mapped;
