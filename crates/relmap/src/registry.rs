//! Explicit mapping registry.
//!
//! A [`Registry`] owns one [`MapperConfig`] and caches the validated
//! [`Schema`] of every type it has seen. Registries are independent: two of
//! them with different namespaces map the same type differently.

use crate::config::{Dialect, MapperConfig};
use crate::error::{OrmError, OrmResult};
use crate::schema::{Mapped, Schema};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

type SchemaCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

/// Mapping entry point: row mappers, serial mapper and save-query deriver
/// are methods on this type.
pub struct Registry {
    config: MapperConfig,
    schemas: SchemaCache,
}

impl Registry {
    /// Create a registry with the given configuration.
    pub fn new(config: MapperConfig) -> Self {
        Self {
            config,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Schema of `T`, registering it on first use.
    ///
    /// A type that fails registration is not cached; every call reports the
    /// same error again.
    pub fn schema<T: Mapped>(&self) -> OrmResult<Arc<Schema<T>>> {
        let key = TypeId::of::<T>();
        let cached = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(entry) = cached {
            return downcast::<T>(entry);
        }

        let schema = Arc::new(Schema::<T>::build(&self.config.namespace)?);
        tracing::trace!(
            target: "relmap.schema",
            table = schema.table(),
            type_name = schema.type_name(),
            namespace = %self.config.namespace,
            columns = schema.columns().len(),
            "registered schema"
        );

        let entry = self
            .schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| schema as Arc<dyn Any + Send + Sync>)
            .clone();
        downcast::<T>(entry)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<T: Mapped>(entry: Arc<dyn Any + Send + Sync>) -> OrmResult<Arc<Schema<T>>> {
    entry.downcast::<Schema<T>>().map_err(|_| {
        OrmError::InvalidDestination(format!(
            "cached schema does not belong to {}",
            std::any::type_name::<T>()
        ))
    })
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("schemas", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSet;

    #[derive(Default)]
    struct Account {
        id: i64,
        login: String,
    }

    impl Mapped for Account {
        fn table_name() -> &'static str {
            "accounts"
        }

        fn describe(fields: &mut FieldSet<Self>) {
            fields
                .field("id", |a| &a.id, |a| &mut a.id)
                .tag("column:id;primary")
                .tag_in("audit", "column:account_id");
            fields
                .field("login", |a| &a.login, |a| &mut a.login)
                .tag("column:login");
        }
    }

    #[test]
    fn schema_is_cached() {
        let registry = Registry::default();
        assert!(registry.is_empty());
        let first = registry.schema::<Account>().unwrap();
        let second = registry.schema::<Account>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registries_are_independent() {
        let default = Registry::default();
        let audit = Registry::new(MapperConfig::new().with_namespace("audit"));

        let names = |s: &Schema<Account>| -> Vec<String> {
            s.columns().iter().map(|c| c.name().to_string()).collect()
        };
        assert_eq!(names(&default.schema::<Account>().unwrap()), ["id", "login"]);
        assert_eq!(names(&audit.schema::<Account>().unwrap()), ["account_id"]);
    }
}
