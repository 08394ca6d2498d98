//! Mapping policy configuration.

use serde::Deserialize;

/// Tag namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "orm";

/// SQL dialect: identifier quoting and placeholder style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `` `ident` `` quoting and `?` placeholders.
    #[default]
    MySql,
    /// `"ident"` quoting, `$n` placeholders and `RETURNING` for generated keys.
    Postgres,
}

impl Dialect {
    /// Quote an identifier, quoting each part of a dotted name separately.
    ///
    /// `u.id` becomes `` `u`.`id` `` under [`Dialect::MySql`].
    pub fn quote_ident(self, ident: &str) -> String {
        let quote = match self {
            Dialect::MySql => '`',
            Dialect::Postgres => '"',
        };
        let mut out = String::with_capacity(ident.len() + 2);
        for (i, part) in ident.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push(quote);
            for ch in part.chars() {
                if ch == quote {
                    out.push(quote);
                }
                out.push(ch);
            }
            out.push(quote);
        }
        out
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Whether generated keys are read back through `RETURNING`.
    pub fn returns_generated_key(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

/// Configuration for a [`Registry`](crate::Registry).
///
/// Several registries with different namespaces or dialects can coexist in
/// one process; nothing here is global.
///
/// # Example
/// ```ignore
/// let config = MapperConfig::new()
///     .with_namespace("legacy")
///     .with_dialect(Dialect::Postgres);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Tag namespace consulted on each field.
    pub namespace: String,
    /// SQL dialect used for rendering.
    pub dialect: Dialect,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            dialect: Dialect::default(),
            max_logged_sql: Some(200),
        }
    }
}

impl MapperConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tag namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set maximum SQL length to log.
    pub fn with_max_logged_sql(mut self, len: usize) -> Self {
        self.max_logged_sql = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql = None;
        self
    }

    /// Truncate `sql` for logging, respecting char boundaries.
    pub(crate) fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_logged_sql {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end]).into()
            }
            _ => sql.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_dotted_identifiers() {
        assert_eq!(Dialect::MySql.quote_ident("u.id"), "`u`.`id`");
        assert_eq!(Dialect::Postgres.quote_ident("users"), "\"users\"");
        assert_eq!(Dialect::MySql.quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn placeholders() {
        assert_eq!(Dialect::MySql.placeholder(3), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: MapperConfig =
            serde_json::from_str(r#"{"dialect": "postgres"}"#).unwrap();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.max_logged_sql, Some(200));
    }

    #[test]
    fn truncates_on_char_boundary() {
        let config = MapperConfig::new().with_max_logged_sql(2);
        assert_eq!(config.truncate_sql("héllo"), "h...");
        assert_eq!(config.no_truncate().truncate_sql("héllo"), "héllo");
    }
}
