//! Field tag parsing.
//!
//! A tag is a compact per-field annotation of the form
//! `key[:value](;key[:value])*`, for example `column:id;primary;auto_increment`.
//! A clause without `:` is a bare flag whose value is the empty string.

use crate::error::TagError;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Key naming the mapped column.
pub const COLUMN: &str = "column";
/// Flag marking a primary key column.
pub const PRIMARY: &str = "primary";
/// Flag marking the database-generated surrogate key.
pub const AUTO_INCREMENT: &str = "auto_increment";
/// Key carrying a free-form SQL type hint.
pub const TYPE: &str = "type";

/// Split a tag string into its key/value entries.
///
/// # Example
/// ```ignore
/// let tags = relmap::tag::parse_tags("column:id;primary")?;
/// assert_eq!(tags["column"], "id");
/// assert_eq!(tags["primary"], "");
/// ```
pub fn parse_tags(tag: &str) -> Result<BTreeMap<String, String>, TagError> {
    let mut entries = BTreeMap::new();

    for clause in tag.split(';') {
        let clause = clause.trim();
        if clause.is_empty() {
            continue;
        }
        if clause.contains(',') {
            return Err(TagError::Malformed(clause.to_string()));
        }

        let (key, value) = match clause.split_once(':') {
            Some((key, value)) => {
                if value.contains(':') {
                    return Err(TagError::Malformed(clause.to_string()));
                }
                (key.trim(), value.trim())
            }
            None => (clause, ""),
        };
        if key.is_empty() {
            return Err(TagError::Malformed(clause.to_string()));
        }

        if entries.insert(key.to_string(), value.to_string()).is_some() {
            return Err(TagError::DuplicateKey(key.to_string()));
        }
    }

    if entries.is_empty() {
        return Err(TagError::Empty);
    }
    Ok(entries)
}

/// Typed view of a parsed tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTag {
    /// Column name (`column:<name>`); `None` when the key is absent or empty.
    pub column: Option<String>,
    /// `primary` flag.
    pub primary: bool,
    /// `auto_increment` flag.
    pub auto_increment: bool,
    /// `type:<hint>` value.
    pub type_hint: Option<String>,
    /// Keys this crate does not interpret, kept for callers.
    pub extra: BTreeMap<String, String>,
}

impl FieldTag {
    /// Parse a tag string into a [`FieldTag`].
    pub fn parse(tag: &str) -> Result<Self, TagError> {
        let mut entries = parse_tags(tag)?;

        let column = entries.remove(COLUMN).filter(|c| !c.is_empty());
        let primary = entries.remove(PRIMARY).is_some();
        let auto_increment = entries.remove(AUTO_INCREMENT).is_some();
        let type_hint = entries.remove(TYPE).filter(|t| !t.is_empty());

        Ok(Self {
            column,
            primary,
            auto_increment,
            type_hint,
            extra: entries,
        })
    }
}

impl FromStr for FieldTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_values() {
        let tags = parse_tags("column:id;primary;auto_increment").unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["column"], "id");
        assert_eq!(tags["primary"], "");
        assert_eq!(tags["auto_increment"], "");
    }

    #[test]
    fn trims_whitespace_and_skips_blank_clauses() {
        let tags = parse_tags(" column : name ;; ").unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["column"], "name");
    }

    #[test]
    fn duplicate_key_is_rejected() {
        assert_eq!(
            parse_tags("column:a;column:b"),
            Err(TagError::DuplicateKey("column".to_string()))
        );
    }

    #[test]
    fn empty_tag_is_rejected() {
        assert_eq!(parse_tags(""), Err(TagError::Empty));
        assert_eq!(parse_tags(" ; ;"), Err(TagError::Empty));
    }

    #[test]
    fn malformed_clauses_are_rejected() {
        assert!(matches!(parse_tags("column:a:b"), Err(TagError::Malformed(_))));
        assert!(matches!(parse_tags("column:a,primary"), Err(TagError::Malformed(_))));
        assert!(matches!(parse_tags(":id"), Err(TagError::Malformed(_))));
    }

    #[test]
    fn field_tag_interprets_known_keys() {
        let tag: FieldTag = "column:created_at;type:timestamp;index:created".parse().unwrap();
        assert_eq!(tag.column.as_deref(), Some("created_at"));
        assert_eq!(tag.type_hint.as_deref(), Some("timestamp"));
        assert!(!tag.primary);
        assert!(!tag.auto_increment);
        assert_eq!(tag.extra.get("index").map(String::as_str), Some("created"));
    }

    #[test]
    fn field_tag_without_column() {
        let tag = FieldTag::parse("primary").unwrap();
        assert!(tag.primary);
        assert_eq!(tag.column, None);

        let tag = FieldTag::parse("column:").unwrap();
        assert_eq!(tag.column, None);
    }
}
