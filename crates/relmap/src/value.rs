//! Driver-neutral column values and the Rust types that map onto them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

/// A single bound argument or scanned column value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Timestamp without zone; zoned values are normalized to UTC.
    Time(NaiveDateTime),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
        }
    }

    /// Convert into a Rust type.
    pub fn decode<T: SqlType>(self) -> Result<T, String> {
        T::from_value(self)
    }
}

/// Declared shape of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    /// Signed integer of the given bit width.
    Int(u32),
    /// Unsigned integer of the given bit width.
    UInt(u32),
    Float,
    Text,
    Bytes,
    Time,
    Uuid,
    Json,
    /// Boxed indirection; never accepted as a mapping target.
    Pointer,
}

impl FieldKind {
    /// Whether a generated key may be written back into a field of this kind.
    pub fn is_integer64(self) -> bool {
        matches!(self, FieldKind::Int(64) | FieldKind::UInt(64))
    }
}

/// A Rust type that can be bound as an argument and scanned from a column.
pub trait SqlType: Sized {
    /// Shape of the type, consulted by schema registration.
    const KIND: FieldKind;

    /// Whether NULL is a legal value (true for `Option<T>`).
    const NULLABLE: bool = false;

    /// Produce the value to bind.
    fn to_value(&self) -> Value;

    /// Convert a scanned value; the error is a human readable reason.
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch(value: &Value, target: &str) -> String {
    match value {
        Value::Null => format!("unexpected NULL for non-optional {target}"),
        other => format!("cannot convert {} into {target}", other.type_name()),
    }
}

fn out_of_range(value: impl std::fmt::Display, target: &str) -> String {
    format!("value {value} out of range for {target}")
}

macro_rules! impl_signed {
    ($($t:ty => $bits:expr),* $(,)?) => {
        $(
            impl SqlType for $t {
                const KIND: FieldKind = FieldKind::Int($bits);

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Int(v) => <$t>::try_from(v).map_err(|_| out_of_range(v, stringify!($t))),
                        Value::UInt(v) => <$t>::try_from(v).map_err(|_| out_of_range(v, stringify!($t))),
                        Value::Bool(b) => Ok(<$t>::from(b)),
                        Value::Text(s) => s
                            .trim()
                            .parse()
                            .map_err(|_| format!("cannot parse '{s}' as {}", stringify!($t))),
                        other => Err(mismatch(&other, stringify!($t))),
                    }
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($t:ty => $bits:expr),* $(,)?) => {
        $(
            impl SqlType for $t {
                const KIND: FieldKind = FieldKind::UInt($bits);

                fn to_value(&self) -> Value {
                    Value::UInt(u64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Int(v) => <$t>::try_from(v).map_err(|_| out_of_range(v, stringify!($t))),
                        Value::UInt(v) => <$t>::try_from(v).map_err(|_| out_of_range(v, stringify!($t))),
                        Value::Bool(b) => Ok(<$t>::from(b)),
                        Value::Text(s) => s
                            .trim()
                            .parse()
                            .map_err(|_| format!("cannot parse '{s}' as {}", stringify!($t))),
                        other => Err(mismatch(&other, stringify!($t))),
                    }
                }
            }
        )*
    };
}

impl_signed!(i8 => 8, i16 => 16, i32 => 32, i64 => 64);
impl_unsigned!(u8 => 8, u16 => 16, u32 => 32, u64 => 64);

impl SqlType for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(0) | Value::UInt(0) => Ok(false),
            Value::Int(1) | Value::UInt(1) => Ok(true),
            other => Err(mismatch(&other, "bool")),
        }
    }
}

impl SqlType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::UInt(v) => Ok(v as f64),
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("cannot parse '{s}' as f64")),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl SqlType for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl SqlType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|e| e.to_string()),
            other => Err(mismatch(&other, "String")),
        }
    }
}

impl SqlType for Vec<u8> {
    const KIND: FieldKind = FieldKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch(&other, "Vec<u8>")),
        }
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl SqlType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::Time;

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Time(t) => Ok(t),
            Value::Text(s) => {
                NaiveDateTime::parse_from_str(s.trim(), TIME_FORMAT).map_err(|e| e.to_string())
            }
            other => Err(mismatch(&other, "NaiveDateTime")),
        }
    }
}

impl SqlType for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Time;

    fn to_value(&self) -> Value {
        Value::Time(self.naive_utc())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        NaiveDateTime::from_value(value).map(|t| t.and_utc())
    }
}

impl SqlType for NaiveDate {
    const KIND: FieldKind = FieldKind::Time;

    fn to_value(&self) -> Value {
        Value::Time(self.and_time(NaiveTime::MIN))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Time(t) => Ok(t.date()),
            Value::Text(s) => {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| e.to_string())
            }
            other => Err(mismatch(&other, "NaiveDate")),
        }
    }
}

impl SqlType for Uuid {
    const KIND: FieldKind = FieldKind::Uuid;

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) => Uuid::parse_str(s.trim()).map_err(|e| e.to_string()),
            Value::Bytes(b) => Uuid::from_slice(&b).map_err(|e| e.to_string()),
            other => Err(mismatch(&other, "Uuid")),
        }
    }
}

impl SqlType for serde_json::Value {
    const KIND: FieldKind = FieldKind::Json;

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => serde_json::from_str(&s).map_err(|e| e.to_string()),
            Value::Bytes(b) => serde_json::from_slice(&b).map_err(|e| e.to_string()),
            other => Err(mismatch(&other, "serde_json::Value")),
        }
    }
}

// Option<T> delegates to inner type
impl<T: SqlType> SqlType for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: SqlType> SqlType for Box<T> {
    const KIND: FieldKind = FieldKind::Pointer;

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: Value) -> Result<Self, String> {
        T::from_value(value).map(Box::new)
    }
}

macro_rules! impl_from_for_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    SqlType::to_value(&v)
                }
            }
        )*
    };
}

impl_from_for_value!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    NaiveDateTime,
    DateTime<Utc>,
    NaiveDate,
    Uuid,
);

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(i32::from_value(Value::Int(42)), Ok(42));
        assert!(i8::from_value(Value::Int(300)).is_err());
        assert!(u32::from_value(Value::Int(-1)).is_err());
        assert_eq!(u64::from_value(Value::Int(7)), Ok(7));
        assert_eq!(i64::from_value(Value::UInt(7)), Ok(7));
    }

    #[test]
    fn null_requires_option() {
        assert_eq!(Option::<i64>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<i64>::from_value(Value::Int(3)), Ok(Some(3)));
        let err = i64::from_value(Value::Null).unwrap_err();
        assert!(err.contains("NULL"));
    }

    #[test]
    fn text_numbers_parse() {
        assert_eq!(i64::from_value(Value::Text(" 12 ".into())), Ok(12));
        assert_eq!(f64::from_value(Value::Text("1.5".into())), Ok(1.5));
        assert!(i64::from_value(Value::Text("abc".into())).is_err());
    }

    #[test]
    fn kinds() {
        assert!(<i64 as SqlType>::KIND.is_integer64());
        assert!(<u64 as SqlType>::KIND.is_integer64());
        assert!(<Option<i64> as SqlType>::KIND.is_integer64());
        assert!(!<i32 as SqlType>::KIND.is_integer64());
        assert_eq!(<Box<i64> as SqlType>::KIND, FieldKind::Pointer);
        assert!(<Option<String> as SqlType>::NULLABLE);
        assert!(!<String as SqlType>::NULLABLE);
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("go")), Value::Text("go".into()));
        assert_eq!(Value::from(5u8), Value::UInt(5));
    }

    #[test]
    fn datetime_round_trip_through_utc() {
        let t = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let utc = DateTime::<Utc>::from_value(Value::Time(t)).unwrap();
        assert_eq!(utc.to_value(), Value::Time(t));
        assert_eq!(
            NaiveDateTime::from_value(Value::Text("2024-01-02 03:04:05".into())),
            Ok(t)
        );
    }
}
