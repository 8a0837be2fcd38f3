//! Runtime values exchanged between constructs and the caller.

use indexmap::IndexMap;

/// A record of named values, iterated in insertion order. Structs return
/// their fields in declaration order through this type.
pub type Record = IndexMap<String, Value>;

/// A single parsed or to-be-built value (scalar or compound).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Produced by Pass, Padding, and Const on parse; stands in for a
    /// missing field on build.
    Unit,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Str(String),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(x) => Some(*x),
            Value::Int(x) => (*x).try_into().ok(),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(x) => Some(*x),
            Value::Uint(x) => (*x).try_into().ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(x) => Some(*x),
            Value::F32(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Variant name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

/// Build a [`Record`] from `(name, value)` pairs.
///
/// ```
/// use binform::record;
/// let r = record([("width", 3u64), ("height", 2u64)]);
/// assert_eq!(r.get_index(0).map(|(k, _)| k.as_str()), Some("width"));
/// ```
pub fn record<V: Into<Value>>(pairs: impl IntoIterator<Item = (&'static str, V)>) -> Record {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into()))
        .collect()
}
