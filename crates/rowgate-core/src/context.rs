use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(n) => write!(f, "{}", n),
            SqlValue::Float(n) => write!(f, "{}", n),
            SqlValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

/// An attribute of the requesting principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Scalar(SqlValue),
    /// Ordered sequence used for membership tests
    List(Vec<SqlValue>),
}

impl From<SqlValue> for ContextValue {
    fn from(value: SqlValue) -> Self {
        ContextValue::Scalar(value)
    }
}

impl From<Vec<SqlValue>> for ContextValue {
    fn from(values: Vec<SqlValue>) -> Self {
        ContextValue::List(values)
    }
}

/// Attributes of the requesting principal, exposed to conditions as `request_user`
///
/// Populated by the caller from already-validated claims. Deserializes from a
/// flat JSON object whose values are scalars or arrays of scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestContext {
    attributes: HashMap<String, ContextValue>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar attribute
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.attributes.insert(key.into(), ContextValue::Scalar(value.into()));
        self
    }

    /// Add a sequence attribute
    pub fn with_list<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.attributes.insert(key.into(), ContextValue::List(values));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ContextValue) {
        self.attributes.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.attributes.get(key)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Parse from a JSON object
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One in-memory row, column name to value (`None` is SQL NULL)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    columns: HashMap<String, Option<SqlValue>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.columns.insert(column.into(), Some(value.into()));
        self
    }

    pub fn with_null(mut self, column: impl Into<String>) -> Self {
        self.columns.insert(column.into(), None);
        self
    }

    /// Look up a column; the outer `None` means the column does not exist
    pub fn get(&self, column: &str) -> Option<Option<&SqlValue>> {
        self.columns.get(column).map(Option::as_ref)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
