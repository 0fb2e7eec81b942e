//! Dataset identifiers and schemas

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pattern a dataset id must fully match.
pub const DATASET_ID_PATTERN: &str = "[A-Za-z0-9][A-Za-z0-9_-]{0,63}";

/// Identifier of a dataset.
///
/// Restricted to a filesystem- and prompt-safe alphabet so it can be used
/// as a storage key without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetId(String);

impl DatasetId {
    pub fn parse(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let mut chars = id.chars();
        let valid = match chars.next() {
            Some(first) => {
                first.is_ascii_alphanumeric()
                    && id.len() <= 64
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            }
            None => false,
        };
        if valid {
            Ok(Self(id))
        } else {
            Err(DomainError::InvalidDatasetId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatasetId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DatasetId> for String {
    fn from(id: DatasetId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Number,
    String,
    Boolean,
    Date,
    /// Mixed or entirely null values
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Number => "number",
            ColumnType::String => "string",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Unknown => "unknown",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Number)
    }

    fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ColumnType::Integer),
            Value::Number(_) => Some(ColumnType::Number),
            Value::String(s) if looks_like_date(s) => Some(ColumnType::Date),
            Value::String(_) => Some(ColumnType::String),
            _ => Some(ColumnType::Unknown),
        }
    }

    /// Least upper bound of two observed types.
    fn widen(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnType::Integer, ColumnType::Number)
            | (ColumnType::Number, ColumnType::Integer) => ColumnType::Number,
            (ColumnType::Date, ColumnType::String) | (ColumnType::String, ColumnType::Date) => {
                ColumnType::String
            }
            _ => ColumnType::Unknown,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn looks_like_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
        && (bytes.len() == 10 || bytes[10] == b'T' || bytes[10] == b' ')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Column layout and free-text description of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub description: String,
}

impl DatasetSchema {
    pub fn new(columns: Vec<ColumnSchema>, description: impl Into<String>) -> Self {
        Self {
            columns,
            description: description.into(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Infer columns from record rows, widening types across rows.
    pub fn infer(rows: &[Value]) -> Self {
        let mut columns: Vec<(String, Option<ColumnType>)> = Vec::new();
        for row in rows {
            let Some(record) = row.as_object() else {
                continue;
            };
            for (key, value) in record {
                let observed = ColumnType::of_value(value);
                match columns.iter_mut().find(|(name, _)| name == key) {
                    Some((_, current)) => {
                        *current = match (*current, observed) {
                            (Some(a), Some(b)) => Some(a.widen(b)),
                            (a, b) => a.or(b),
                        };
                    }
                    None => columns.push((key.clone(), observed)),
                }
            }
        }
        Self {
            columns: columns
                .into_iter()
                .map(|(name, ty)| ColumnSchema::new(name, ty.unwrap_or(ColumnType::Unknown)))
                .collect(),
            description: String::new(),
        }
    }

    /// Compact text rendering used as generation context.
    pub fn to_prompt_context(&self) -> String {
        let mut out = String::new();
        if !self.description.is_empty() {
            out.push_str(&self.description);
            out.push('\n');
        }
        out.push_str("Columns:\n");
        for column in &self.columns {
            out.push_str(&format!("- {} ({})\n", column.name, column.column_type));
        }
        out
    }
}
