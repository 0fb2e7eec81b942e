//! Local directory dataset store
//!
//! Implements [`DatasetContentPort`] and [`DatasetSchemaPort`] over a
//! directory laid out as:
//!
//! ```text
//! <root>/
//!   sales.json          # JSON array of records
//!   events.jsonl        # one JSON record per line
//!   sales.schema.json   # optional column schema
//! ```
//!
//! Without a schema file the schema is inferred from the rows. Dataset ids
//! are validated before they reach the store, so they never contain path
//! separators.

use analyst_application::{DatasetContentPort, DatasetError, DatasetSchemaPort};
use analyst_domain::{DatasetId, DatasetSchema};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalDatasetStore {
    root: PathBuf,
}

enum RowFormat {
    Array,
    Lines,
}

impl LocalDatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a file, `None` when it does not exist.
    async fn read_optional(&self, path: &Path) -> Result<Option<String>, DatasetError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(DatasetError::Unavailable(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn load_rows(&self, id: &DatasetId) -> Result<Vec<Value>, DatasetError> {
        let candidates = [
            (self.root.join(format!("{}.json", id)), RowFormat::Array),
            (self.root.join(format!("{}.jsonl", id)), RowFormat::Lines),
        ];
        for (path, format) in candidates {
            if let Some(text) = self.read_optional(&path).await? {
                debug!("Loading dataset {} from {}", id, path.display());
                return parse_rows(id, &text, format);
            }
        }
        Err(DatasetError::NotFound(id.to_string()))
    }
}

fn malformed(id: &DatasetId, reason: impl Into<String>) -> DatasetError {
    DatasetError::Malformed {
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn parse_rows(id: &DatasetId, text: &str, format: RowFormat) -> Result<Vec<Value>, DatasetError> {
    let rows: Vec<Value> = match format {
        RowFormat::Array => {
            serde_json::from_str(text).map_err(|e| malformed(id, e.to_string()))?
        }
        RowFormat::Lines => text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| malformed(id, format!("line {}: {}", n + 1, e)))
            })
            .collect::<Result<_, _>>()?,
    };

    if let Some(position) = rows.iter().position(|row| !row.is_object()) {
        return Err(malformed(
            id,
            format!("record {} is not an object", position + 1),
        ));
    }
    if rows.is_empty() {
        return Err(DatasetError::NotAvailable(id.to_string()));
    }
    Ok(rows)
}

#[async_trait]
impl DatasetContentPort for LocalDatasetStore {
    async fn fetch_parsed_rows(&self, id: &DatasetId) -> Result<Vec<Value>, DatasetError> {
        self.load_rows(id).await
    }
}

#[async_trait]
impl DatasetSchemaPort for LocalDatasetStore {
    async fn fetch_schema(&self, id: &DatasetId) -> Result<DatasetSchema, DatasetError> {
        let path = self.root.join(format!("{}.schema.json", id));
        if let Some(text) = self.read_optional(&path).await? {
            return serde_json::from_str(&text)
                .map_err(|e| malformed(id, format!("schema: {}", e)));
        }

        let rows = self.load_rows(id).await?;
        Ok(DatasetSchema::infer(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_domain::ColumnType;

    fn id(s: &str) -> DatasetId {
        DatasetId::parse(s).unwrap()
    }

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, LocalDatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let store = LocalDatasetStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_reads_json_array() {
        let (_dir, store) = store_with(&[(
            "sales.json",
            r#"[{"Region": "North", "Sales": 10}, {"Region": "South", "Sales": 2.5}]"#,
        )]);
        let rows = store.fetch_parsed_rows(&id("sales")).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Sales"], 2.5);
    }

    #[tokio::test]
    async fn test_reads_jsonl() {
        let (_dir, store) = store_with(&[(
            "events.jsonl",
            "{\"kind\": \"click\"}\n\n{\"kind\": \"view\"}\n",
        )]);
        let rows = store.fetch_parsed_rows(&id("events")).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_dataset() {
        let (_dir, store) = store_with(&[]);
        let err = store.fetch_parsed_rows(&id("nope")).await.unwrap_err();
        assert_eq!(err, DatasetError::NotFound("nope".into()));
        let err = store.fetch_schema(&id("nope")).await.unwrap_err();
        assert_eq!(err, DatasetError::NotFound("nope".into()));
    }

    #[tokio::test]
    async fn test_malformed_records() {
        let (_dir, store) = store_with(&[("bad.json", "[1, 2]"), ("broken.jsonl", "{}\n{oops")]);
        assert!(matches!(
            store.fetch_parsed_rows(&id("bad")).await,
            Err(DatasetError::Malformed { .. })
        ));
        match store.fetch_parsed_rows(&id("broken")).await {
            Err(DatasetError::Malformed { reason, .. }) => assert!(reason.starts_with("line 2")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_dataset_is_not_available() {
        let (_dir, store) = store_with(&[("empty.json", "[]")]);
        assert_eq!(
            store.fetch_parsed_rows(&id("empty")).await.unwrap_err(),
            DatasetError::NotAvailable("empty".into())
        );
    }

    #[tokio::test]
    async fn test_schema_file_wins_over_inference() {
        let (_dir, store) = store_with(&[
            ("sales.json", r#"[{"Sales": 10}]"#),
            (
                "sales.schema.json",
                r#"{"columns": [{"name": "Sales", "type": "number"}], "description": "Revenue"}"#,
            ),
        ]);
        let schema = store.fetch_schema(&id("sales")).await.unwrap();
        assert_eq!(schema.description, "Revenue");
        assert_eq!(schema.columns[0].column_type, ColumnType::Number);
    }

    #[tokio::test]
    async fn test_schema_inferred_from_rows() {
        let (_dir, store) = store_with(&[("sales.json", r#"[{"Sales": 10}, {"Sales": 20}]"#)]);
        let schema = store.fetch_schema(&id("sales")).await.unwrap();
        assert_eq!(schema.column("Sales").unwrap().column_type, ColumnType::Integer);
    }
}
