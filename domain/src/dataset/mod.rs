//! Dataset domain module
//!
//! Identifiers and column schemas for the user datasets that analysis code
//! runs against. Storage lives behind the application-layer ports.

pub mod entities;

pub use entities::{ColumnSchema, ColumnType, DATASET_ID_PATTERN, DatasetId, DatasetSchema};
