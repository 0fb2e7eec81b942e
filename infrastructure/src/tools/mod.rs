//! Tool schema conversion for model APIs

pub mod schema;

pub use schema::JsonSchemaToolConverter;
