//! Dataset tools: `get_dataset_schema` and `parse_dataset`.

use super::handler::{HandlerError, HandlerOutput, ToolHandler, dataset_id};
use super::{keys, names};
use crate::config::CollaboratorPolicy;
use crate::ports::datasets::{DatasetContentPort, DatasetError, DatasetSchemaPort};
use crate::use_cases::shared::with_retry;
use analyst_domain::{
    DATASET_ID_PATTERN, DatasetId, DatasetSchema, SessionContext, SessionState, ToolArguments,
    ToolDefinition, ToolError, ToolParameter,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub(crate) fn dataset_id_parameter() -> ToolParameter {
    ToolParameter::new(keys::DATASET_ID, "Identifier of the dataset", true)
        .with_pattern(DATASET_ID_PATTERN)
}

/// Storage misses are recoverable; outages fail the turn.
pub(crate) fn dataset_error(error: DatasetError) -> HandlerError {
    match error {
        DatasetError::NotFound(_) | DatasetError::NotAvailable(_) => {
            ToolError::prerequisite_missing(error.to_string()).into()
        }
        DatasetError::Malformed { .. } => {
            ToolError::prerequisite_missing("Dataset content could not be read")
                .with_details(error.to_string())
                .into()
        }
        DatasetError::Unavailable(_) | DatasetError::Timeout(_) => {
            ToolError::tool_execution_error(error.to_string()).into()
        }
    }
}

/// Schema from the session cache, else from the collaborator.
pub(crate) async fn load_schema(
    port: &dyn DatasetSchemaPort,
    policy: CollaboratorPolicy,
    id: &DatasetId,
    state: &mut SessionState,
) -> Result<DatasetSchema, DatasetError> {
    if let Some(schema) = state.schema(id) {
        debug!("Schema for {} served from session", id);
        return Ok(schema.clone());
    }
    let schema = with_retry(policy, "fetch_schema", || port.fetch_schema(id)).await?;
    state.store_schema(id.clone(), schema.clone());
    Ok(schema)
}

pub fn get_dataset_schema_definition() -> ToolDefinition {
    ToolDefinition::new(
        names::GET_DATASET_SCHEMA,
        "Look up the columns and column types of a dataset. Call this before generating analysis code.",
    )
    .with_parameter(dataset_id_parameter())
    .with_result(
        "The dataset's columns as {name, type} pairs and its description",
        ["dataset_id", "columns", "description"],
    )
}

pub struct GetDatasetSchemaHandler {
    schemas: Arc<dyn DatasetSchemaPort>,
    policy: CollaboratorPolicy,
}

impl GetDatasetSchemaHandler {
    pub fn new(schemas: Arc<dyn DatasetSchemaPort>, policy: CollaboratorPolicy) -> Self {
        Self { schemas, policy }
    }
}

#[async_trait]
impl ToolHandler for GetDatasetSchemaHandler {
    async fn handle(
        &self,
        arguments: &ToolArguments,
        _context: &SessionContext,
        state: &mut SessionState,
    ) -> Result<HandlerOutput, HandlerError> {
        let id = dataset_id(arguments)?;
        let schema = load_schema(self.schemas.as_ref(), self.policy, &id, state)
            .await
            .map_err(dataset_error)?;
        Ok(HandlerOutput::new(json!({
            "dataset_id": id.as_str(),
            "columns": schema.columns,
            "description": schema.description,
        })))
    }
}

pub fn parse_dataset_definition() -> ToolDefinition {
    ToolDefinition::new(
        names::PARSE_DATASET,
        "Load a dataset's rows into the session so analysis code can run against them.",
    )
    .with_parameter(dataset_id_parameter())
    .with_result(
        "Number of rows loaded and the column names found",
        ["dataset_id", "row_count", "columns"],
    )
}

pub struct ParseDatasetHandler {
    content: Arc<dyn DatasetContentPort>,
    policy: CollaboratorPolicy,
}

impl ParseDatasetHandler {
    pub fn new(content: Arc<dyn DatasetContentPort>, policy: CollaboratorPolicy) -> Self {
        Self { content, policy }
    }
}

#[async_trait]
impl ToolHandler for ParseDatasetHandler {
    async fn handle(
        &self,
        arguments: &ToolArguments,
        _context: &SessionContext,
        state: &mut SessionState,
    ) -> Result<HandlerOutput, HandlerError> {
        let id = dataset_id(arguments)?;
        let content = self.content.as_ref();
        let rows = with_retry(self.policy, "fetch_parsed_rows", || {
            content.fetch_parsed_rows(&id)
        })
        .await
        .map_err(dataset_error)?;

        if state.schema(&id).is_none() {
            state.store_schema(id.clone(), DatasetSchema::infer(&rows));
        }
        let columns: Vec<String> = state
            .schema(&id)
            .map(|s| s.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();

        let row_count = rows.len();
        state.store_parsed_rows(id.clone(), rows);

        Ok(HandlerOutput::new(json!({
            "dataset_id": id.as_str(),
            "row_count": row_count,
            "columns": columns,
        })))
    }
}
