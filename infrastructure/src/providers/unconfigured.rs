//! Placeholder generator used when no model endpoint is configured

use analyst_application::{
    CodeGenerationPort, CodeRequest, GenerationError, ReportGenerationPort, ReportRequest,
};
use async_trait::async_trait;

/// Refuses every request with [`GenerationError::NotConfigured`].
///
/// Lets scripted runs exercise the schema, parse and execute tools without
/// an endpoint; generation calls surface as `GENERATION_FAILED`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl CodeGenerationPort for UnconfiguredGenerator {
    async fn generate_code(&self, _request: &CodeRequest) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

#[async_trait]
impl ReportGenerationPort for UnconfiguredGenerator {
    async fn generate_report(&self, _request: &ReportRequest) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_domain::DatasetId;

    #[tokio::test]
    async fn test_always_not_configured() {
        let id = DatasetId::parse("sales").unwrap();
        let code = UnconfiguredGenerator
            .generate_code(&CodeRequest {
                goal: "sum".into(),
                dataset_id: id.clone(),
                schema_context: String::new(),
                previous_attempt: None,
            })
            .await;
        assert_eq!(code, Err(GenerationError::NotConfigured));

        let report = UnconfiguredGenerator
            .generate_report(&ReportRequest {
                dataset_id: id,
                focus: None,
                result_summary: "{}".into(),
            })
            .await;
        assert_eq!(report, Err(GenerationError::NotConfigured));
    }
}
