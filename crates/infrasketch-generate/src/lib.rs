pub mod engine;
pub mod parse;
pub mod prompt;

use infrasketch_core::settings::ai_configured;
use infrasketch_core::{AiSettings, Graph, GraphError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("AI generation is not configured: set a provider and model (and an API key unless using ollama)")]
    NotConfigured,

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("response did not contain a JSON object")]
    NoJson,

    #[error("generated graph is invalid: {0}")]
    Graph(#[from] GraphError),
}

/// Ask the configured AI service for a graph matching `description`.
///
/// When `base` is given the service refines that graph instead of starting
/// from scratch. Failures are returned, not retried.
pub async fn generate_graph(
    description: &str,
    settings: &AiSettings,
    base: Option<&Graph>,
) -> Result<Graph, GenerateError> {
    if !ai_configured(settings) {
        return Err(GenerateError::NotConfigured);
    }

    let system = prompt::system_prompt();
    let user_msg = prompt::user_message(description, base);

    tracing::info!(provider = %settings.provider, model = %settings.model, "requesting graph");

    let raw = engine::generate(settings, &system, &user_msg).await?;
    tracing::debug!(bytes = raw.len(), "raw generation output received");

    let graph = parse::parse_graph(&raw)?;
    tracing::info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "generated graph parsed"
    );
    Ok(graph)
}
