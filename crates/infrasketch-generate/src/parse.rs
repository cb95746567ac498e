use infrasketch_core::layout::{auto_layout, needs_layout};
use infrasketch_core::Graph;

use crate::GenerateError;

/// Parse raw LLM output into a validated, laid-out graph.
///
/// The reply may be wrapped in prose or code fences; the outermost JSON
/// object is taken. Structural problems are rejected, not repaired.
pub fn parse_graph(raw: &str) -> Result<Graph, GenerateError> {
    let json_str = extract_json_object(raw).ok_or(GenerateError::NoJson)?;
    let mut graph = Graph::from_json(json_str)?;
    if needs_layout(&graph) {
        auto_layout(&mut graph);
    }
    Ok(graph)
}

/// Extract the outermost JSON object substring from raw LLM output.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}
