use infrasketch_core::conventions::CONVENTIONS;
use infrasketch_core::{Graph, ResourceEdge};

fn label_of<'a>(id: &'a str, graph: &'a Graph) -> &'a str {
    graph.node(id).map(|n| n.label.as_str()).unwrap_or(id)
}

/// Convert a graph to a compact text representation for LLM consumption.
pub fn serialize_graph(graph: &Graph) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str("NODES:\n");
    for node in &graph.nodes {
        out.push_str(&node.id);
        out.push_str(" \"");
        out.push_str(&node.label);
        out.push_str("\" (");
        out.push_str(node.resource_type.as_str());
        out.push(')');
        if !node.properties.is_empty() {
            out.push(' ');
            out.push_str(&serde_json::Value::Object(node.properties.clone()).to_string());
        }
        out.push('\n');
    }

    out.push_str("EDGES:\n");
    for edge in &graph.edges {
        serialize_edge(&mut out, edge, graph);
    }

    out
}

fn serialize_edge(out: &mut String, edge: &ResourceEdge, graph: &Graph) {
    let label = edge.label.as_deref().unwrap_or("uses");
    out.push_str(&edge.source);
    out.push_str(" \"");
    out.push_str(label_of(&edge.source, graph));
    out.push_str("\" --[");
    out.push_str(label);
    if let Some(kind) = edge.kind {
        out.push('/');
        out.push_str(match kind {
            infrasketch_core::EdgeKind::Containment => "containment",
            infrasketch_core::EdgeKind::Connection => "connection",
            infrasketch_core::EdgeKind::Dependency => "dependency",
        });
    }
    out.push_str("]--> ");
    out.push_str(&edge.target);
    out.push_str(" \"");
    out.push_str(label_of(&edge.target, graph));
    out.push_str("\"\n");
}

pub fn system_prompt() -> String {
    format!(
        "You are a cloud infrastructure architect. Turn the user's description into an AWS \
infrastructure graph for a diagram editor.\n\n\
Focus on:\n\
- Every resource the description names, with the quantities it asks for\n\
- The supporting resources a production deployment needs (VPC around subnets, security groups \
around compute and databases, IAM roles for functions, NAT for private subnets)\n\
- Secure defaults for the security-relevant properties listed below\n\n\
Do NOT:\n\
- Invent resource types outside the allowed set\n\
- Add edges that point at node ids missing from `nodes`\n\
- Add commentary, explanations or markdown around the JSON\n\n\
## Graph conventions\n{}\n\n\
Output ONLY one JSON object with `nodes`, `edges` and `metadata`, nothing else.",
        CONVENTIONS
    )
}

/// The user turn: the description, plus the current graph when refining an existing design.
pub fn user_message(description: &str, base: Option<&Graph>) -> String {
    match base {
        Some(graph) if !graph.nodes.is_empty() => format!(
            "CURRENT GRAPH:\n{}\nCHANGE REQUEST:\n{}\n\nReturn the complete updated graph, keeping existing node ids.",
            serialize_graph(graph),
            description.trim()
        ),
        _ => format!("DESCRIPTION:\n{}", description.trim()),
    }
}
