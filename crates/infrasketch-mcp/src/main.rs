use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use infrasketch_core::conventions::CONVENTIONS;
use infrasketch_core::layout::{auto_layout, needs_layout};
use infrasketch_core::settings::{ai_configured, read_settings, write_settings};
use infrasketch_core::{
    apply_fix, extract, scan, FileStore, FindingRef, Graph, GraphStore, RuleSet, SecurityReport,
};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GetGraphRequest {
    /// Name of the stored graph
    name: String,
    /// Include node positions (layout coordinates). Defaults to false.
    #[serde(default)]
    include_positions: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetGraphRequest {
    /// Name to store the graph under (letters, digits, '-', '_' or '.')
    name: String,
    /// Full graph JSON: {nodes, edges, metadata?}
    data: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct NameRequest {
    /// Name of the stored graph
    name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ExtractGraphRequest {
    /// Free-form description of the infrastructure, e.g. "a VPC with public and private subnets, 2 EC2 instances and a postgres database"
    text: String,
    /// Save the result under this name. Omit to only return it.
    name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ScanGraphRequest {
    /// Name of a stored graph. Its report is saved for get_report.
    name: Option<String>,
    /// Inline graph JSON to scan instead of a stored graph.
    data: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ApplyFixRequest {
    /// Name of the stored graph
    name: String,
    /// Rule that fired, e.g. "rds-encryption"
    rule_id: String,
    /// Node the rule fired on, e.g. "node-4"
    node_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GenerateGraphRequest {
    /// What to build, in plain language
    description: String,
    /// Name of a stored graph to refine instead of starting from scratch
    base: Option<String>,
    /// Save the result under this name. Omit to only return it.
    name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ConfigureAiRequest {
    /// Provider name: openai, anthropic, google, ollama, groq, mistral or deepseek
    provider: Option<String>,
    /// Model identifier understood by the provider
    model: Option<String>,
    /// API key; not needed for ollama. Never echoed back.
    api_key: Option<String>,
}

#[derive(Clone)]
pub struct InfraSketchServer {
    tool_router: ToolRouter<Self>,
    store: FileStore,
    rules: RuleSet,
}

#[tool_router]
impl InfraSketchServer {
    pub fn new(store: FileStore) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
            rules: RuleSet::builtin(),
        }
    }

    #[tool(description = "List all stored infrastructure graphs")]
    fn list_graphs(&self) -> Result<CallToolResult, McpError> {
        respond(self.list_text())
    }

    #[tool(
        description = "Get the full JSON of a stored graph: {nodes: [{id, type, label, properties}], edges: [{id, source, target, label?, type?}], metadata: {name, region, createdAt, updatedAt}}. Positions are omitted unless include_positions is set."
    )]
    fn get_graph(
        &self,
        Parameters(req): Parameters<GetGraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.graph_text(&req.name, req.include_positions))
    }

    #[tool(
        description = "Create or overwrite a stored graph. Pass the full graph JSON. Every edge must reference existing node ids; duplicate ids and self-loops are rejected. Graphs whose nodes all lack a position are auto-laid out by resource layer. Call get_conventions first for the allowed resource types and property keys."
    )]
    fn set_graph(
        &self,
        Parameters(req): Parameters<SetGraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.set(&req.name, &req.data))
    }

    #[tool(description = "Delete a stored graph and its last scan report")]
    fn delete_graph(
        &self,
        Parameters(req): Parameters<NameRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.store
                .delete(&req.name)
                .map(|()| format!("Deleted graph '{}'", req.name))
                .map_err(|e| e.to_string()),
        )
    }

    #[tool(
        description = "Turn a plain-language description into an infrastructure graph using keyword matching (no AI). Recognizes counts like \"3 EC2 instances\", public/private subnets, encryption and multi-AZ hints, CIDR blocks, instance sizes and regions. Adds an implied VPC and security group where needed."
    )]
    fn extract_graph(
        &self,
        Parameters(req): Parameters<ExtractGraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.extract_text(&req.text, req.name.as_deref()))
    }

    #[tool(
        description = "Run the security rule engine on a stored graph (name) or inline graph JSON (data). Returns the score (0-100), compliance percentages and each finding with its ruleId and nodeId. Reports for stored graphs are kept for get_report."
    )]
    fn scan_graph(
        &self,
        Parameters(req): Parameters<ScanGraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.scan_text(req.name.as_deref(), req.data.as_deref()))
    }

    #[tool(description = "Get the last saved security report of a stored graph")]
    fn get_report(
        &self,
        Parameters(req): Parameters<NameRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(match self.store.read_report(&req.name) {
            Ok(Some(report)) => Ok(format_report(&report)),
            Ok(None) => Err(format!(
                "No report for '{}'. Run scan_graph with name first.",
                req.name
            )),
            Err(e) => Err(e.to_string()),
        })
    }

    #[tool(
        description = "Apply the automatic fix for one finding (ruleId + nodeId from scan_graph) to a stored graph. Only the properties the fix names change. The graph is saved and rescanned."
    )]
    fn apply_fix(
        &self,
        Parameters(req): Parameters<ApplyFixRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.fix(&req.name, &FindingRef::new(req.rule_id, req.node_id)))
    }

    #[tool(description = "List the security rules the scanner evaluates")]
    fn list_rules(&self) -> Result<CallToolResult, McpError> {
        respond(Ok(format_rules(&self.rules)))
    }

    #[tool(
        description = "Ask the configured AI provider to design a graph from a description, optionally refining a stored graph (base). Requires provider settings in settings.json or INFRASKETCH_AI_* variables."
    )]
    async fn generate_graph(
        &self,
        Parameters(req): Parameters<GenerateGraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        let base = match req.base.as_deref().map(|b| self.store.read(b)).transpose() {
            Ok(base) => base,
            Err(e) => return respond(Err(e.to_string())),
        };
        let settings = read_settings(self.store.root()).with_env_overrides();
        let graph =
            match infrasketch_generate::generate_graph(&req.description, &settings, base.as_ref())
                .await
            {
                Ok(g) => g,
                Err(e) => return respond(Err(format!("Generation failed: {e}"))),
            };
        respond(self.save_and_render(graph, req.name.as_deref()))
    }

    #[tool(
        description = "Store AI provider settings used by generate_graph. Omitted fields keep their saved value. INFRASKETCH_AI_* variables still take precedence at generation time."
    )]
    fn configure_ai(
        &self,
        Parameters(req): Parameters<ConfigureAiRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.configure(req))
    }

    #[tool(description = "Get the conventions that govern graph JSON: resource types, layers, edge kinds and the property keys the scanner reads")]
    fn get_conventions(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(CONVENTIONS)]))
    }
}

impl InfraSketchServer {
    fn list_text(&self) -> Result<String, String> {
        let names = self.store.list().map_err(|e| e.to_string())?;
        Ok(if names.is_empty() {
            "No graphs found. Use set_graph or extract_graph with a name to create one.".to_string()
        } else {
            names.join("\n")
        })
    }

    fn graph_text(&self, name: &str, include_positions: bool) -> Result<String, String> {
        let graph = self
            .store
            .read(name)
            .map_err(|e| format!("Failed to read graph '{}': {}", name, e))?;
        let mut val = serde_json::to_value(&graph).map_err(|e| e.to_string())?;
        if !include_positions {
            strip_positions(&mut val);
        }
        serde_json::to_string_pretty(&val).map_err(|e| e.to_string())
    }

    fn set(&self, name: &str, data: &str) -> Result<String, String> {
        let mut graph = Graph::from_json(data).map_err(|e| format!("Invalid graph: {e}"))?;
        if needs_layout(&graph) {
            auto_layout(&mut graph);
        }
        graph.touch();
        self.store.write(name, &graph).map_err(|e| e.to_string())?;
        tracing::info!(name, nodes = graph.nodes.len(), "graph stored");
        Ok(format!(
            "Set graph '{}' ({} nodes, {} edges)",
            name,
            graph.nodes.len(),
            graph.edges.len()
        ))
    }

    fn extract_text(&self, text: &str, name: Option<&str>) -> Result<String, String> {
        let mut graph = extract(text);
        if let Some(name) = name {
            graph.metadata.name = name.to_string();
        }
        self.save_and_render(graph, name)
    }

    fn save_and_render(&self, graph: Graph, name: Option<&str>) -> Result<String, String> {
        let json = graph.to_json_pretty().map_err(|e| e.to_string())?;
        match name {
            Some(name) => {
                self.store.write(name, &graph).map_err(|e| e.to_string())?;
                Ok(format!(
                    "Saved graph '{}' ({} nodes, {} edges)\n\n{}",
                    name,
                    graph.nodes.len(),
                    graph.edges.len(),
                    json
                ))
            }
            None => Ok(json),
        }
    }

    fn scan_text(&self, name: Option<&str>, data: Option<&str>) -> Result<String, String> {
        let report = match (name, data) {
            (Some(name), None) => {
                let graph = self.store.read(name).map_err(|e| e.to_string())?;
                let report = scan(&graph, &self.rules);
                self.store
                    .write_report(name, &report)
                    .map_err(|e| e.to_string())?;
                report
            }
            (None, Some(data)) => {
                let graph = Graph::from_json(data).map_err(|e| format!("Invalid graph: {e}"))?;
                scan(&graph, &self.rules)
            }
            _ => return Err("Pass exactly one of name or data".to_string()),
        };
        Ok(format_report(&report))
    }

    fn configure(&self, req: ConfigureAiRequest) -> Result<String, String> {
        let mut settings = read_settings(self.store.root());
        if let Some(provider) = req.provider {
            settings.provider = provider.trim().to_lowercase();
        }
        if let Some(model) = req.model {
            settings.model = model.trim().to_string();
        }
        if let Some(key) = req.api_key {
            settings.api_key = key.trim().to_string();
        }
        write_settings(self.store.root(), &settings).map_err(|e| e.to_string())?;
        tracing::info!(provider = %settings.provider, model = %settings.model, "AI settings saved");

        let key_state = if settings.api_key.is_empty() { "not set" } else { "set" };
        let readiness = if ai_configured(&settings) {
            "generate_graph is ready"
        } else {
            "generate_graph still needs a provider, a model and (except for ollama) an API key"
        };
        Ok(format!(
            "Saved AI settings: provider={}, model={}, api key {}. {}.",
            settings.provider, settings.model, key_state, readiness
        ))
    }

    fn fix(&self, name: &str, key: &FindingRef) -> Result<String, String> {
        let mut graph = self.store.read(name).map_err(|e| e.to_string())?;
        let patch = apply_fix(&mut graph, &self.rules, key).map_err(|e| e.to_string())?;
        self.store.write(name, &graph).map_err(|e| e.to_string())?;
        let report = scan(&graph, &self.rules);
        self.store
            .write_report(name, &report)
            .map_err(|e| e.to_string())?;
        let patch_json = serde_json::Value::Object(patch).to_string();
        Ok(format!(
            "Applied {} on {}: {}\n\n{}",
            key.rule_id,
            key.node_id,
            patch_json,
            format_report(&report)
        ))
    }
}

#[tool_handler]
impl ServerHandler for InfraSketchServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!("{}\n\n## Graph conventions\n{}", INSTRUCTIONS, CONVENTIONS);
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

fn respond(result: Result<String, String>) -> Result<CallToolResult, McpError> {
    Ok(match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(e)]),
    })
}

/// Recursively strip layout coordinates from a JSON value.
fn strip_positions(val: &mut serde_json::Value) {
    match val {
        serde_json::Value::Object(map) => {
            map.remove("position");
            for (_, v) in map.iter_mut() {
                strip_positions(v);
            }
        }
        serde_json::Value::Array(arr) => {
            for v in arr.iter_mut() {
                strip_positions(v);
            }
        }
        _ => {}
    }
}

fn format_report(report: &SecurityReport) -> String {
    let summary = report.summary();
    let mut out = format!(
        "Security score: {}/100 (ISO 27001 {}%, GDPR {}%, HIPAA {}%)\nFindings: {} ({} critical, {} high, {} medium, {} low, {} info)\n",
        report.score,
        report.compliance.iso27001,
        report.compliance.gdpr,
        report.compliance.hipaa,
        summary.total,
        summary.critical,
        summary.high,
        summary.medium,
        summary.low,
        summary.info,
    );
    for f in &report.findings {
        out.push_str(&format!(
            "- [{}] {} ruleId={} nodeId={}{}\n  {}\n  Fix: {}\n",
            f.severity,
            f.title,
            f.rule_id,
            f.node_id,
            if f.auto_fixable { " (auto-fix available)" } else { "" },
            f.description,
            f.recommendation,
        ));
    }
    out
}

fn format_rules(rules: &RuleSet) -> String {
    let mut out = String::new();
    for rule in rules.rules() {
        out.push_str(&format!(
            "{} [{}] {}{}\n  {}\n",
            rule.id,
            rule.severity,
            rule.name,
            if rule.auto_fix.is_some() { " (auto-fix)" } else { "" },
            rule.description,
        ));
    }
    out
}

const INSTRUCTIONS: &str = r#"InfraSketch keeps AWS infrastructure diagrams as graphs of typed resources and checks them against cloud security rules.

Typical workflow:
1. Draft a graph with `extract_graph` (keyword based) or `generate_graph` (AI provider, set up once with `configure_ai`), saving it with a name. For full control, write JSON yourself with `set_graph`.
2. Run `scan_graph` with the name. Findings carry a ruleId and nodeId.
3. For findings marked auto-fix, call `apply_fix` with that ruleId and nodeId. For the rest, add the missing resource (security group, IAM role, NAT gateway) with `set_graph`.
4. Re-scan until the score is acceptable."#;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("infrasketch_mcp=info,infrasketch_core=info,infrasketch_generate=info"));

    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("init") {
        return init_project(&args.collect::<Vec<_>>());
    }

    init_tracing();

    let store = FileStore::from_env();
    tracing::info!(root = %store.root().display(), "starting infrasketch MCP server");

    let service = InfraSketchServer::new(store)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}

const SERVER_KEY: &str = "infrasketch";

/// MCP clients `infrasketch-mcp init` can register the server with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentClient {
    ClaudeCode,
    Codex,
}

impl AgentClient {
    const ALL: [AgentClient; 2] = [AgentClient::ClaudeCode, AgentClient::Codex];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "claude" | "claude-code" => Some(Self::ClaudeCode),
            "codex" => Some(Self::Codex),
            _ => None,
        }
    }

    fn binary(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude",
            Self::Codex => "codex",
        }
    }

    fn config_path(self, dir: &Path) -> PathBuf {
        match self {
            Self::ClaudeCode => dir.join(".mcp.json"),
            Self::Codex => dir.join(".codex").join("config.toml"),
        }
    }

    /// Add or replace the `infrasketch` entry in this client's project
    /// config under `dir`, keeping every other entry.
    fn register(self, dir: &Path, command: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = self.config_path(dir);
        let existing = std::fs::read_to_string(&path).ok();
        let contents = match self {
            Self::ClaudeCode => merge_json_entry(existing.as_deref(), command)?,
            Self::Codex => merge_toml_entry(existing.as_deref(), command),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

/// Register the server with MCP clients for the current directory. Clients
/// named on the command line are used as given; otherwise every client found
/// on PATH is registered.
fn init_project(requested: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let clients: Vec<AgentClient> = if requested.is_empty() {
        AgentClient::ALL.into_iter().filter(|c| on_path(c.binary())).collect()
    } else {
        requested
            .iter()
            .map(|name| AgentClient::parse(name).ok_or_else(|| format!("unknown client: {name}")))
            .collect::<Result<Vec<_>, String>>()?
    };
    if clients.is_empty() {
        return Err("no MCP client found on PATH; pass one explicitly, e.g. `infrasketch-mcp init codex`".into());
    }

    let command = std::env::current_exe()?.canonicalize()?;
    let cwd = std::env::current_dir()?;
    for client in clients {
        let path = client.register(&cwd, &command.to_string_lossy())?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn on_path(binary: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths)
            .any(|dir| dir.join(binary).is_file() || dir.join(format!("{binary}.exe")).is_file())
    })
}

fn merge_json_entry(existing: Option<&str>, command: &str) -> serde_json::Result<String> {
    let mut root = existing
        .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
        .filter(serde_json::Value::is_object)
        .unwrap_or_else(|| serde_json::json!({}));
    if !root["mcpServers"].is_object() {
        root["mcpServers"] = serde_json::json!({});
    }
    root["mcpServers"][SERVER_KEY] = serde_json::json!({
        "type": "stdio",
        "command": command,
        "args": [],
    });
    serde_json::to_string_pretty(&root)
}

fn merge_toml_entry(existing: Option<&str>, command: &str) -> String {
    let mut doc: toml_edit::DocumentMut = existing
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    if !doc.contains_table("mcp_servers") {
        doc["mcp_servers"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let mut server = toml_edit::Table::new();
    server.insert("command", toml_edit::value(command));
    server.insert("args", toml_edit::value(toml_edit::Array::new()));
    doc["mcp_servers"][SERVER_KEY] = toml_edit::Item::Table(server);
    doc.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> (tempfile::TempDir, InfraSketchServer) {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = InfraSketchServer::new(FileStore::new(dir.path()));
        (dir, server)
    }

    #[test]
    fn strip_positions_removes_nested_coordinates_only() {
        let mut val = serde_json::json!({
            "nodes": [{"id": "a", "type": "vpc", "position": {"x": 1, "y": 2}}]
        });
        strip_positions(&mut val);
        assert_eq!(val, serde_json::json!({"nodes": [{"id": "a", "type": "vpc"}]}));
    }

    #[test]
    fn extract_then_scan_then_fix_round_trip() {
        let (_dir, server) = server();
        let saved = server
            .extract_text("an s3 bucket and an rds database", Some("data"))
            .unwrap();
        assert!(saved.starts_with("Saved graph 'data'"));
        assert_eq!(server.list_text().unwrap(), "data");

        let report = server.scan_text(Some("data"), None).unwrap();
        assert!(report.contains("ruleId=rds-encryption"));
        assert!(server.store.read_report("data").unwrap().is_some());

        let graph = server.store.read("data").unwrap();
        let rds = graph
            .nodes
            .iter()
            .find(|n| n.resource_type == infrasketch_core::ResourceType::Rds)
            .unwrap();
        let fixed = server
            .fix("data", &FindingRef::new("rds-encryption", rds.id.clone()))
            .unwrap();
        assert!(fixed.contains("\"encrypted\":true"));

        let stored = server.store.read_report("data").unwrap().unwrap();
        assert!(stored.findings.iter().all(|f| f.rule_id != "rds-encryption"));
    }

    #[test]
    fn scan_needs_exactly_one_source() {
        let (_dir, server) = server();
        assert!(server.scan_text(None, None).is_err());
        assert!(server.scan_text(Some("a"), Some("{}")).is_err());
        let inline = server
            .scan_text(None, Some(r#"{"nodes": [], "edges": []}"#))
            .unwrap();
        assert!(inline.starts_with("Security score: 100/100"));
    }

    #[test]
    fn set_graph_lays_out_and_rejects_dangling_edges() {
        let (_dir, server) = server();
        let data = r#"{"nodes": [
            {"id": "n1", "type": "vpc", "label": "VPC"},
            {"id": "n2", "type": "ec2", "label": "Web"}
        ], "edges": [{"id": "e1", "source": "n1", "target": "n2", "type": "containment"}]}"#;
        server.set("web", data).unwrap();
        let graph = server.store.read("web").unwrap();
        assert!(graph.nodes[1].position.y > graph.nodes[0].position.y);

        let bad = r#"{"nodes": [{"id": "n1", "type": "vpc", "label": "VPC"}],
                      "edges": [{"id": "e1", "source": "n1", "target": "gone"}]}"#;
        assert!(server.set("bad", bad).is_err());
        assert_eq!(server.list_text().unwrap(), "web");
    }

    #[test]
    fn get_graph_hides_positions_by_default() {
        let (_dir, server) = server();
        server.extract_text("a vpc", Some("net")).unwrap();
        assert!(!server.graph_text("net", false).unwrap().contains("\"position\""));
        assert!(server.graph_text("net", true).unwrap().contains("\"position\""));
        assert!(server.graph_text("missing", false).is_err());
    }

    #[test]
    fn rule_listing_marks_auto_fixes() {
        let text = format_rules(&RuleSet::builtin());
        assert!(text.contains("rds-encryption [high]"));
        assert!(text.lines().any(|l| l.starts_with("lambda-no-iam-role") && !l.contains("auto-fix")));
    }

    #[test]
    fn configure_ai_persists_and_hides_the_key() {
        let (dir, server) = server();
        let reply = server
            .configure(ConfigureAiRequest {
                provider: Some("OpenAI".into()),
                model: Some("gpt-4o".into()),
                api_key: None,
            })
            .unwrap();
        assert!(reply.contains("api key not set"));
        assert!(reply.contains("still needs"));

        let reply = server
            .configure(ConfigureAiRequest {
                provider: None,
                model: None,
                api_key: Some("sk-secret".into()),
            })
            .unwrap();
        assert!(!reply.contains("sk-secret"));
        assert!(reply.contains("generate_graph is ready"));

        let saved = read_settings(dir.path());
        assert_eq!(saved.provider, "openai");
        assert_eq!(saved.model, "gpt-4o");
        assert_eq!(saved.api_key, "sk-secret");
    }

    #[test]
    fn client_names_parse() {
        assert_eq!(AgentClient::parse("claude"), Some(AgentClient::ClaudeCode));
        assert_eq!(AgentClient::parse("codex"), Some(AgentClient::Codex));
        assert_eq!(AgentClient::parse("vim"), None);
    }

    #[test]
    fn register_merges_with_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".mcp.json"),
            r#"{"mcpServers": {"other": {"command": "x"}}}"#,
        )
        .unwrap();
        let path = AgentClient::ClaudeCode
            .register(dir.path(), "/bin/infrasketch-mcp")
            .unwrap();
        let root: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(root["mcpServers"]["other"]["command"], "x");
        assert_eq!(root["mcpServers"]["infrasketch"]["command"], "/bin/infrasketch-mcp");

        let path = AgentClient::Codex
            .register(dir.path(), "/bin/infrasketch-mcp")
            .unwrap();
        assert_eq!(path, dir.path().join(".codex").join("config.toml"));
        let toml = std::fs::read_to_string(path).unwrap();
        assert!(toml.contains("[mcp_servers.infrasketch]"));
        assert!(toml.contains("command = \"/bin/infrasketch-mcp\""));
    }

    #[test]
    fn malformed_json_config_is_replaced() {
        let merged = merge_json_entry(Some("[1, 2"), "/bin/x").unwrap();
        let root: serde_json::Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(root["mcpServers"]["infrasketch"]["command"], "/bin/x");
    }
}
