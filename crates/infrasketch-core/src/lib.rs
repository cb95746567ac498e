pub mod conventions;
pub mod error;
pub mod extract;
pub mod layout;
pub mod security;
pub mod settings;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

pub use error::GraphError;
pub use extract::extract;
pub use layout::{auto_layout, layer_of};
pub use security::{apply_fix, auto_fix, scan, Finding, FindingRef, RuleSet, SecurityReport, Severity};
pub use settings::AiSettings;
pub use store::{FileStore, GraphStore, StoreError};

// --- Types (matching the graph interchange schema) ---

/// Kind of infrastructure resource a node represents.
///
/// Serialized as the lower snake-case names used by the diagram editor.
/// Names outside the known set load as [`ResourceType::Other`] and are
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Vpc,
    Subnet,
    Ec2,
    Rds,
    LoadBalancer,
    S3,
    Lambda,
    SecurityGroup,
    IamRole,
    InternetGateway,
    NatGateway,
    CloudFront,
    ApiGateway,
    DynamoDb,
    Sqs,
    Sns,
    ElastiCache,
    Other(String),
}

impl ResourceType {
    pub const ALL: [ResourceType; 17] = [
        ResourceType::Vpc,
        ResourceType::Subnet,
        ResourceType::Ec2,
        ResourceType::Rds,
        ResourceType::LoadBalancer,
        ResourceType::S3,
        ResourceType::Lambda,
        ResourceType::SecurityGroup,
        ResourceType::IamRole,
        ResourceType::InternetGateway,
        ResourceType::NatGateway,
        ResourceType::CloudFront,
        ResourceType::ApiGateway,
        ResourceType::DynamoDb,
        ResourceType::Sqs,
        ResourceType::Sns,
        ResourceType::ElastiCache,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Vpc => "vpc",
            ResourceType::Subnet => "subnet",
            ResourceType::Ec2 => "ec2",
            ResourceType::Rds => "rds",
            ResourceType::LoadBalancer => "alb",
            ResourceType::S3 => "s3",
            ResourceType::Lambda => "lambda",
            ResourceType::SecurityGroup => "security_group",
            ResourceType::IamRole => "iam_role",
            ResourceType::InternetGateway => "internet_gateway",
            ResourceType::NatGateway => "nat_gateway",
            ResourceType::CloudFront => "cloudfront",
            ResourceType::ApiGateway => "api_gateway",
            ResourceType::DynamoDb => "dynamodb",
            ResourceType::Sqs => "sqs",
            ResourceType::Sns => "sns",
            ResourceType::ElastiCache => "elasticache",
            ResourceType::Other(name) => name,
        }
    }

    pub fn parse(name: &str) -> ResourceType {
        ResourceType::ALL
            .iter()
            .find(|t| t.as_str() == name)
            .cloned()
            .unwrap_or_else(|| ResourceType::Other(name.to_string()))
    }

    /// Default display label for a freshly created node of this type.
    pub fn display_name(&self) -> &str {
        match self {
            ResourceType::Vpc => "VPC",
            ResourceType::Subnet => "Subnet",
            ResourceType::Ec2 => "EC2 Instance",
            ResourceType::Rds => "RDS Database",
            ResourceType::LoadBalancer => "Load Balancer",
            ResourceType::S3 => "S3 Bucket",
            ResourceType::Lambda => "Lambda Function",
            ResourceType::SecurityGroup => "Security Group",
            ResourceType::IamRole => "IAM Role",
            ResourceType::InternetGateway => "Internet Gateway",
            ResourceType::NatGateway => "NAT Gateway",
            ResourceType::CloudFront => "CloudFront",
            ResourceType::ApiGateway => "API Gateway",
            ResourceType::DynamoDb => "DynamoDB Table",
            ResourceType::Sqs => "SQS Queue",
            ResourceType::Sns => "SNS Topic",
            ResourceType::ElastiCache => "ElastiCache",
            ResourceType::Other(name) => name,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ResourceType::parse(&name))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Per-type configuration values (CIDR blocks, encryption flags, sizes...).
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A single typed infrastructure element. Matches the diagram editor's node structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceNode {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub position: Position,
}

impl ResourceNode {
    pub fn new(id: impl Into<String>, resource_type: ResourceType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type,
            label: label.into(),
            properties: Properties::new(),
            position: Position::default(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// True only when the property is present and literally `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.properties.get(key).and_then(|v| v.as_bool()) == Some(true)
    }

    /// True only when the property is present and literally `false`.
    pub fn flag_is_false(&self, key: &str) -> bool {
        self.properties.get(key).and_then(|v| v.as_bool()) == Some(false)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Containment,
    Connection,
    Dependency,
}

/// A directed relationship between two nodes. Matches the diagram editor's edge structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EdgeKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            name: default_name(),
            region: default_region(),
            created_at: now,
            updated_at: now,
        }
    }
}

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<ResourceNode>,
    #[serde(default)]
    pub edges: Vec<ResourceEdge>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: GraphMetadata {
                name: name.into(),
                ..GraphMetadata::default()
            },
            ..Graph::default()
        }
    }

    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut ResourceNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn nodes_of<'a>(&'a self, t: &'a ResourceType) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.nodes.iter().filter(move |n| n.resource_type == *t)
    }

    pub fn has_type(&self, t: &ResourceType) -> bool {
        self.nodes.iter().any(|n| n.resource_type == *t)
    }

    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    /// Import a graph from interchange JSON.
    ///
    /// Structural problems (non-object root, missing or non-array `nodes`,
    /// non-array `edges`) are reported before typed decoding so callers get
    /// a message naming the offending field instead of a serde path.
    pub fn from_json(raw: &str) -> Result<Graph, GraphError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let root = value
            .as_object()
            .ok_or_else(|| GraphError::Structure("graph must be a JSON object".to_string()))?;

        match root.get("nodes") {
            Some(serde_json::Value::Array(_)) => {}
            Some(other) => {
                return Err(GraphError::Structure(format!(
                    "`nodes` must be an array, found {}",
                    json_kind(other)
                )))
            }
            None => return Err(GraphError::Structure("missing `nodes` array".to_string())),
        }
        match root.get("edges") {
            Some(serde_json::Value::Array(_)) | None => {}
            Some(other) => {
                return Err(GraphError::Structure(format!(
                    "`edges` must be an array, found {}",
                    json_kind(other)
                )))
            }
        }
        if let Some(meta) = root.get("metadata") {
            if !meta.is_object() {
                return Err(GraphError::Structure(format!(
                    "`metadata` must be an object, found {}",
                    json_kind(meta)
                )));
            }
        }

        let graph: Graph = serde_json::from_value(value)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Check referential integrity: unique ids, no dangling edges, no self-loops.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut node_ids: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(GraphError::Structure("node with empty id".to_string()));
            }
            if !node_ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        let mut edge_ids: HashSet<&str> = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(GraphError::DuplicateEdge(edge.id.clone()));
            }
            if edge.source == edge.target {
                return Err(GraphError::SelfLoop(edge.id.clone()));
            }
            for end in [&edge.source, &edge.target] {
                if !node_ids.contains(end.as_str()) {
                    return Err(GraphError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: end.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Generate an edge ID from source and target node IDs.
pub fn make_edge_id(source: &str, target: &str) -> String {
    format!("edge-{}-{}", source, target)
}
