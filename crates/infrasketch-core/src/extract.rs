//! Text-to-graph extraction.
//!
//! Free text is matched against an ordered keyword table; each matched
//! resource type becomes one or more node stubs, properties are inferred
//! from the whole text, implied resources are added, relationships are
//! paired by fixed rules and the result is auto-laid out. Nothing here can
//! fail: text that matches nothing yields an empty graph.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::layout::auto_layout;
use crate::{make_edge_id, EdgeKind, Graph, Properties, ResourceEdge, ResourceNode, ResourceType};

/// Upper bound on nodes materialised from a single quantity token.
pub const MAX_INSTANCES: usize = 4;

pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";
pub const DEFAULT_INSTANCE_CLASS: &str = "db.t3.micro";
pub const DEFAULT_ENGINE: &str = "postgres";

/// Surface phrases in match order. The first phrase of a type to match wins;
/// later synonyms for an already-matched type are ignored.
const KEYWORDS: &[(&str, ResourceType)] = &[
    ("vpc", ResourceType::Vpc),
    ("virtual private cloud", ResourceType::Vpc),
    ("subnet", ResourceType::Subnet),
    ("internet gateway", ResourceType::InternetGateway),
    ("igw", ResourceType::InternetGateway),
    ("nat gateway", ResourceType::NatGateway),
    ("nat", ResourceType::NatGateway),
    ("cloudfront", ResourceType::CloudFront),
    ("cdn", ResourceType::CloudFront),
    ("load balancer", ResourceType::LoadBalancer),
    ("alb", ResourceType::LoadBalancer),
    ("elb", ResourceType::LoadBalancer),
    ("api gateway", ResourceType::ApiGateway),
    ("ec2", ResourceType::Ec2),
    ("instance", ResourceType::Ec2),
    ("server", ResourceType::Ec2),
    ("virtual machine", ResourceType::Ec2),
    ("vm", ResourceType::Ec2),
    ("lambda", ResourceType::Lambda),
    ("serverless", ResourceType::Lambda),
    ("rds", ResourceType::Rds),
    ("database", ResourceType::Rds),
    ("postgres", ResourceType::Rds),
    ("postgresql", ResourceType::Rds),
    ("mysql", ResourceType::Rds),
    ("aurora", ResourceType::Rds),
    ("dynamodb", ResourceType::DynamoDb),
    ("nosql", ResourceType::DynamoDb),
    ("elasticache", ResourceType::ElastiCache),
    ("redis", ResourceType::ElastiCache),
    ("memcached", ResourceType::ElastiCache),
    ("cache", ResourceType::ElastiCache),
    ("s3", ResourceType::S3),
    ("bucket", ResourceType::S3),
    ("object storage", ResourceType::S3),
    ("sqs", ResourceType::Sqs),
    ("queue", ResourceType::Sqs),
    ("sns", ResourceType::Sns),
    ("topic", ResourceType::Sns),
    ("security group", ResourceType::SecurityGroup),
    ("firewall", ResourceType::SecurityGroup),
    ("iam role", ResourceType::IamRole),
    ("iam", ResourceType::IamRole),
];

const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

struct KeywordMatcher {
    resource: ResourceType,
    pattern: Regex,
    counted: Regex,
}

static MATCHERS: LazyLock<Vec<KeywordMatcher>> = LazyLock::new(|| {
    let numbers = format!(r"[0-9]+|{}", NUMBER_WORDS.join("|"));
    KEYWORDS
        .iter()
        .filter_map(|(phrase, resource)| {
            let body = phrase
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let pattern = Regex::new(&format!(r"\b{body}(?:e?s)?\b")).ok()?;
            // A count token right before the phrase, allowing one qualifier
            // in between ("2 private subnets").
            let counted = Regex::new(&format!(
                r"\b({numbers})\s+(?:([a-z][a-z-]*)\s+)?{body}(?:e?s)?\b"
            ))
            .ok()?;
            Some(KeywordMatcher {
                resource: resource.clone(),
                pattern,
                counted,
            })
        })
        .collect()
});

/// Keyword phrases containing hint words; masked before hints are read so
/// "virtual private cloud" does not ask for a private subnet.
static HINT_NEUTRAL_PHRASES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvirtual\s+private\s+clouds?\b").expect("valid regex"));
static ENCRYPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:encrypt(?:ed|ion|s)?|kms)\b").expect("valid regex"));
static PUBLIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bpublic\b").expect("valid regex"));
static PRIVATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bprivate\b").expect("valid regex"));
static MULTI_AZ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bmulti[- ]?az\b|\bhigh(?:ly)?[- ]availab").expect("valid regex")
});
static FLOW_LOGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bflow[- ]?logs?\b").expect("valid regex"));
static CIDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3}/\d{1,2})\b").expect("valid regex")
});
static INSTANCE_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:db\.)?[a-z][0-9][a-z]{0,3}\.(?:nano|micro|small|medium|large|[0-9]{0,2}xlarge|metal))\b")
        .expect("valid regex")
});
static ENGINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(postgres(?:ql)?|mysql|mariadb|aurora)\b").expect("valid regex"));
static REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:us|eu|ap|sa|ca|me|af)-(?:east|west|north|south|central|northeast|southeast|northwest|southwest)-\d)\b")
        .expect("valid regex")
});

/// Facts read from the whole description rather than a single match window.
#[derive(Debug, Default)]
struct TextHints {
    encrypted: bool,
    public: bool,
    private: bool,
    multi_az: bool,
    flow_logs: bool,
    cidrs: Vec<String>,
    instance_type: Option<String>,
    instance_class: Option<String>,
    engine: Option<String>,
    region: Option<String>,
}

impl TextHints {
    fn scan(lower: &str) -> Self {
        let mut instance_type = None;
        let mut instance_class = None;
        for m in INSTANCE_SIZE.find_iter(lower) {
            let token = m.as_str();
            if token.starts_with("db.") {
                instance_class.get_or_insert_with(|| token.to_string());
            } else {
                instance_type.get_or_insert_with(|| token.to_string());
            }
        }

        Self {
            encrypted: ENCRYPTION.is_match(lower),
            public: PUBLIC.is_match(lower),
            private: PRIVATE.is_match(lower),
            multi_az: MULTI_AZ.is_match(lower),
            flow_logs: FLOW_LOGS.is_match(lower),
            cidrs: CIDR
                .captures_iter(lower)
                .map(|c| c[1].to_string())
                .collect(),
            instance_type,
            instance_class,
            engine: ENGINE.captures(lower).map(|c| match &c[1] {
                "postgresql" => "postgres".to_string(),
                other => other.to_string(),
            }),
            region: REGION.captures(lower).map(|c| c[1].to_string()),
        }
    }
}

/// Convert a free-text description into a laid-out resource graph.
pub fn extract(text: &str) -> Graph {
    let lower = text.to_lowercase();
    let hints = TextHints::scan(&HINT_NEUTRAL_PHRASES.replace_all(&lower, "vpc"));

    let mut nodes: Vec<ResourceNode> = Vec::new();
    let mut matched: HashSet<ResourceType> = HashSet::new();
    for matcher in MATCHERS.iter() {
        if matched.contains(&matcher.resource) || !matcher.pattern.is_match(&lower) {
            continue;
        }
        matched.insert(matcher.resource.clone());
        let count = quantity(matcher, &lower);
        materialize(&mut nodes, &matcher.resource, count, &hints);
    }

    let vpc_named = matched.contains(&ResourceType::Vpc);
    add_implied(&mut nodes, &hints);
    assign_cidrs(&mut nodes, &hints.cidrs, vpc_named);
    for (i, node) in nodes.iter_mut().enumerate() {
        node.id = format!("node-{}", i + 1);
    }

    let mut graph = Graph::new("Extracted Architecture");
    if let Some(region) = hints.region {
        graph.metadata.region = region;
    }
    graph.edges = infer_edges(&nodes);
    graph.nodes = nodes;
    auto_layout(&mut graph);

    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "extracted graph from text"
    );
    graph
}

/// Count requested for this match, clamped to `1..=MAX_INSTANCES`.
///
/// The network container is never multiplied. A qualifier that itself names
/// another resource type ("4 redis servers") keeps the count with that type.
fn quantity(matcher: &KeywordMatcher, lower: &str) -> usize {
    if matcher.resource == ResourceType::Vpc {
        return 1;
    }
    matcher
        .counted
        .captures_iter(lower)
        .find(|c| {
            !c.get(2)
                .is_some_and(|q| names_other_resource(q.as_str(), &matcher.resource))
        })
        .and_then(|c| parse_count(&c[1]))
        .unwrap_or(1)
        .clamp(1, MAX_INSTANCES)
}

fn names_other_resource(word: &str, own: &ResourceType) -> bool {
    MATCHERS
        .iter()
        .any(|m| m.resource != *own && m.pattern.is_match(word))
}

/// Digit tokens too large for `usize` saturate so the cap still applies.
fn parse_count(token: &str) -> Option<usize> {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return Some(token.parse::<usize>().unwrap_or(usize::MAX));
    }
    NUMBER_WORDS
        .iter()
        .position(|w| *w == token)
        .map(|i| i + 1)
}

fn materialize(nodes: &mut Vec<ResourceNode>, t: &ResourceType, count: usize, hints: &TextHints) {
    if *t == ResourceType::Subnet {
        materialize_subnets(nodes, count, hints);
        return;
    }
    for i in 0..count {
        let label = numbered(t.display_name(), i, count);
        let mut node = ResourceNode::new(String::new(), t.clone(), label);
        node.properties = base_properties(t, hints);
        nodes.push(node);
    }
}

/// Both adjectives present means one public and one private subnet, never
/// more and never an ambiguous pair of untagged segments.
fn materialize_subnets(nodes: &mut Vec<ResourceNode>, count: usize, hints: &TextHints) {
    let subnet = |label: String, is_public: Option<bool>| {
        let mut node = ResourceNode::new(String::new(), ResourceType::Subnet, label);
        if let Some(p) = is_public {
            node.properties.insert("isPublic".to_string(), json!(p));
        }
        node
    };

    match (hints.public, hints.private) {
        (true, true) => {
            nodes.push(subnet("Public Subnet".to_string(), Some(true)));
            nodes.push(subnet("Private Subnet".to_string(), Some(false)));
        }
        (true, false) | (false, true) => {
            let (name, flag) = if hints.public {
                ("Public Subnet", true)
            } else {
                ("Private Subnet", false)
            };
            for i in 0..count {
                nodes.push(subnet(numbered(name, i, count), Some(flag)));
            }
        }
        (false, false) => {
            for i in 0..count {
                nodes.push(subnet(numbered("Subnet", i, count), None));
            }
        }
    }
}

fn numbered(base: &str, index: usize, count: usize) -> String {
    if count > 1 {
        format!("{} {}", base, index + 1)
    } else {
        base.to_string()
    }
}

fn base_properties(t: &ResourceType, hints: &TextHints) -> Properties {
    let mut props = Properties::new();
    match t {
        ResourceType::Vpc => {
            props.insert("flowLogsEnabled".into(), json!(hints.flow_logs));
        }
        ResourceType::Ec2 => {
            let size = hints.instance_type.as_deref().unwrap_or(DEFAULT_INSTANCE_TYPE);
            props.insert("instanceType".into(), json!(size));
            props.insert("ebsEncrypted".into(), json!(hints.encrypted));
        }
        ResourceType::Rds => {
            let engine = hints.engine.as_deref().unwrap_or(DEFAULT_ENGINE);
            let class = hints.instance_class.as_deref().unwrap_or(DEFAULT_INSTANCE_CLASS);
            props.insert("engine".into(), json!(engine));
            props.insert("instanceClass".into(), json!(class));
            props.insert("encrypted".into(), json!(hints.encrypted));
            props.insert("multiAz".into(), json!(hints.multi_az));
            props.insert("publiclyAccessible".into(), json!(false));
        }
        ResourceType::S3 => {
            props.insert("encrypted".into(), json!(hints.encrypted));
            props.insert("publicAccess".into(), json!(false));
        }
        ResourceType::DynamoDb | ResourceType::ElastiCache => {
            props.insert("encrypted".into(), json!(hints.encrypted));
        }
        ResourceType::SecurityGroup => {
            props.insert(
                "ingressRules".into(),
                json!([{ "protocol": "tcp", "port": 443, "cidr": "0.0.0.0/0" }]),
            );
        }
        _ => {}
    }
    props
}

/// A segment without a container gets a default VPC in front; compute or data
/// without a firewall gets one default security group at the end.
fn add_implied(nodes: &mut Vec<ResourceNode>, hints: &TextHints) {
    let needs_vpc = (has_type(nodes, &ResourceType::Subnet) || has_type(nodes, &ResourceType::NatGateway))
        && !has_type(nodes, &ResourceType::Vpc);
    if needs_vpc {
        let mut vpc = ResourceNode::new(String::new(), ResourceType::Vpc, "VPC");
        vpc.properties = base_properties(&ResourceType::Vpc, hints);
        nodes.insert(0, vpc);
    }

    let needs_sg = [ResourceType::Ec2, ResourceType::Rds, ResourceType::Lambda]
        .iter()
        .any(|t| has_type(nodes, t))
        && !has_type(nodes, &ResourceType::SecurityGroup);
    if needs_sg {
        let mut sg = ResourceNode::new(String::new(), ResourceType::SecurityGroup, "Security Group");
        sg.properties = base_properties(&ResourceType::SecurityGroup, hints);
        nodes.push(sg);
    }
}

fn has_type(nodes: &[ResourceNode], t: &ResourceType) -> bool {
    nodes.iter().any(|n| n.resource_type == *t)
}

/// Explicit CIDR tokens in order of appearance. The first belongs to the VPC
/// when the text names one (or there are no subnets to take it); the rest go
/// to subnets in creation order. Defaults fill the gaps.
fn assign_cidrs(nodes: &mut [ResourceNode], cidrs: &[String], vpc_named: bool) {
    let has_subnets = has_type(nodes, &ResourceType::Subnet);
    let (vpc_cidr, subnet_cidrs) = match cidrs.split_first() {
        Some((first, rest)) if vpc_named || !has_subnets => (Some(first.as_str()), rest),
        _ => (None, cidrs),
    };

    let mut subnet_index = 0usize;
    for node in nodes.iter_mut() {
        match node.resource_type {
            ResourceType::Vpc => {
                let cidr = vpc_cidr.unwrap_or(DEFAULT_VPC_CIDR);
                node.properties.insert("cidr".into(), json!(cidr));
            }
            ResourceType::Subnet => {
                let cidr = subnet_cidrs
                    .get(subnet_index)
                    .cloned()
                    .unwrap_or_else(|| format!("10.0.{}.0/24", subnet_index + 1));
                node.properties.insert("cidr".into(), json!(cidr));
                subnet_index += 1;
            }
            _ => {}
        }
    }
}

fn ids_of<'a>(nodes: &'a [ResourceNode], types: &[ResourceType]) -> Vec<&'a str> {
    nodes
        .iter()
        .filter(|n| types.contains(&n.resource_type))
        .map(|n| n.id.as_str())
        .collect()
}

/// Pair resources by fixed rules, in a fixed order. Rules whose endpoints
/// are absent contribute nothing.
fn infer_edges(nodes: &[ResourceNode]) -> Vec<ResourceEdge> {
    let vpcs = ids_of(nodes, &[ResourceType::Vpc]);
    let contained = ids_of(
        nodes,
        &[ResourceType::Subnet, ResourceType::InternetGateway, ResourceType::NatGateway],
    );
    let balancers = ids_of(nodes, &[ResourceType::LoadBalancer]);
    let instances = ids_of(nodes, &[ResourceType::Ec2]);
    let databases = ids_of(nodes, &[ResourceType::Rds]);
    let firewalls = ids_of(nodes, &[ResourceType::SecurityGroup]);
    let apis = ids_of(nodes, &[ResourceType::ApiGateway]);
    let functions = ids_of(nodes, &[ResourceType::Lambda]);
    let tables = ids_of(nodes, &[ResourceType::DynamoDb]);

    let mut edges = Vec::new();
    let mut pair = |sources: &[&str], targets: &[&str], label: &str, kind: EdgeKind| {
        for source in sources {
            for target in targets {
                edges.push(ResourceEdge {
                    id: make_edge_id(source, target),
                    source: source.to_string(),
                    target: target.to_string(),
                    label: Some(label.to_string()),
                    kind: Some(kind),
                });
            }
        }
    };

    // The network container holds segments and gateways; one container per graph.
    if let Some(vpc) = vpcs.first() {
        pair(&[*vpc], &contained, "contains", EdgeKind::Containment);
    }
    pair(&balancers, &instances, "routes to", EdgeKind::Connection);
    pair(&instances, &databases, "queries", EdgeKind::Dependency);
    let protected: Vec<&str> = instances.iter().chain(databases.iter()).copied().collect();
    pair(&firewalls, &protected, "protects", EdgeKind::Connection);
    pair(&apis, &functions, "invokes", EdgeKind::Connection);
    pair(&functions, &tables, "reads/writes", EdgeKind::Dependency);

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(g: &Graph, t: ResourceType) -> usize {
        g.nodes_of(&t).count()
    }

    #[test]
    fn empty_text_yields_empty_graph() {
        let g = extract("");
        assert!(g.nodes.is_empty());
        assert!(g.edges.is_empty());
    }

    #[test]
    fn unmatched_text_yields_empty_graph() {
        let g = extract("a lovely afternoon with tea and biscuits");
        assert!(g.nodes.is_empty());
    }

    #[test]
    fn synonyms_map_to_one_resource_type() {
        let g = extract("An ALB, also called a load balancer, in front of the app");
        assert_eq!(count(&g, ResourceType::LoadBalancer), 1);
    }

    #[test]
    fn server_does_not_fire_inside_serverless() {
        let g = extract("a serverless backend");
        assert_eq!(count(&g, ResourceType::Ec2), 0);
        assert_eq!(count(&g, ResourceType::Lambda), 1);
    }

    #[test]
    fn quantity_before_keyword_sets_count() {
        let g = extract("two EC2 instances behind a load balancer");
        assert_eq!(count(&g, ResourceType::Ec2), 2);
        let labels: Vec<&str> = g.nodes_of(&ResourceType::Ec2).map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["EC2 Instance 1", "EC2 Instance 2"]);
    }

    #[test]
    fn quantity_is_capped() {
        let g = extract("50 servers");
        assert_eq!(count(&g, ResourceType::Ec2), MAX_INSTANCES);
    }

    #[test]
    fn quantity_does_not_leak_to_other_types() {
        let g = extract("3 ec2 instances and a postgres database");
        assert_eq!(count(&g, ResourceType::Ec2), 3);
        assert_eq!(count(&g, ResourceType::Rds), 1);
    }

    #[test]
    fn counts_apply_to_edge_and_identity_resources() {
        let g = extract("two load balancers, 3 iam roles and two security groups in two vpcs");
        assert_eq!(count(&g, ResourceType::LoadBalancer), 2);
        assert_eq!(count(&g, ResourceType::IamRole), 3);
        assert_eq!(count(&g, ResourceType::SecurityGroup), 2);
        assert_eq!(count(&g, ResourceType::Vpc), 1);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn qualifier_naming_another_type_keeps_the_count() {
        let g = extract("4 redis servers");
        assert_eq!(count(&g, ResourceType::ElastiCache), 4);
        assert_eq!(count(&g, ResourceType::Ec2), 1);

        let g = extract("two mysql databases");
        assert_eq!(count(&g, ResourceType::Rds), 2);
    }

    #[test]
    fn oversized_count_saturates_to_cap() {
        let g = extract("99999999999999999999 servers");
        assert_eq!(count(&g, ResourceType::Ec2), MAX_INSTANCES);
    }

    #[test]
    fn public_and_private_yield_exactly_two_subnets() {
        let g = extract("a vpc with 3 public and private subnets");
        let subnets: Vec<&ResourceNode> = g.nodes_of(&ResourceType::Subnet).collect();
        assert_eq!(subnets.len(), 2);
        assert!(subnets[0].flag("isPublic"));
        assert!(subnets[1].flag_is_false("isPublic"));
    }

    #[test]
    fn single_adjective_applies_to_every_subnet() {
        let g = extract("two private subnets");
        let subnets: Vec<&ResourceNode> = g.nodes_of(&ResourceType::Subnet).collect();
        assert_eq!(subnets.len(), 2);
        assert!(subnets.iter().all(|s| s.flag_is_false("isPublic")));
    }

    #[test]
    fn virtual_private_cloud_is_not_a_subnet_hint() {
        let g = extract("a virtual private cloud with two public subnets");
        assert_eq!(count(&g, ResourceType::Vpc), 1);
        let subnets: Vec<&ResourceNode> = g.nodes_of(&ResourceType::Subnet).collect();
        assert_eq!(subnets.len(), 2);
        assert!(subnets.iter().all(|s| s.flag("isPublic")));
    }

    #[test]
    fn subnet_implies_vpc_first() {
        let g = extract("a subnet");
        assert_eq!(g.nodes[0].resource_type, ResourceType::Vpc);
        assert_eq!(count(&g, ResourceType::Vpc), 1);
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.edges[0].kind, Some(EdgeKind::Containment));
        assert_eq!(g.edges[0].id, "edge-node-1-node-2");
    }

    #[test]
    fn compute_implies_one_security_group() {
        let g = extract("two servers and a database");
        assert_eq!(count(&g, ResourceType::SecurityGroup), 1);
        assert_eq!(g.nodes.last().map(|n| &n.resource_type), Some(&ResourceType::SecurityGroup));
    }

    #[test]
    fn explicit_firewall_suppresses_implied_one() {
        let g = extract("a server protected by a firewall");
        assert_eq!(count(&g, ResourceType::SecurityGroup), 1);
    }

    #[test]
    fn encryption_words_set_flags() {
        let g = extract("an encrypted s3 bucket and an rds database");
        assert!(g.nodes_of(&ResourceType::S3).all(|n| n.flag("encrypted")));
        assert!(g.nodes_of(&ResourceType::Rds).all(|n| n.flag("encrypted")));

        let g = extract("an s3 bucket");
        assert!(g.nodes_of(&ResourceType::S3).all(|n| n.flag_is_false("encrypted")));
    }

    #[test]
    fn cidr_and_instance_size_tokens_are_applied() {
        let g = extract("vpc 172.16.0.0/16 with subnets and an m5.large server");
        let vpc = g.nodes_of(&ResourceType::Vpc).next().unwrap();
        assert_eq!(vpc.properties["cidr"], "172.16.0.0/16");
        let subnet = g.nodes_of(&ResourceType::Subnet).next().unwrap();
        assert_eq!(subnet.properties["cidr"], "10.0.1.0/24");
        let ec2 = g.nodes_of(&ResourceType::Ec2).next().unwrap();
        assert_eq!(ec2.properties["instanceType"], "m5.large");
    }

    #[test]
    fn cidr_goes_to_subnet_when_vpc_is_implied() {
        let g = extract("a subnet 10.0.5.0/24");
        let vpc = g.nodes_of(&ResourceType::Vpc).next().unwrap();
        assert_eq!(vpc.properties["cidr"], DEFAULT_VPC_CIDR);
        let subnet = g.nodes_of(&ResourceType::Subnet).next().unwrap();
        assert_eq!(subnet.properties["cidr"], "10.0.5.0/24");
    }

    #[test]
    fn defaults_fill_missing_tokens() {
        let g = extract("public and private subnets and a server");
        let cidrs: Vec<&serde_json::Value> = g
            .nodes
            .iter()
            .filter_map(|n| n.properties.get("cidr"))
            .collect();
        assert_eq!(cidrs, vec![&json!(DEFAULT_VPC_CIDR), &json!("10.0.1.0/24"), &json!("10.0.2.0/24")]);
        let ec2 = g.nodes_of(&ResourceType::Ec2).next().unwrap();
        assert_eq!(ec2.properties["instanceType"], DEFAULT_INSTANCE_TYPE);
    }

    #[test]
    fn database_instance_class_does_not_leak_into_compute() {
        let g = extract("a db.r5.large mysql database and a server");
        let rds = g.nodes_of(&ResourceType::Rds).next().unwrap();
        assert_eq!(rds.properties["instanceClass"], "db.r5.large");
        assert_eq!(rds.properties["engine"], "mysql");
        let ec2 = g.nodes_of(&ResourceType::Ec2).next().unwrap();
        assert_eq!(ec2.properties["instanceType"], DEFAULT_INSTANCE_TYPE);
    }

    #[test]
    fn three_tier_relationships() {
        let g = extract("a load balancer routing to two ec2 instances that query an rds database");
        let has_edge = |label: &str, from: &ResourceType, to: &ResourceType| {
            g.edges.iter().any(|e| {
                e.label.as_deref() == Some(label)
                    && g.node(&e.source).map(|n| &n.resource_type) == Some(from)
                    && g.node(&e.target).map(|n| &n.resource_type) == Some(to)
            })
        };
        assert!(has_edge("routes to", &ResourceType::LoadBalancer, &ResourceType::Ec2));
        assert!(has_edge("queries", &ResourceType::Ec2, &ResourceType::Rds));
        assert!(has_edge("protects", &ResourceType::SecurityGroup, &ResourceType::Ec2));
        assert!(has_edge("protects", &ResourceType::SecurityGroup, &ResourceType::Rds));
        // 2 routes + 2 queries + 3 protects
        assert_eq!(g.edges.len(), 7);
    }

    #[test]
    fn serverless_relationships() {
        let g = extract("api gateway invoking a lambda backed by dynamodb");
        let labels: Vec<&str> = g.edges.iter().filter_map(|e| e.label.as_deref()).collect();
        assert!(labels.contains(&"invokes"));
        assert!(labels.contains(&"reads/writes"));
        assert_eq!(count(&g, ResourceType::SecurityGroup), 1);
    }

    #[test]
    fn region_token_sets_metadata() {
        let g = extract("deploy a vpc in eu-west-1");
        assert_eq!(g.metadata.region, "eu-west-1");
    }

    #[test]
    fn extracted_graph_is_valid_and_positioned() {
        let g = extract("vpc with public and private subnets, nat gateway, 2 servers, redis cache, s3 bucket");
        assert!(g.validate().is_ok());
        assert!(!crate::layout::needs_layout(&g));
    }
}
