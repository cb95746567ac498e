//! Static security scanning of resource graphs.
//!
//! A [`RuleSet`] is an explicit, immutable list of rule descriptors that the
//! caller constructs once and passes to [`scan`]. Every rule is checked
//! against every node with the full node list available for cross-node
//! checks; each firing (rule, node) pair yields exactly one [`Finding`].

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{Graph, Properties, ResourceNode, ResourceType};

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points deducted from the score per finding of this severity.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Critical => 25,
            Severity::High => 15,
            Severity::Medium => 8,
            Severity::Low => 3,
            Severity::Info => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Compliance frameworks a rule violation counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceTag {
    #[serde(rename = "CIS")]
    Cis,
    #[serde(rename = "SOC2")]
    Soc2,
    #[serde(rename = "ISO27001")]
    Iso27001,
    #[serde(rename = "GDPR")]
    Gdpr,
    #[serde(rename = "HIPAA")]
    Hipaa,
}

pub type CheckFn = fn(&ResourceNode, &[ResourceNode]) -> bool;
pub type FixFn = fn(&ResourceNode) -> Properties;

/// A declarative security rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub recommendation: &'static str,
    pub compliance: &'static [ComplianceTag],
    /// Returns true when `node` violates the rule. The second argument is every node in the graph.
    pub check: CheckFn,
    /// Property patch that resolves the violation, when one exists.
    pub auto_fix: Option<FixFn>,
}

/// Ordered, immutable collection of rules handed to [`scan`].
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The standard cloud security rule set.
    pub fn builtin() -> Self {
        Self::new(builtin_rules())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Identifies a finding by the rule that fired and the node it fired on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FindingRef {
    /// Rule id, e.g. "rds-encryption"
    pub rule_id: String,
    /// Node id the rule fired on, e.g. "node-3"
    pub node_id: String,
}

impl FindingRef {
    pub fn new(rule_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            node_id: node_id.into(),
        }
    }

    /// Display id. Never parsed back; use the fields.
    pub fn display_id(&self) -> String {
        format!("{}:{}", self.rule_id, self.node_id)
    }
}

/// One rule violation on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub rule_id: String,
    pub node_id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub compliance: Vec<ComplianceTag>,
    pub auto_fixable: bool,
}

impl Finding {
    pub fn key(&self) -> FindingRef {
        FindingRef::new(self.rule_id.clone(), self.node_id.clone())
    }
}

/// Per-framework compliance percentages (0–100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compliance {
    pub iso27001: u8,
    pub gdpr: u8,
    pub hipaa: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub findings: Vec<Finding>,
    pub score: u8,
    pub scanned_at: DateTime<Utc>,
    pub compliance: Compliance,
}

/// Summary of findings by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl SecurityReport {
    pub fn summary(&self) -> SeveritySummary {
        let mut summary = SeveritySummary::default();
        for f in &self.findings {
            match f.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixError {
    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    #[error("node '{0}' not found")]
    UnknownNode(String),

    #[error("rule '{0}' has no automatic fix; add the missing resource instead")]
    NoAutoFix(String),

    #[error("rule '{rule}' does not fire on node '{node}'")]
    NotApplicable { rule: String, node: String },
}

/// Evaluate every rule against every node and score the result.
pub fn scan(graph: &Graph, rules: &RuleSet) -> SecurityReport {
    let mut seen: HashSet<FindingRef> = HashSet::new();
    let mut findings = Vec::new();

    for node in &graph.nodes {
        for rule in rules.rules() {
            if !(rule.check)(node, &graph.nodes) {
                continue;
            }
            let key = FindingRef::new(rule.id, node.id.clone());
            if !seen.insert(key.clone()) {
                continue;
            }
            findings.push(Finding {
                id: key.display_id(),
                rule_id: key.rule_id,
                node_id: key.node_id,
                severity: rule.severity,
                title: rule.name.to_string(),
                description: format!("{} Affected resource: {}.", rule.description, node.label),
                recommendation: rule.recommendation.to_string(),
                compliance: rule.compliance.to_vec(),
                auto_fixable: rule.auto_fix.is_some(),
            });
        }
    }

    // Display order only; stable, so equal severities keep evaluation order.
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));

    let report = SecurityReport {
        score: score(&findings),
        compliance: compliance(&findings),
        findings,
        scanned_at: Utc::now(),
    };
    tracing::debug!(
        nodes = graph.nodes.len(),
        findings = report.findings.len(),
        score = report.score,
        "security scan complete"
    );
    report
}

/// `max(0, 100 - sum of severity weights)`.
pub fn score(findings: &[Finding]) -> u8 {
    let penalty: u32 = findings.iter().map(|f| f.severity.weight()).sum();
    100u32.saturating_sub(penalty) as u8
}

/// Linear penalty of 20 points per tagged finding, per framework.
pub fn compliance(findings: &[Finding]) -> Compliance {
    let (mut iso, mut gdpr, mut hipaa) = (0u32, 0u32, 0u32);
    for f in findings {
        let tagged = |tags: &[ComplianceTag]| f.compliance.iter().any(|t| tags.contains(t));
        if tagged(&[ComplianceTag::Cis, ComplianceTag::Soc2, ComplianceTag::Iso27001]) {
            iso += 1;
        }
        if tagged(&[ComplianceTag::Gdpr]) {
            gdpr += 1;
        }
        if tagged(&[ComplianceTag::Hipaa]) {
            hipaa += 1;
        }
    }
    let pct = |count: u32| 100u32.saturating_sub(count * 20) as u8;
    Compliance {
        iso27001: pct(iso),
        gdpr: pct(gdpr),
        hipaa: pct(hipaa),
    }
}

/// Compute the property patch that resolves a finding without applying it.
pub fn auto_fix(graph: &Graph, rules: &RuleSet, key: &FindingRef) -> Result<Properties, FixError> {
    let rule = rules
        .get(&key.rule_id)
        .ok_or_else(|| FixError::UnknownRule(key.rule_id.clone()))?;
    let node = graph
        .node(&key.node_id)
        .ok_or_else(|| FixError::UnknownNode(key.node_id.clone()))?;
    let fix = rule
        .auto_fix
        .ok_or_else(|| FixError::NoAutoFix(rule.id.to_string()))?;
    if !(rule.check)(node, &graph.nodes) {
        return Err(FixError::NotApplicable {
            rule: rule.id.to_string(),
            node: node.id.clone(),
        });
    }
    Ok(fix(node))
}

/// Merge the fix patch into the node's properties. Keys outside the patch are untouched.
pub fn apply_fix(graph: &mut Graph, rules: &RuleSet, key: &FindingRef) -> Result<Properties, FixError> {
    let patch = auto_fix(graph, rules, key)?;
    let node = graph
        .node_mut(&key.node_id)
        .ok_or_else(|| FixError::UnknownNode(key.node_id.clone()))?;
    for (k, v) in &patch {
        node.properties.insert(k.clone(), v.clone());
    }
    graph.touch();
    tracing::debug!(rule = %key.rule_id, node = %key.node_id, "applied auto-fix");
    Ok(patch)
}

// --- Built-in rules ---

fn any_of(all: &[ResourceNode], t: ResourceType) -> bool {
    all.iter().any(|n| n.resource_type == t)
}

fn patch(key: &str, value: Value) -> Properties {
    let mut p = Properties::new();
    p.insert(key.to_string(), value);
    p
}

fn ingress_rules(node: &ResourceNode) -> &[Value] {
    node.properties
        .get("ingressRules")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Ingress from anywhere on every port.
fn is_open_ingress(rule: &Value) -> bool {
    let cidr = rule
        .get("cidr")
        .or_else(|| rule.get("cidrBlock"))
        .and_then(|v| v.as_str());
    let port = rule
        .get("port")
        .or_else(|| rule.get("fromPort"))
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())));
    cidr == Some("0.0.0.0/0") && matches!(port, Some(0) | Some(-1))
}

fn builtin_rules() -> Vec<Rule> {
    use ComplianceTag::*;

    vec![
        Rule {
            id: "rds-encryption",
            name: "Database encryption disabled",
            description: "The RDS database does not encrypt data at rest.",
            severity: Severity::High,
            recommendation: "Enable storage encryption with a KMS key.",
            compliance: &[Cis, Soc2, Hipaa, Gdpr],
            check: |n, _| n.resource_type == ResourceType::Rds && !n.flag("encrypted"),
            auto_fix: Some(|_| patch("encrypted", json!(true))),
        },
        Rule {
            id: "s3-encryption",
            name: "Bucket encryption disabled",
            description: "The S3 bucket does not encrypt objects at rest.",
            severity: Severity::High,
            recommendation: "Enable default server-side encryption (SSE-S3 or SSE-KMS).",
            compliance: &[Cis, Soc2, Hipaa, Gdpr],
            check: |n, _| n.resource_type == ResourceType::S3 && !n.flag("encrypted"),
            auto_fix: Some(|_| patch("encrypted", json!(true))),
        },
        Rule {
            id: "ec2-no-security-group",
            name: "Compute without firewall",
            description: "An EC2 instance exists but the graph has no security group.",
            severity: Severity::Critical,
            recommendation: "Add a security group that restricts inbound traffic to the instance.",
            compliance: &[Cis, Soc2],
            check: |n, all| {
                n.resource_type == ResourceType::Ec2 && !any_of(all, ResourceType::SecurityGroup)
            },
            auto_fix: None,
        },
        Rule {
            id: "sg-open-ingress",
            name: "Overly permissive firewall rule",
            description: "The security group allows inbound traffic from 0.0.0.0/0 on all ports.",
            severity: Severity::Critical,
            recommendation: "Restrict ingress to the specific ports and source ranges the workload needs.",
            compliance: &[Cis, Soc2, Iso27001],
            check: |n, _| {
                n.resource_type == ResourceType::SecurityGroup
                    && ingress_rules(n).iter().any(is_open_ingress)
            },
            auto_fix: Some(|n| {
                let kept: Vec<Value> = ingress_rules(n)
                    .iter()
                    .filter(|r| !is_open_ingress(r))
                    .cloned()
                    .collect();
                patch("ingressRules", Value::Array(kept))
            }),
        },
        Rule {
            id: "vpc-flow-logs",
            name: "Network flow logging disabled",
            description: "The VPC does not record flow logs.",
            severity: Severity::Medium,
            recommendation: "Enable VPC flow logs to CloudWatch Logs or S3.",
            compliance: &[Cis, Soc2, Iso27001],
            check: |n, _| n.resource_type == ResourceType::Vpc && !n.flag("flowLogsEnabled"),
            auto_fix: Some(|_| patch("flowLogsEnabled", json!(true))),
        },
        Rule {
            id: "rds-public-access",
            name: "Publicly accessible database",
            description: "The RDS database accepts connections from the public internet.",
            severity: Severity::Critical,
            recommendation: "Disable public accessibility and reach the database from inside the VPC.",
            compliance: &[Cis, Soc2, Hipaa, Gdpr],
            check: |n, _| n.resource_type == ResourceType::Rds && n.flag("publiclyAccessible"),
            auto_fix: Some(|_| patch("publiclyAccessible", json!(false))),
        },
        Rule {
            id: "lambda-no-iam-role",
            name: "Function without access role",
            description: "A Lambda function exists but the graph has no IAM role.",
            severity: Severity::Medium,
            recommendation: "Add a least-privilege IAM execution role for the function.",
            compliance: &[Cis, Iso27001],
            check: |n, all| n.resource_type == ResourceType::Lambda && !any_of(all, ResourceType::IamRole),
            auto_fix: None,
        },
        Rule {
            id: "s3-public-access",
            name: "Bucket publicly accessible",
            description: "The S3 bucket allows public access.",
            severity: Severity::High,
            recommendation: "Enable S3 Block Public Access and serve content through CloudFront.",
            compliance: &[Cis, Soc2, Gdpr],
            check: |n, _| n.resource_type == ResourceType::S3 && n.flag("publicAccess"),
            auto_fix: Some(|_| patch("publicAccess", json!(false))),
        },
        Rule {
            id: "subnet-no-nat",
            name: "Private subnet without NAT",
            description: "A private subnet exists but the graph has no NAT gateway for outbound traffic.",
            severity: Severity::Low,
            recommendation: "Add a NAT gateway in a public subnet for outbound access from private subnets.",
            compliance: &[Iso27001],
            check: |n, all| {
                n.resource_type == ResourceType::Subnet
                    && n.flag_is_false("isPublic")
                    && !any_of(all, ResourceType::NatGateway)
            },
            auto_fix: None,
        },
        Rule {
            id: "rds-multi-az",
            name: "Database not multi-AZ",
            description: "The RDS database runs in a single availability zone.",
            severity: Severity::Medium,
            recommendation: "Enable Multi-AZ deployment for automatic failover.",
            compliance: &[Soc2, Iso27001],
            check: |n, _| n.resource_type == ResourceType::Rds && !n.flag("multiAz"),
            auto_fix: Some(|_| patch("multiAz", json!(true))),
        },
        Rule {
            id: "ec2-ebs-encryption",
            name: "Compute volume not encrypted",
            description: "The EC2 instance's EBS volumes are not encrypted.",
            severity: Severity::Medium,
            recommendation: "Enable EBS encryption by default for the account or instance.",
            compliance: &[Cis, Hipaa],
            check: |n, _| n.resource_type == ResourceType::Ec2 && !n.flag("ebsEncrypted"),
            auto_fix: Some(|_| patch("ebsEncrypted", json!(true))),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: Vec<ResourceNode>) -> Graph {
        let mut g = Graph::new("scan");
        g.nodes = nodes;
        g
    }

    fn rds(id: &str) -> ResourceNode {
        ResourceNode::new(id, ResourceType::Rds, "Database")
            .with_property("encrypted", false)
            .with_property("multiAz", false)
    }

    fn rule_ids(report: &SecurityReport) -> Vec<&str> {
        report.findings.iter().map(|f| f.rule_id.as_str()).collect()
    }

    #[test]
    fn builtin_rule_ids_are_unique() {
        let rules = RuleSet::builtin();
        let ids: HashSet<&str> = rules.rules().iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), rules.len());
        assert_eq!(rules.len(), 11);
    }

    #[test]
    fn empty_graph_scores_perfectly() {
        let report = scan(&Graph::default(), &RuleSet::builtin());
        assert!(report.findings.is_empty());
        assert_eq!(report.score, 100);
        assert_eq!(
            report.compliance,
            Compliance {
                iso27001: 100,
                gdpr: 100,
                hipaa: 100
            }
        );
    }

    #[test]
    fn unencrypted_single_az_database() {
        let report = scan(&graph(vec![rds("db")]), &RuleSet::builtin());
        assert_eq!(rule_ids(&report), vec!["rds-encryption", "rds-multi-az"]);
        assert_eq!(report.findings[0].severity, Severity::High);
        assert_eq!(report.findings[1].severity, Severity::Medium);
        assert_eq!(report.score, 100 - 15 - 8);
        assert_eq!(
            report.compliance,
            Compliance {
                iso27001: 60,
                gdpr: 80,
                hipaa: 80
            }
        );
    }

    #[test]
    fn findings_sorted_by_severity_descending() {
        let g = graph(vec![
            rds("db"),
            ResourceNode::new("vm", ResourceType::Ec2, "App").with_property("ebsEncrypted", true),
        ]);
        let report = scan(&g, &RuleSet::builtin());
        let severities: Vec<Severity> = report.findings.iter().map(|f| f.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
        assert_eq!(report.findings[0].rule_id, "ec2-no-security-group");
    }

    #[test]
    fn score_floors_at_zero() {
        let nodes = (0..5)
            .map(|i| ResourceNode::new(format!("vm-{i}"), ResourceType::Ec2, "App"))
            .collect();
        let report = scan(&graph(nodes), &RuleSet::builtin());
        assert_eq!(report.findings.len(), 10);
        assert_eq!(report.score, 0);
        assert_eq!(report.compliance.iso27001, 0);
    }

    #[test]
    fn cross_node_rules_see_whole_graph() {
        let lonely = scan(
            &graph(vec![ResourceNode::new("fn", ResourceType::Lambda, "Fn")]),
            &RuleSet::builtin(),
        );
        assert_eq!(rule_ids(&lonely), vec!["lambda-no-iam-role"]);

        let with_role = scan(
            &graph(vec![
                ResourceNode::new("fn", ResourceType::Lambda, "Fn"),
                ResourceNode::new("role", ResourceType::IamRole, "Role"),
            ]),
            &RuleSet::builtin(),
        );
        assert!(with_role.findings.is_empty());
    }

    #[test]
    fn private_subnet_needs_nat() {
        let subnet = ResourceNode::new("s", ResourceType::Subnet, "Private").with_property("isPublic", false);
        let report = scan(&graph(vec![subnet.clone()]), &RuleSet::builtin());
        assert_eq!(rule_ids(&report), vec!["subnet-no-nat"]);
        assert_eq!(report.score, 97);

        let with_nat = graph(vec![subnet, ResourceNode::new("n", ResourceType::NatGateway, "NAT")]);
        assert!(scan(&with_nat, &RuleSet::builtin()).findings.is_empty());

        let untagged = graph(vec![ResourceNode::new("s", ResourceType::Subnet, "Subnet")]);
        assert!(scan(&untagged, &RuleSet::builtin()).findings.is_empty());
    }

    #[test]
    fn open_ingress_detection() {
        let open = ResourceNode::new("sg", ResourceType::SecurityGroup, "SG").with_property(
            "ingressRules",
            json!([
                {"protocol": "tcp", "port": 443, "cidr": "0.0.0.0/0"},
                {"protocol": "-1", "fromPort": -1, "cidrBlock": "0.0.0.0/0"}
            ]),
        );
        let report = scan(&graph(vec![open]), &RuleSet::builtin());
        assert_eq!(rule_ids(&report), vec!["sg-open-ingress"]);

        let narrow = ResourceNode::new("sg", ResourceType::SecurityGroup, "SG").with_property(
            "ingressRules",
            json!([{"protocol": "tcp", "port": 0, "cidr": "10.0.0.0/16"}]),
        );
        assert!(scan(&graph(vec![narrow]), &RuleSet::builtin()).findings.is_empty());
    }

    #[test]
    fn open_ingress_fix_drops_only_wildcard_rules() {
        let mut g = graph(vec![ResourceNode::new("sg", ResourceType::SecurityGroup, "SG")
            .with_property(
                "ingressRules",
                json!([
                    {"protocol": "tcp", "port": 443, "cidr": "0.0.0.0/0"},
                    {"protocol": "all", "port": 0, "cidr": "0.0.0.0/0"}
                ]),
            )]);
        let rules = RuleSet::builtin();
        apply_fix(&mut g, &rules, &FindingRef::new("sg-open-ingress", "sg")).unwrap();
        assert_eq!(
            g.nodes[0].properties["ingressRules"],
            json!([{"protocol": "tcp", "port": 443, "cidr": "0.0.0.0/0"}])
        );
        assert!(scan(&g, &rules).findings.is_empty());
    }

    #[test]
    fn scan_is_idempotent() {
        let g = graph(vec![
            rds("db"),
            ResourceNode::new("bucket", ResourceType::S3, "Assets").with_property("publicAccess", true),
            ResourceNode::new("vpc", ResourceType::Vpc, "VPC"),
        ]);
        let rules = RuleSet::builtin();
        let a = scan(&g, &rules);
        let b = scan(&g, &rules);
        assert_eq!(a.findings, b.findings);
        assert_eq!(a.score, b.score);
        assert_eq!(a.compliance, b.compliance);
    }

    #[test]
    fn publicly_accessible_database_is_critical_and_fixable() {
        let db = rds("db")
            .with_property("encrypted", true)
            .with_property("multiAz", true)
            .with_property("publiclyAccessible", true);
        let mut g = graph(vec![db]);
        let rules = RuleSet::builtin();

        let report = scan(&g, &rules);
        assert_eq!(rule_ids(&report), vec!["rds-public-access"]);
        assert_eq!(report.findings[0].severity, Severity::Critical);
        assert!(report.findings[0].auto_fixable);
        assert_eq!(report.score, 100 - 25);
        assert_eq!(
            report.compliance,
            Compliance {
                iso27001: 80,
                gdpr: 80,
                hipaa: 80
            }
        );

        let patch = apply_fix(&mut g, &rules, &FindingRef::new("rds-public-access", "db")).unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["publiclyAccessible"], json!(false));
        assert!(g.node("db").unwrap().flag("encrypted"));
        assert!(scan(&g, &rules).findings.is_empty());
    }

    #[test]
    fn public_bucket_is_high_and_fixable() {
        let bucket = ResourceNode::new("bucket", ResourceType::S3, "Assets")
            .with_property("encrypted", true)
            .with_property("publicAccess", true);
        let mut g = graph(vec![bucket]);
        let rules = RuleSet::builtin();

        let report = scan(&g, &rules);
        assert_eq!(rule_ids(&report), vec!["s3-public-access"]);
        assert_eq!(report.findings[0].severity, Severity::High);
        assert_eq!(report.score, 100 - 15);
        assert_eq!(
            report.compliance,
            Compliance {
                iso27001: 80,
                gdpr: 80,
                hipaa: 100
            }
        );

        let patch = apply_fix(&mut g, &rules, &FindingRef::new("s3-public-access", "bucket")).unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["publicAccess"], json!(false));
        assert!(g.node("bucket").unwrap().flag("encrypted"));
        assert!(scan(&g, &rules).findings.is_empty());
    }

    #[test]
    fn database_encryption_fix_only_touches_encrypted() {
        let mut g = graph(vec![rds("db").with_property("engine", "postgres")]);
        let rules = RuleSet::builtin();
        let key = FindingRef::new("rds-encryption", "db");

        let patch = auto_fix(&g, &rules, &key).unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["encrypted"], json!(true));

        apply_fix(&mut g, &rules, &key).unwrap();
        let node = g.node("db").unwrap();
        assert!(node.flag("encrypted"));
        assert_eq!(node.properties["multiAz"], json!(false));
        assert_eq!(node.properties["engine"], json!("postgres"));
    }

    #[test]
    fn fix_errors() {
        let g = graph(vec![
            ResourceNode::new("vm", ResourceType::Ec2, "App"),
            rds("db").with_property("encrypted", true),
        ]);
        let rules = RuleSet::builtin();
        assert_eq!(
            auto_fix(&g, &rules, &FindingRef::new("ec2-no-security-group", "vm")),
            Err(FixError::NoAutoFix("ec2-no-security-group".into()))
        );
        assert_eq!(
            auto_fix(&g, &rules, &FindingRef::new("nope", "vm")),
            Err(FixError::UnknownRule("nope".into()))
        );
        assert_eq!(
            auto_fix(&g, &rules, &FindingRef::new("rds-encryption", "ghost")),
            Err(FixError::UnknownNode("ghost".into()))
        );
        assert!(matches!(
            auto_fix(&g, &rules, &FindingRef::new("rds-encryption", "db")),
            Err(FixError::NotApplicable { .. })
        ));
    }

    #[test]
    fn finding_key_survives_dashed_ids() {
        let report = scan(&graph(vec![rds("node-1-db")]), &RuleSet::builtin());
        let f = &report.findings[0];
        assert_eq!(f.key(), FindingRef::new("rds-encryption", "node-1-db"));
        assert_eq!(f.id, "rds-encryption:node-1-db");
    }

    #[test]
    fn report_serializes_interchange_shape() {
        let report = scan(&graph(vec![rds("db")]), &RuleSet::builtin());
        let v = serde_json::to_value(&report).unwrap();
        assert!(v["scannedAt"].is_string());
        assert_eq!(v["compliance"]["iso27001"], 60);
        assert_eq!(v["findings"][0]["severity"], "high");
        assert_eq!(v["findings"][0]["compliance"][0], "CIS");
        assert_eq!(v["findings"][0]["autoFixable"], true);
    }

    #[test]
    fn summary_counts_by_severity() {
        let report = scan(&graph(vec![rds("db")]), &RuleSet::builtin());
        let s = report.summary();
        assert_eq!((s.high, s.medium, s.total), (1, 1, 2));
    }
}
