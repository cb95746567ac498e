//! Layered auto-layout.
//!
//! Every resource type maps to a fixed vertical layer, so the arrangement is
//! deterministic and needs no general graph-layout solver. Within a layer,
//! nodes are centred horizontally in creation order.

use std::collections::BTreeMap;

use crate::{Graph, Position, ResourceType};

pub const ORIGIN_X: f64 = 400.0;
pub const ORIGIN_Y: f64 = 50.0;
pub const HORIZONTAL_GAP: f64 = 220.0;
pub const VERTICAL_GAP: f64 = 150.0;

const DEFAULT_LAYER: u32 = 3;

pub fn layer_of(t: &ResourceType) -> u32 {
    match t {
        ResourceType::InternetGateway | ResourceType::CloudFront | ResourceType::Vpc => 0,
        ResourceType::LoadBalancer | ResourceType::ApiGateway => 1,
        ResourceType::Subnet | ResourceType::NatGateway => 2,
        ResourceType::Ec2 | ResourceType::Lambda => 3,
        ResourceType::SecurityGroup
        | ResourceType::Rds
        | ResourceType::DynamoDb
        | ResourceType::ElastiCache => 4,
        ResourceType::S3 | ResourceType::Sqs | ResourceType::Sns => 5,
        ResourceType::IamRole => 6,
        ResourceType::Other(_) => DEFAULT_LAYER,
    }
}

/// Assign every node a position from its layer and its rank within the layer.
pub fn auto_layout(graph: &mut Graph) {
    let mut layers: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, node) in graph.nodes.iter().enumerate() {
        layers.entry(layer_of(&node.resource_type)).or_default().push(i);
    }

    for (layer, members) in &layers {
        let y = ORIGIN_Y + *layer as f64 * VERTICAL_GAP;
        let width = (members.len() - 1) as f64 * HORIZONTAL_GAP;
        let start_x = ORIGIN_X - width / 2.0;
        for (rank, &idx) in members.iter().enumerate() {
            graph.nodes[idx].position = Position {
                x: start_x + rank as f64 * HORIZONTAL_GAP,
                y,
            };
        }
    }

    tracing::debug!(nodes = graph.nodes.len(), layers = layers.len(), "auto-layout applied");
}

/// True when the graph carries no layout yet (every node at the origin).
pub fn needs_layout(graph: &Graph) -> bool {
    !graph.nodes.is_empty()
        && graph
            .nodes
            .iter()
            .all(|n| n.position.x == 0.0 && n.position.y == 0.0)
}
