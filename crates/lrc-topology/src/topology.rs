use std::collections::HashMap;

use lrc_common::NodeId;
use serde::{Deserialize, Serialize};

/// A rack identifier; just a name, unique within a topology.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RackId(pub String);

impl RackId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A rack and the nodes it hosts. Node order within a rack is the
/// round-robin assignment order used by the placement planner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RackInfo {
    pub id: RackId,
    pub nodes: Vec<NodeId>,
}

impl RackInfo {
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// A snapshot of the cluster's rack/node layout, as seen at the start of a
/// kernel routine (§5: "readers ... must use snapshot-at-entry semantics").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RackTopology {
    racks: Vec<RackInfo>,
}

impl RackTopology {
    #[must_use]
    pub fn new() -> Self {
        Self { racks: Vec::new() }
    }

    /// Insert a rack, or replace it if the id is already present.
    pub fn upsert_rack(&mut self, id: RackId, nodes: Vec<NodeId>) {
        if let Some(existing) = self.racks.iter_mut().find(|r| r.id == id) {
            existing.nodes = nodes;
        } else {
            self.racks.push(RackInfo { id, nodes });
        }
    }

    #[must_use]
    pub fn rack(&self, id: &RackId) -> Option<&RackInfo> {
        self.racks.iter().find(|r| &r.id == id)
    }

    /// The rack hosting `node`, if any.
    #[must_use]
    pub fn rack_of(&self, node: NodeId) -> Option<&RackInfo> {
        self.racks.iter().find(|r| r.nodes.contains(&node))
    }

    #[must_use]
    pub fn rack_count(&self) -> usize {
        self.racks.len()
    }

    /// Racks sorted by descending node count, stable by rack name on ties
    /// (§4.2: "Racks are first sorted by descending node count (stable by
    /// name on ties)").
    #[must_use]
    pub fn sorted_racks(&self) -> Vec<&RackInfo> {
        let mut racks: Vec<&RackInfo> = self.racks.iter().collect();
        racks.sort_by(|a, b| {
            b.node_count()
                .cmp(&a.node_count())
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        racks
    }

    /// A node-id to rack-id index, useful for the degraded-read planner's
    /// rack partitioning.
    #[must_use]
    pub fn node_to_rack_index(&self) -> HashMap<NodeId, RackId> {
        let mut index = HashMap::new();
        for rack in &self.racks {
            for node in &rack.nodes {
                index.insert(*node, rack.id.clone());
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u8) -> NodeId {
        NodeId::new([10, 0, 0, n])
    }

    #[test]
    fn sorted_racks_are_descending_by_count_then_name() {
        let mut topo = RackTopology::new();
        topo.upsert_rack(RackId::new("r1"), vec![node(1)]);
        topo.upsert_rack(RackId::new("r0"), vec![node(2), node(3)]);
        topo.upsert_rack(RackId::new("r2"), vec![node(4), node(5)]);

        let sorted: Vec<&str> = topo
            .sorted_racks()
            .into_iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(sorted, vec!["r0", "r2", "r1"]);
    }

    #[test]
    fn rack_of_finds_owning_rack() {
        let mut topo = RackTopology::new();
        topo.upsert_rack(RackId::new("r0"), vec![node(1), node(2)]);
        assert_eq!(topo.rack_of(node(2)).unwrap().id.as_str(), "r0");
        assert!(topo.rack_of(node(9)).is_none());
    }
}
