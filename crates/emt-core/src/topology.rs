//! Transmission network topology: nodes, lines, and bidding zones.
//!
//! The network is an undirected petgraph graph. Each physical line is stored
//! once as an edge weight; undirected edge lookup makes the mirror
//! direction queryable without a second record, and zone-boundary capacity
//! sums count every physical line exactly once.

use crate::error::{ModelError, ModelResult};
use crate::{LineId, NodeId, ZoneId};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// A transmission line between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionLine {
    pub id: LineId,
    pub from: NodeId,
    pub to: NodeId,
    /// Susceptance, the reciprocal of the line reactance.
    pub susceptance: f64,
    /// Symmetric thermal capacity (MW); flow is bounded in ±capacity.
    pub capacity_mw: f64,
}

#[derive(Debug, Clone)]
struct NodeInfo {
    id: NodeId,
    name: String,
    zone: Option<ZoneId>,
}

/// A bidding zone: a named set of member nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub members: Vec<NodeId>,
}

/// The transmission network of one system.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    graph: UnGraph<NodeInfo, TransmissionLine>,
    zones: Vec<Zone>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node, returning its id.
    pub fn add_node(&mut self, name: impl Into<String>) -> ModelResult<NodeId> {
        let name = name.into();
        if self.graph.node_weights().any(|n| n.name == name) {
            return Err(ModelError::DuplicateId { kind: "node", name });
        }
        let id = NodeId::new(self.graph.node_count());
        self.graph.add_node(NodeInfo {
            id,
            name,
            zone: None,
        });
        Ok(id)
    }

    /// Register a line between two known nodes. The mirror direction is
    /// implied by undirected storage; `line_between` and `neighbors` answer
    /// from either endpoint.
    pub fn add_line(
        &mut self,
        from: NodeId,
        to: NodeId,
        susceptance: f64,
        capacity_mw: f64,
    ) -> ModelResult<LineId> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;
        let entity = format!("line {}-{}", from.value(), to.value());
        if from == to {
            return Err(ModelError::invalid(entity, "endpoints must differ"));
        }
        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return Err(ModelError::DuplicateId {
                kind: "transmission line",
                name: entity,
            });
        }
        if !(susceptance > 0.0) || !susceptance.is_finite() {
            return Err(ModelError::invalid(
                entity,
                format!("susceptance {susceptance} must be finite and positive"),
            ));
        }
        if capacity_mw < 0.0 {
            return Err(ModelError::invalid(
                entity,
                format!("negative capacity {capacity_mw}"),
            ));
        }

        let id = LineId::new(self.graph.edge_count());
        self.graph.add_edge(
            from_idx,
            to_idx,
            TransmissionLine {
                id,
                from,
                to,
                susceptance,
                capacity_mw,
            },
        );
        Ok(id)
    }

    /// Register a zone, returning its id.
    pub fn add_zone(&mut self, name: impl Into<String>) -> ModelResult<ZoneId> {
        let name = name.into();
        if self.zones.iter().any(|z| z.name == name) {
            return Err(ModelError::DuplicateId { kind: "zone", name });
        }
        let id = ZoneId::new(self.zones.len());
        self.zones.push(Zone {
            id,
            name,
            members: Vec::new(),
        });
        Ok(id)
    }

    /// Place a node in a zone, moving it out of its previous zone if any.
    pub fn assign_zone(&mut self, node: NodeId, zone: ZoneId) -> ModelResult<()> {
        self.index_of(node)?;
        if zone.value() >= self.zones.len() {
            return Err(ModelError::UnknownZone(zone));
        }
        let info = &mut self.graph[NodeIndex::new(node.value())];
        if let Some(previous) = info.zone.replace(zone) {
            self.zones[previous.value()].members.retain(|n| *n != node);
        }
        self.zones[zone.value()].members.push(node);
        Ok(())
    }

    /// Ids of nodes directly connected to `node`, in ascending id order.
    pub fn neighbors(&self, node: NodeId) -> ModelResult<Vec<NodeId>> {
        let idx = self.index_of(node)?;
        let mut ids: Vec<NodeId> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].id)
            .collect();
        ids.sort_by_key(|n| n.value());
        Ok(ids)
    }

    /// The line connecting two nodes, if one exists. Queryable from either
    /// endpoint.
    pub fn line_between(&self, a: NodeId, b: NodeId) -> ModelResult<Option<&TransmissionLine>> {
        let a_idx = self.index_of(a)?;
        let b_idx = self.index_of(b)?;
        Ok(self
            .graph
            .find_edge(a_idx, b_idx)
            .map(|e| &self.graph[e]))
    }

    /// Lines incident to `node`.
    pub fn incident_lines(&self, node: NodeId) -> ModelResult<Vec<&TransmissionLine>> {
        let idx = self.index_of(node)?;
        let mut lines: Vec<&TransmissionLine> = self
            .graph
            .edges(idx)
            .map(|e| e.weight())
            .collect();
        lines.sort_by_key(|l| l.id.value());
        Ok(lines)
    }

    /// All lines of the network, each physical line once.
    pub fn lines(&self) -> impl Iterator<Item = &TransmissionLine> {
        self.graph.edge_weights()
    }

    /// Total transfer capacity across the boundary between two zones,
    /// counting each physical line once.
    pub fn transfer_capacity_between(&self, z1: ZoneId, z2: ZoneId) -> ModelResult<f64> {
        self.zone(z1)?;
        self.zone(z2)?;
        if z1 == z2 {
            return Ok(0.0);
        }
        let mut capacity = 0.0;
        for line in self.graph.edge_weights() {
            let zones = (self.zone_of(line.from)?, self.zone_of(line.to)?);
            if zones == (Some(z1), Some(z2)) || zones == (Some(z2), Some(z1)) {
                capacity += line.capacity_mw;
            }
        }
        Ok(capacity)
    }

    pub fn node_name(&self, node: NodeId) -> ModelResult<&str> {
        let idx = self.index_of(node)?;
        Ok(&self.graph[idx].name)
    }

    /// Zone membership of a node, `None` while unassigned.
    pub fn zone_of(&self, node: NodeId) -> ModelResult<Option<ZoneId>> {
        let idx = self.index_of(node)?;
        Ok(self.graph[idx].zone)
    }

    pub fn zone(&self, zone: ZoneId) -> ModelResult<&Zone> {
        self.zones
            .get(zone.value())
            .ok_or(ModelError::UnknownZone(zone))
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_lines(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_weights().map(|n| n.id)
    }

    fn index_of(&self, node: NodeId) -> ModelResult<NodeIndex> {
        if node.value() < self.graph.node_count() {
            Ok(NodeIndex::new(node.value()))
        } else {
            Err(ModelError::UnknownNode(node))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_topology() -> (Topology, NodeId, NodeId) {
        let mut topology = Topology::new();
        let a = topology.add_node("a").unwrap();
        let b = topology.add_node("b").unwrap();
        topology.add_line(a, b, 5.0, 30.0).unwrap();
        (topology, a, b)
    }

    #[test]
    fn test_line_queryable_from_both_endpoints() {
        let (topology, a, b) = two_node_topology();
        let forward = topology.line_between(a, b).unwrap().unwrap();
        let mirror = topology.line_between(b, a).unwrap().unwrap();
        assert_eq!(forward.id, mirror.id);
        assert_eq!(topology.neighbors(b).unwrap(), vec![a]);
    }

    #[test]
    fn test_unknown_node_query() {
        let (topology, a, _) = two_node_topology();
        let ghost = NodeId::new(17);
        assert!(matches!(
            topology.neighbors(ghost),
            Err(ModelError::UnknownNode(n)) if n == ghost
        ));
        assert!(matches!(
            topology.line_between(a, ghost),
            Err(ModelError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_nonpositive_susceptance_rejected() {
        let mut topology = Topology::new();
        let a = topology.add_node("a").unwrap();
        let b = topology.add_node("b").unwrap();
        assert!(matches!(
            topology.add_line(a, b, 0.0, 30.0),
            Err(ModelError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_zone_capacity_counted_once_per_line() {
        let mut topology = Topology::new();
        let a = topology.add_node("a").unwrap();
        let b = topology.add_node("b").unwrap();
        let c = topology.add_node("c").unwrap();
        let d = topology.add_node("d").unwrap();
        topology.add_line(a, c, 5.0, 30.0).unwrap();
        topology.add_line(b, d, 5.0, 20.0).unwrap();
        topology.add_line(a, b, 5.0, 99.0).unwrap(); // internal to z1

        let z1 = topology.add_zone("z1").unwrap();
        let z2 = topology.add_zone("z2").unwrap();
        topology.assign_zone(a, z1).unwrap();
        topology.assign_zone(b, z1).unwrap();
        topology.assign_zone(c, z2).unwrap();
        topology.assign_zone(d, z2).unwrap();

        let capacity = topology.transfer_capacity_between(z1, z2).unwrap();
        assert_eq!(capacity, 50.0);
        // symmetric query, still counted once
        assert_eq!(topology.transfer_capacity_between(z2, z1).unwrap(), 50.0);
    }

    #[test]
    fn test_zone_reassignment_moves_membership() {
        let mut topology = Topology::new();
        let a = topology.add_node("a").unwrap();
        let z1 = topology.add_zone("z1").unwrap();
        let z2 = topology.add_zone("z2").unwrap();
        topology.assign_zone(a, z1).unwrap();
        topology.assign_zone(a, z2).unwrap();
        assert!(topology.zone(z1).unwrap().members.is_empty());
        assert_eq!(topology.zone(z2).unwrap().members, vec![a]);
        assert_eq!(topology.zone_of(a).unwrap(), Some(z2));
    }
}
