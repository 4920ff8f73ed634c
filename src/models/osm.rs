//! Raw OSM entities read from a boundary dataset.

use hashbrown::{HashMap, HashSet};

pub type NodeId = i64;
pub type WayId = i64;
pub type RelationId = i64;

/// Geographic point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

/// Open or closed polyline fragment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Way {
    pub id: WayId,
    pub nodes: Vec<NodeId>,
    pub name: Option<String>,
    pub admin_level: Option<u8>,
}

impl Way {
    pub fn new(id: WayId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// Boundary relation; only outer (non-inner) way members are kept
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relation {
    pub id: RelationId,
    pub ways: Vec<WayId>,
    pub name: Option<String>,
    pub admin_level: Option<u8>,
}

impl Relation {
    pub fn new(id: RelationId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// Result of ingesting a boundary dataset, owned by the caller.
#[derive(Debug, Default)]
pub struct OsmTables {
    pub nodes: HashMap<NodeId, Node>,
    pub ways: HashMap<WayId, Way>,
    pub relations: HashMap<RelationId, Relation>,
}

impl OsmTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn add_way(&mut self, way: Way) {
        self.ways.insert(way.id, way);
    }

    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.insert(relation.id, relation);
    }

    /// Ways referenced as members of relations that carry an admin level
    pub fn boundary_member_ways(&self) -> HashSet<WayId> {
        self.relations
            .values()
            .filter(|r| r.admin_level.is_some())
            .flat_map(|r| r.ways.iter().copied())
            .collect()
    }
}
