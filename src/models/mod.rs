//! Core data models for the boundary tagger.

pub mod admin;
pub mod osm;
pub mod stop;

pub use admin::{AdminLevel, AdminNames, LevelMapping};
pub use osm::{Node, NodeId, OsmTables, Relation, RelationId, Way, WayId};
pub use stop::{classify_stop, StopKind};
