//! Point-in-Polygon (PIP) admin lookup.
//!
//! Assembles admin boundaries from OSM tables and provides tiered
//! bounding-box / polygon lookups per admin level.

mod boundary;
pub mod geometry;
mod index;
pub mod projection;
mod service;
pub mod stitch;

pub use boundary::{assemble_boundaries, Boundary, BoundarySource, BoundingBox};
pub use index::{BoundaryIndex, LevelStats, MatchStats, Resolution};
pub use projection::LocalProjection;
pub use service::PipService;
