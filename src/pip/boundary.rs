//! Admin boundary assembly from ingested OSM tables.

use geo::{Coord, Line};
use hashbrown::HashSet;
use rstar::AABB;
use tracing::{debug, info, warn};

use super::geometry::{build_segments, contains};
use super::projection::{distance_m, LocalProjection};
use super::stitch::stitch_fragments;
use crate::models::{NodeId, OsmTables, Relation, Way};

/// Geographic bounding box, grown one coordinate at a time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Degenerate box around a single point
    pub fn around(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            min_lon: lon,
            max_lat: lat,
            max_lon: lon,
        }
    }

    pub fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lat = self.max_lat.max(lat);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Inclusive containment test
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// R-tree envelope in `[lon, lat]` order
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_lon, self.min_lat], [self.max_lon, self.max_lat])
    }
}

/// Where a boundary's geometry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundarySource {
    Relation(i64),
    Way(i64),
}

/// A single admin boundary ring with metadata
#[derive(Debug, Clone)]
pub struct Boundary {
    pub level: u8,
    pub name: String,
    pub source: BoundarySource,
    pub bbox: BoundingBox,
    /// Ring in the boundary's own projected frame
    pub ring: Vec<Coord<f64>>,
    pub segments: Vec<Line<f64>>,
    pub projection: LocalProjection,
    /// Missing references or a ring that did not close
    pub incomplete: bool,
}

impl Boundary {
    /// Build a boundary from a ring of `(lat, lon)` coordinates.
    ///
    /// The first coordinate becomes the projection anchor. Returns `None` when
    /// the ring has fewer than 3 distinct points.
    pub fn from_coords(
        level: u8,
        name: impl Into<String>,
        source: BoundarySource,
        coords: &[(f64, f64)],
        incomplete: bool,
    ) -> Option<Self> {
        let distinct: HashSet<(u64, u64)> = coords
            .iter()
            .map(|(lat, lon)| (lat.to_bits(), lon.to_bits()))
            .collect();
        if distinct.len() < 3 {
            return None;
        }

        let &(lat0, lon0) = coords.first()?;
        let projection = LocalProjection::new(lat0, lon0);
        let mut bbox = BoundingBox::around(lat0, lon0);
        let mut ring = Vec::with_capacity(coords.len());

        for &(lat, lon) in coords {
            bbox.extend(lat, lon);
            ring.push(projection.project(lat, lon));
        }

        let segments = build_segments(&ring);

        Some(Self {
            level,
            name: name.into(),
            source,
            bbox,
            ring,
            segments,
            projection,
            incomplete,
        })
    }

    /// Exact polygon test for a geographic point
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.bbox.contains(lat, lon) && contains(&self.segments, self.projection.project(lat, lon))
    }
}

/// Resolve node ids to `(lat, lon)`, reporting whether any id was unknown
fn resolve_nodes(tables: &OsmTables, ids: &[NodeId]) -> (Vec<(f64, f64)>, bool) {
    let mut missing = false;
    let coords = ids
        .iter()
        .filter_map(|id| match tables.nodes.get(id) {
            Some(node) => Some((node.lat, node.lon)),
            None => {
                missing = true;
                None
            }
        })
        .collect();
    (coords, missing)
}

/// Stitch fragments and turn them into a boundary
fn assemble(
    tables: &OsmTables,
    level: u8,
    name: &str,
    source: BoundarySource,
    fragments: Vec<Vec<NodeId>>,
    mut incomplete: bool,
) -> Option<Boundary> {
    let stitched = stitch_fragments(fragments);
    if !stitched.closed {
        incomplete = true;
        if let (Some(first), Some(last)) = (stitched.nodes.first(), stitched.nodes.last()) {
            if let (Some(a), Some(b)) = (tables.nodes.get(first), tables.nodes.get(last)) {
                debug!(
                    "{:?} '{}' did not close: {} chain(s), gap of {:.0} m",
                    source,
                    name,
                    stitched.chains,
                    distance_m((a.lat, a.lon), (b.lat, b.lon))
                );
            }
        }
    }

    let (coords, missing) = resolve_nodes(tables, &stitched.nodes);
    incomplete |= missing;

    let boundary = Boundary::from_coords(level, name, source, &coords, incomplete);
    if boundary.is_none() {
        debug!(
            "Dropping {:?} '{}': fewer than 3 distinct points",
            source, name
        );
    }
    boundary
}

fn relation_boundary(tables: &OsmTables, relation: &Relation, level: u8) -> Option<Boundary> {
    let name = relation.name.as_deref().unwrap_or_default();
    if name.is_empty() {
        warn!("Boundary relation {} has no name", relation.id);
    }

    let mut incomplete = false;
    let fragments = relation
        .ways
        .iter()
        .filter_map(|way_id| match tables.ways.get(way_id) {
            Some(way) => Some(way.nodes.clone()),
            None => {
                incomplete = true;
                None
            }
        })
        .collect();

    assemble(
        tables,
        level,
        name,
        BoundarySource::Relation(relation.id),
        fragments,
        incomplete,
    )
}

fn way_boundary(tables: &OsmTables, way: &Way, level: u8, name: &str) -> Option<Boundary> {
    assemble(
        tables,
        level,
        name,
        BoundarySource::Way(way.id),
        vec![way.nodes.clone()],
        false,
    )
}

/// Assemble admin boundaries from ingested tables.
///
/// Every relation with an admin level yields one boundary. Standalone ways
/// with a positive admin level and a name yield one too, unless they are
/// already members of a boundary relation.
pub fn assemble_boundaries(tables: &OsmTables) -> Vec<Boundary> {
    info!("Assembling admin boundaries...");

    let mut boundaries = Vec::new();

    for relation in tables.relations.values() {
        let Some(level) = relation.admin_level else {
            continue;
        };
        boundaries.extend(relation_boundary(tables, relation, level));
    }

    let members = tables.boundary_member_ways();
    for way in tables.ways.values() {
        let (Some(level), Some(name)) = (way.admin_level, way.name.as_deref()) else {
            continue;
        };
        if level == 0 || name.is_empty() || members.contains(&way.id) {
            continue;
        }
        boundaries.extend(way_boundary(tables, way, level, name));
    }

    let incomplete = boundaries.iter().filter(|b| b.incomplete).count();
    info!(
        "Found {} admin boundaries ({} incomplete)",
        boundaries.len(),
        incomplete
    );

    // Sort by admin level (country first), then name for stable output
    boundaries.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));

    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::ingest_str;

    const SQUARE: &str = r#"<osm>
  <node id="1" lat="-34.0" lon="-71.0"/>
  <node id="2" lat="-34.0" lon="-70.0"/>
  <node id="3" lat="-33.0" lon="-70.0"/>
  <node id="4" lat="-33.0" lon="-71.0"/>
  <way id="10"><nd ref="1"/><nd ref="2"/><nd ref="3"/></way>
  <way id="11"><nd ref="1"/><nd ref="4"/><nd ref="3"/></way>
  <relation id="100">
    <member type="way" ref="11" role="outer"/>
    <member type="way" ref="10" role="outer"/>
    <tag k="admin_level" v="4"/>
    <tag k="name" v="Metropolitana"/>
  </relation>
</osm>"#;

    #[test]
    fn test_relation_with_reversed_member() {
        let tables = ingest_str(SQUARE).unwrap();
        let boundaries = assemble_boundaries(&tables);

        assert_eq!(boundaries.len(), 1);
        let b = &boundaries[0];
        assert_eq!(b.level, 4);
        assert_eq!(b.name, "Metropolitana");
        assert_eq!(b.source, BoundarySource::Relation(100));
        assert!(!b.incomplete);
        assert_eq!(b.ring.len(), 4);
        assert_eq!(b.segments.len(), 4);
        assert!(b.contains(-33.5, -70.5));
        assert!(!b.contains(-32.5, -70.5));
    }

    #[test]
    fn test_bbox_contains_every_ring_point() {
        let tables = ingest_str(SQUARE).unwrap();
        let b = &assemble_boundaries(&tables)[0];
        for node in tables.nodes.values() {
            assert!(b.bbox.contains(node.lat, node.lon));
        }
        assert_eq!(b.bbox.min_lat, -34.0);
        assert_eq!(b.bbox.max_lon, -70.0);
    }

    #[test]
    fn test_missing_way_marks_incomplete() {
        let member = r#"<member type="way" ref="10" role="outer"/>"#;
        let with_missing = format!(r#"{member}<member type="way" ref="99" role="outer"/>"#);
        let doc = SQUARE.replace(member, &with_missing);
        let tables = ingest_str(&doc).unwrap();
        let boundaries = assemble_boundaries(&tables);
        assert_eq!(boundaries.len(), 1);
        assert!(boundaries[0].incomplete);
        assert!(boundaries[0].contains(-33.5, -70.5));
    }

    #[test]
    fn test_unclosed_ring_is_kept_incomplete() {
        let way = r#"<nd ref="1"/><nd ref="4"/><nd ref="3"/>"#;
        let doc = SQUARE.replace(way, r#"<nd ref="4"/>"#);
        let tables = ingest_str(&doc).unwrap();
        let boundaries = assemble_boundaries(&tables);
        assert_eq!(boundaries.len(), 1);
        assert!(boundaries[0].incomplete);
        assert_eq!(boundaries[0].ring.len(), 3);
    }

    #[test]
    fn test_missing_node_marks_incomplete() {
        let doc = SQUARE.replace(r#"<node id="4" lat="-33.0" lon="-71.0"/>"#, "");
        let tables = ingest_str(&doc).unwrap();
        let boundaries = assemble_boundaries(&tables);
        assert_eq!(boundaries.len(), 1);
        assert!(boundaries[0].incomplete);
        assert_eq!(boundaries[0].ring.len(), 3);
    }

    #[test]
    fn test_degenerate_ring_is_dropped() {
        let doc = r#"<osm>
  <node id="1" lat="-34.0" lon="-71.0"/>
  <node id="2" lat="-34.0" lon="-70.0"/>
  <way id="10"><nd ref="1"/><nd ref="2"/><nd ref="1"/></way>
  <relation id="100">
    <member type="way" ref="10" role="outer"/>
    <tag k="admin_level" v="8"/>
    <tag k="name" v="Sliver"/>
  </relation>
</osm>"#;
        let tables = ingest_str(doc).unwrap();
        assert!(assemble_boundaries(&tables).is_empty());
    }

    #[test]
    fn test_standalone_way_boundary() {
        let doc = r#"<osm>
  <node id="1" lat="-34.0" lon="-71.0"/>
  <node id="2" lat="-34.0" lon="-70.0"/>
  <node id="3" lat="-33.0" lon="-70.0"/>
  <way id="10">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="1"/>
    <tag k="admin_level" v="8"/>
    <tag k="name" v="Triangulo"/>
  </way>
  <way id="11">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="1"/>
    <tag k="admin_level" v="8"/>
  </way>
</osm>"#;
        let tables = ingest_str(doc).unwrap();
        let boundaries = assemble_boundaries(&tables);
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].source, BoundarySource::Way(10));
        assert!(!boundaries[0].incomplete);
    }

    #[test]
    fn test_relation_member_way_not_duplicated() {
        let doc = SQUARE.replace(
            r#"<way id="10">"#,
            r#"<way id="10"><tag k="admin_level" v="4"/><tag k="name" v="Edge"/>"#,
        );
        let tables = ingest_str(&doc).unwrap();
        assert_eq!(assemble_boundaries(&tables).len(), 1);
    }
}
