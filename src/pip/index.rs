//! Per-level spatial index for admin boundary lookups.
//!
//! Resolution is tiered: an R-tree over bounding boxes produces candidates,
//! and the polygon test only runs when more than one box contains the point.

use std::collections::BTreeMap;
use std::fmt;

use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::Boundary;
use crate::models::{AdminLevel, LevelMapping};

/// Wrapper for R-tree indexing of boundaries
struct IndexedBoundary {
    boundary: Boundary,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBoundary {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedBoundary {
    fn new(boundary: Boundary) -> Self {
        Self {
            envelope: boundary.bbox.envelope(),
            boundary,
        }
    }
}

/// Outcome of classifying a point at one level
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// No bounding box contains the point, or no polygon does
    NoMatch,
    /// Exactly one bounding box contains the point; polygon test skipped
    BboxUnique(&'a Boundary),
    /// Several boxes matched and exactly one polygon contains the point
    PolygonResolved(&'a Boundary),
    /// More than one polygon contains the point
    Ambiguous(usize),
}

impl<'a> Resolution<'a> {
    pub fn boundary(&self) -> Option<&'a Boundary> {
        match *self {
            Resolution::BboxUnique(b) | Resolution::PolygonResolved(b) => Some(b),
            Resolution::NoMatch | Resolution::Ambiguous(_) => None,
        }
    }
}

/// Match counters for one admin level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelStats {
    bbox_unique: u64,
    polygon_resolved: u64,
    no_match: u64,
    ambiguous: u64,
}

impl LevelStats {
    pub fn bbox_unique(&self) -> u64 {
        self.bbox_unique
    }

    pub fn polygon_resolved(&self) -> u64 {
        self.polygon_resolved
    }

    pub fn no_match(&self) -> u64 {
        self.no_match
    }

    pub fn ambiguous(&self) -> u64 {
        self.ambiguous
    }

    pub fn total(&self) -> u64 {
        self.bbox_unique + self.polygon_resolved + self.no_match + self.ambiguous
    }

    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::NoMatch => self.no_match += 1,
            Resolution::BboxUnique(_) => self.bbox_unique += 1,
            Resolution::PolygonResolved(_) => self.polygon_resolved += 1,
            Resolution::Ambiguous(_) => self.ambiguous += 1,
        }
    }
}

/// Match counters for every queried level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    levels: BTreeMap<u8, LevelStats>,
}

impl MatchStats {
    /// Counters for an OSM admin level; zero if never queried
    pub fn level(&self, level: u8) -> LevelStats {
        self.levels.get(&level).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &LevelStats)> {
        self.levels.iter().map(|(level, stats)| (*level, stats))
    }

    fn record(&mut self, level: u8, resolution: &Resolution) {
        self.levels.entry(level).or_default().record(resolution);
    }
}

impl fmt::Display for MatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>11} {:>12} {:>16} {:>10} {:>10}",
            "admin_level", "bbox-unique", "polygon-resolved", "no-match", "ambiguous"
        )?;
        for (level, stats) in self.iter() {
            writeln!(
                f,
                "{:>11} {:>12} {:>16} {:>10} {:>10}",
                level,
                stats.bbox_unique,
                stats.polygon_resolved,
                stats.no_match,
                stats.ambiguous
            )?;
        }
        Ok(())
    }
}

/// Boundaries at a single admin level
struct LevelIndex {
    tree: RTree<IndexedBoundary>,
}

impl LevelIndex {
    fn classify(&self, lat: f64, lon: f64) -> Resolution<'_> {
        let query_envelope = AABB::from_point([lon, lat]);
        let candidates: Vec<&Boundary> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .map(|ib| &ib.boundary)
            .collect();

        match candidates.as_slice() {
            [] => Resolution::NoMatch,
            [only] => Resolution::BboxUnique(*only),
            _ => {
                let hits: Vec<&Boundary> = candidates
                    .iter()
                    .copied()
                    .filter(|b| b.contains(lat, lon))
                    .collect();
                match hits.as_slice() {
                    [] => Resolution::NoMatch,
                    [only] => Resolution::PolygonResolved(*only),
                    _ => Resolution::Ambiguous(hits.len()),
                }
            }
        }
    }
}

/// Fully built boundary index, grouped by admin level.
///
/// Only [`BoundaryIndex::build`] creates one, and it consumes the complete
/// boundary set, so no lookup can observe a partially built index.
pub struct BoundaryIndex {
    levels: BTreeMap<u8, LevelIndex>,
    mapping: LevelMapping,
    stats: MatchStats,
}

impl BoundaryIndex {
    /// Build the index from assembled boundaries
    pub fn build(boundaries: Vec<Boundary>, mapping: LevelMapping) -> Self {
        info!("Building boundary index for {} boundaries...", boundaries.len());

        let mut grouped: BTreeMap<u8, Vec<IndexedBoundary>> = BTreeMap::new();
        for boundary in boundaries {
            grouped
                .entry(boundary.level)
                .or_default()
                .push(IndexedBoundary::new(boundary));
        }

        let levels: BTreeMap<u8, LevelIndex> = grouped
            .into_iter()
            .map(|(level, indexed)| {
                let tree = RTree::bulk_load(indexed);
                match mapping.semantic_level(level) {
                    Some(semantic) => {
                        info!("  admin_level {} ({}): {} boundaries", level, semantic, tree.size())
                    }
                    None => info!("  admin_level {}: {} boundaries", level, tree.size()),
                }
                (level, LevelIndex { tree })
            })
            .collect();

        Self {
            levels,
            mapping,
            stats: MatchStats::default(),
        }
    }

    /// Classify a point at an OSM admin level without touching the counters
    pub fn classify(&self, level: u8, lat: f64, lon: f64) -> Resolution<'_> {
        match self.levels.get(&level) {
            Some(index) => index.classify(lat, lon),
            None => Resolution::NoMatch,
        }
    }

    /// Classify a point, record the outcome and return the boundary name
    pub fn resolve(&mut self, level: u8, lat: f64, lon: f64) -> Option<&str> {
        let resolution = match self.levels.get(&level) {
            Some(index) => index.classify(lat, lon),
            None => Resolution::NoMatch,
        };
        self.stats.record(level, &resolution);
        resolution.boundary().map(|b| b.name.as_str())
    }

    /// Resolve at the OSM level bound to a semantic level
    pub fn resolve_level(&mut self, level: AdminLevel, lat: f64, lon: f64) -> Option<&str> {
        self.resolve(self.mapping.osm_level(level), lat, lon)
    }

    pub fn resolve_country(&mut self, lat: f64, lon: f64) -> Option<&str> {
        self.resolve_level(AdminLevel::Country, lat, lon)
    }

    pub fn resolve_region(&mut self, lat: f64, lon: f64) -> Option<&str> {
        self.resolve_level(AdminLevel::Region, lat, lon)
    }

    pub fn resolve_municipality(&mut self, lat: f64, lon: f64) -> Option<&str> {
        self.resolve_level(AdminLevel::Municipality, lat, lon)
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Get total number of indexed boundaries
    pub fn len(&self) -> usize {
        self.levels.values().map(|index| index.tree.size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
