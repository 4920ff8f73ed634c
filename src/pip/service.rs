//! PIP service for looking up the admin names of a point.

use tracing::trace;

use super::{BoundaryIndex, MatchStats};
use crate::models::{AdminLevel, AdminNames};

/// Point-in-Polygon lookup service
pub struct PipService {
    index: BoundaryIndex,
}

impl PipService {
    /// Create a new PIP service from a fully built index
    pub fn new(index: BoundaryIndex) -> Self {
        Self { index }
    }

    /// Resolve country, region and municipality for a point.
    ///
    /// Every level is queried (and counted) even when a higher one missed.
    pub fn lookup(&mut self, lat: f64, lon: f64) -> AdminNames {
        let mut names = AdminNames::default();

        for level in AdminLevel::all() {
            if let Some(name) = self.index.resolve_level(*level, lat, lon) {
                if !name.is_empty() {
                    names.set(*level, name.to_string());
                }
            }
        }

        trace!("PIP lookup at ({}, {}): {:?}", lat, lon, names);
        names
    }

    pub fn stats(&self) -> &MatchStats {
        self.index.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LevelMapping;
    use crate::pip::{Boundary, BoundarySource};

    fn square(level: u8, name: &str, lat: f64, lon: f64, size: f64) -> Boundary {
        let coords = [
            (lat, lon),
            (lat, lon + size),
            (lat + size, lon + size),
            (lat + size, lon),
        ];
        Boundary::from_coords(level, name, BoundarySource::Relation(0), &coords, false).unwrap()
    }

    #[test]
    fn test_empty_hierarchy() {
        let index = BoundaryIndex::build(vec![], LevelMapping::default());
        let mut service = PipService::new(index);
        let names = service.lookup(-33.4, -70.6);
        assert!(names.is_empty());
        assert_eq!(service.stats().level(2).no_match(), 1);
    }

    #[test]
    fn test_full_hierarchy() {
        let index = BoundaryIndex::build(
            vec![
                square(2, "Chile", -40.0, -75.0, 20.0),
                square(4, "Metropolitana", -34.0, -71.0, 1.0),
                square(8, "Santiago", -33.5, -70.7, 0.1),
            ],
            LevelMapping::default(),
        );
        let mut service = PipService::new(index);

        let names = service.lookup(-33.45, -70.65);
        assert_eq!(names.country.as_deref(), Some("Chile"));
        assert_eq!(names.region.as_deref(), Some("Metropolitana"));
        assert_eq!(names.municipality.as_deref(), Some("Santiago"));

        let names = service.lookup(-33.8, -70.2);
        assert_eq!(names.municipality, None);
        assert_eq!(names.region.as_deref(), Some("Metropolitana"));
    }

    #[test]
    fn test_unnamed_boundary_adds_nothing() {
        let index =
            BoundaryIndex::build(vec![square(4, "", -34.0, -71.0, 1.0)], LevelMapping::default());
        let mut service = PipService::new(index);
        assert!(service.lookup(-33.5, -70.5).is_empty());
    }
}
