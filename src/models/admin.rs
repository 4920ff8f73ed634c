//! Administrative hierarchy types for PIP lookup.

use serde::Deserialize;
use std::fmt;

/// Semantic admin levels that are written back as `is_in:*` tags.
/// See: https://wiki.openstreetmap.org/wiki/Tag:boundary%3Dadministrative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdminLevel {
    /// Country (admin_level=2)
    Country,
    /// Region / state / province (admin_level=4)
    Region,
    /// Municipality / comuna (admin_level=8)
    Municipality,
}

impl AdminLevel {
    /// All levels in hierarchical order (country first)
    pub fn all() -> &'static [AdminLevel] {
        &[
            AdminLevel::Country,
            AdminLevel::Region,
            AdminLevel::Municipality,
        ]
    }

    /// Get the field name for this level
    pub fn field_name(&self) -> &'static str {
        match self {
            AdminLevel::Country => "country",
            AdminLevel::Region => "region",
            AdminLevel::Municipality => "municipality",
        }
    }

    /// Tag key injected into enriched nodes
    pub fn tag_key(&self) -> &'static str {
        match self {
            AdminLevel::Country => "is_in:country",
            AdminLevel::Region => "is_in:region",
            AdminLevel::Municipality => "is_in:municipality",
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Binds OSM `admin_level` values to the semantic levels.
///
/// This is the only place where admin_level integers carry meaning; every
/// other part of the pipeline passes the raw tag value through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LevelMapping {
    pub country: u8,
    pub region: u8,
    pub municipality: u8,
}

impl Default for LevelMapping {
    fn default() -> Self {
        Self {
            country: 2,
            region: 4,
            municipality: 8,
        }
    }
}

impl LevelMapping {
    /// Get the OSM admin_level number for a semantic level
    pub fn osm_level(&self, level: AdminLevel) -> u8 {
        match level {
            AdminLevel::Country => self.country,
            AdminLevel::Region => self.region,
            AdminLevel::Municipality => self.municipality,
        }
    }

    /// Reverse lookup, first match in hierarchical order
    pub fn semantic_level(&self, osm_level: u8) -> Option<AdminLevel> {
        AdminLevel::all()
            .iter()
            .copied()
            .find(|level| self.osm_level(*level) == osm_level)
    }
}

/// Resolved admin names for a single point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminNames {
    pub country: Option<String>,
    pub region: Option<String>,
    pub municipality: Option<String>,
}

impl AdminNames {
    /// Set the name for a given level
    pub fn set(&mut self, level: AdminLevel, name: String) {
        match level {
            AdminLevel::Country => self.country = Some(name),
            AdminLevel::Region => self.region = Some(name),
            AdminLevel::Municipality => self.municipality = Some(name),
        }
    }

    /// Get the name for a given level
    pub fn get(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::Country => self.country.as_deref(),
            AdminLevel::Region => self.region.as_deref(),
            AdminLevel::Municipality => self.municipality.as_deref(),
        }
    }

    /// `(tag key, name)` pairs for every resolved level, country first
    pub fn tags(&self) -> impl Iterator<Item = (&'static str, &str)> {
        AdminLevel::all()
            .iter()
            .filter_map(move |level| self.get(*level).map(|name| (level.tag_key(), name)))
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.region.is_none() && self.municipality.is_none()
    }
}
