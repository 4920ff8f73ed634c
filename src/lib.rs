//! Admin tagger - tags OSM nodes with the administrative areas they lie in.
//!
//! This library provides the boundary ingest, PIP index and streaming
//! enrichment used by the `admin-tagger` binary.

pub mod enrich;
pub mod error;
pub mod models;
pub mod osm;
pub mod pip;

pub use error::{Result, TaggerError};
pub use models::{AdminLevel, AdminNames, LevelMapping};
