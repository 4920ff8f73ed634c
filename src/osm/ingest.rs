use std::io::BufRead;

use hashbrown::HashSet;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info, warn};

use super::{attr_value, element_name, required_lat, required_lon, required_number, xml_reader};
use crate::error::{Result, TaggerError};
use crate::models::{Node, OsmTables, Relation, Way};

/// Entity whose child elements are currently being read
#[derive(Debug, Default)]
enum OpenEntity {
    #[default]
    None,
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// Event-driven boundary dataset parser
struct IngestState {
    tables: OsmTables,
    open: OpenEntity,
    depth: usize,
    seen_root: bool,
    unknown: HashSet<String>,
}

impl IngestState {
    fn new() -> Self {
        Self {
            tables: OsmTables::new(),
            open: OpenEntity::None,
            depth: 0,
            seen_root: false,
            unknown: HashSet::new(),
        }
    }

    /// Record an element opening at the current depth
    fn enter(&mut self) -> Result<()> {
        if self.depth == 0 {
            if self.seen_root {
                return Err(TaggerError::Structure("content after the root element".into()));
            }
            self.seen_root = true;
        }
        Ok(())
    }

    fn start(&mut self, e: &BytesStart) -> Result<()> {
        match e.name().as_ref() {
            b"node" => {
                self.open = OpenEntity::Node(Node {
                    id: required_number(e, "id")?,
                    lat: required_lat(e)?,
                    lon: required_lon(e)?,
                });
            }
            b"way" => self.open = OpenEntity::Way(Way::new(required_number(e, "id")?)),
            b"relation" => {
                self.open = OpenEntity::Relation(Relation::new(required_number(e, "id")?))
            }
            b"nd" => {
                if let OpenEntity::Way(way) = &mut self.open {
                    way.nodes.push(required_number(e, "ref")?);
                }
            }
            b"member" => {
                if let OpenEntity::Relation(relation) = &mut self.open {
                    let member_type = attr_value(e, b"type")?;
                    let role = attr_value(e, b"role")?.unwrap_or_default();
                    if member_type.as_deref() == Some("way") && role != "inner" {
                        relation.ways.push(required_number(e, "ref")?);
                    }
                }
            }
            b"tag" => self.tag(e)?,
            b"osm" | b"bound" | b"bounds" => {}
            _ => {
                let name = element_name(e);
                if self.unknown.insert(name.clone()) {
                    warn!("Don't know element <{}>, ignoring", name);
                }
            }
        }
        Ok(())
    }

    fn tag(&mut self, e: &BytesStart) -> Result<()> {
        let (Some(key), Some(value)) = (attr_value(e, b"k")?, attr_value(e, b"v")?) else {
            return Ok(());
        };

        let (name, level) = match &mut self.open {
            OpenEntity::Way(way) => (&mut way.name, &mut way.admin_level),
            OpenEntity::Relation(relation) => (&mut relation.name, &mut relation.admin_level),
            // Node tags carry nothing the boundary assembler needs
            OpenEntity::Node(_) | OpenEntity::None => return Ok(()),
        };

        match key.as_str() {
            "name" => *name = Some(value),
            "admin_level" => match value.trim().parse::<u8>() {
                Ok(l) => *level = Some(l),
                Err(_) => warn!("Ignoring unparsable admin_level '{}'", value),
            },
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        let finished = match name {
            b"node" | b"way" | b"relation" => std::mem::take(&mut self.open),
            _ => return,
        };

        match finished {
            OpenEntity::Node(node) => self.tables.add_node(node),
            OpenEntity::Way(way) => self.tables.add_way(way),
            OpenEntity::Relation(relation) => self.tables.add_relation(relation),
            OpenEntity::None => {}
        }
    }

    fn finish(self) -> Result<OsmTables> {
        if !self.seen_root {
            return Err(TaggerError::Structure("document has no root element".into()));
        }
        if self.depth != 0 {
            return Err(TaggerError::Structure(format!(
                "document ended with {} unclosed element(s)",
                self.depth
            )));
        }
        Ok(self.tables)
    }
}

/// Parse a boundary dataset into node, way and relation tables.
///
/// Malformed XML is fatal. Unknown elements are logged and skipped.
pub fn ingest<R: BufRead>(input: R) -> Result<OsmTables> {
    info!("Reading boundary dataset...");

    let mut reader = xml_reader(input);
    let mut state = IngestState::new();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| TaggerError::from(e).at(reader.buffer_position()))?;

        match event {
            Event::Eof => break,
            Event::Start(e) => {
                state.enter()?;
                state.depth += 1;
                state.start(&e)?;
            }
            Event::Empty(e) => {
                state.enter()?;
                state.start(&e)?;
                state.end(e.name().as_ref());
            }
            Event::End(e) => {
                state.depth = state.depth.saturating_sub(1);
                state.end(e.name().as_ref());
            }
            _ => {}
        }
        buf.clear();
    }

    let tables = state.finish()?;
    info!(
        "Read {} nodes, {} ways, {} relations",
        tables.nodes.len(),
        tables.ways.len(),
        tables.relations.len()
    );
    debug!(
        "{} relations carry an admin_level",
        tables
            .relations
            .values()
            .filter(|r| r.admin_level.is_some())
            .count()
    );

    Ok(tables)
}

/// Parse a boundary dataset held in memory
pub fn ingest_str(document: &str) -> Result<OsmTables> {
    ingest(document.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <bounds minlat="-34" minlon="-71" maxlat="-33" maxlon="-70"/>
  <node id="1" lat="-33.0" lon="-71.0"/>
  <node id="2" lat="-33.0" lon="-70.0">
    <tag k="name" v="ignored"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="boundary" v="administrative"/>
    <tag k="admin_level" v="8"/>
    <tag k="name" v="Providencia"/>
  </way>
  <relation id="100">
    <member type="way" ref="10" role="outer"/>
    <member type="way" ref="11" role="inner"/>
    <member type="node" ref="1" role="admin_centre"/>
    <member type="way" ref="12" role=""/>
    <tag k="admin_level" v="4"/>
    <tag k="name" v="Metropolitana"/>
  </relation>
</osm>"#;

    #[test]
    fn test_ingest_tables() {
        let tables = ingest_str(BOUNDARIES).unwrap();

        assert_eq!(tables.nodes.len(), 2);
        assert_eq!(tables.nodes[&2].lon, -70.0);

        let way = &tables.ways[&10];
        assert_eq!(way.nodes, vec![1, 2]);
        assert_eq!(way.admin_level, Some(8));
        assert_eq!(way.name.as_deref(), Some("Providencia"));

        let relation = &tables.relations[&100];
        assert_eq!(relation.ways, vec![10, 12]);
        assert_eq!(relation.admin_level, Some(4));
        assert_eq!(relation.name.as_deref(), Some("Metropolitana"));
    }

    #[test]
    fn test_node_tags_do_not_leak() {
        let doc = r#"<osm>
  <way id="5"><nd ref="1"/></way>
  <node id="1" lat="0" lon="0"><tag k="name" v="Node"/></node>
</osm>"#;
        let tables = ingest_str(doc).unwrap();
        assert_eq!(tables.ways[&5].name, None);
    }

    #[test]
    fn test_unknown_element_is_ignored() {
        let doc = r#"<osm><changeset id="1"/><node id="1" lat="1" lon="1"/></osm>"#;
        let tables = ingest_str(doc).unwrap();
        assert_eq!(tables.nodes.len(), 1);
    }

    #[test]
    fn test_bad_admin_level_is_not_fatal() {
        let doc = r#"<osm><relation id="1"><tag k="admin_level" v="four"/></relation></osm>"#;
        let tables = ingest_str(doc).unwrap();
        assert_eq!(tables.relations[&1].admin_level, None);
    }

    #[test]
    fn test_malformed_is_fatal() {
        let mismatched = r#"<osm><way id="1"></node></osm>"#;
        assert!(ingest_str(mismatched).is_err());

        let truncated = r#"<osm><node id="1" lat="1" lon="1"/>"#;
        assert!(matches!(
            ingest_str(truncated),
            Err(TaggerError::Structure(_))
        ));

        assert!(ingest_str("").is_err());
    }

    #[test]
    fn test_missing_node_coordinates_is_fatal() {
        let doc = r#"<osm><node id="1" lat="1"/></osm>"#;
        assert!(matches!(
            ingest_str(doc),
            Err(TaggerError::MissingAttribute { attribute: "lon", .. })
        ));
    }

    #[test]
    fn test_invalid_node_coordinates_are_fatal() {
        for doc in [
            r#"<osm><node id="1" lat="NaN" lon="0"/></osm>"#,
            r#"<osm><node id="1" lat="0" lon="inf"/></osm>"#,
            r#"<osm><node id="1" lat="91" lon="0"/></osm>"#,
        ] {
            assert!(matches!(
                ingest_str(doc),
                Err(TaggerError::InvalidNumber { .. })
            ));
        }
    }

    #[test]
    fn test_second_root_is_fatal() {
        let doc = r#"<osm></osm><osm><node id="1" lat="1" lon="1"/></osm>"#;
        assert!(matches!(ingest_str(doc), Err(TaggerError::Structure(_))));

        let empty_then_root = r#"<osm/><osm></osm>"#;
        assert!(matches!(
            ingest_str(empty_then_root),
            Err(TaggerError::Structure(_))
        ));
    }
}
