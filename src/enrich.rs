//! Streaming enrichment of a target OSM dataset.
//!
//! Every named node gets `is_in:country`, `is_in:region` and
//! `is_in:municipality` tags for the levels that resolve. Output is written as
//! input is read; only the children of the node currently open are buffered.

use std::fs;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info};

use crate::error::{Result, TaggerError};
use crate::models::classify_stop;
use crate::osm::{attr_value, element_name, required_lat, required_lon, xml_reader};
use crate::pip::PipService;

pub const DEFAULT_GENERATOR: &str = concat!("admin-tagger ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichOptions {
    /// Written to the root element's `generator` attribute
    pub generator: String,
    /// Only enrich named nodes that are stops, stations or places
    pub stops_only: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            generator: DEFAULT_GENERATOR.to_string(),
            stops_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub nodes: u64,
    pub named: u64,
    pub enriched: u64,
    pub tags_added: u64,
}

/// A `<node>` whose children are still being read
struct PendingNode {
    start: BytesStart<'static>,
    depth: usize,
    children: Vec<Event<'static>>,
    tags: Vec<(String, String)>,
}

impl PendingNode {
    fn new(start: BytesStart<'static>, depth: usize) -> Self {
        Self {
            start,
            depth,
            children: Vec::new(),
            tags: Vec::new(),
        }
    }

    fn push(&mut self, event: Event<'static>) -> Result<()> {
        if let Event::Start(e) | Event::Empty(e) = &event {
            if e.name().as_ref() == b"tag" {
                if let (Some(k), Some(v)) = (attr_value(e, b"k")?, attr_value(e, b"v")?) {
                    self.tags.push((k, v));
                }
            }
        }
        self.children.push(event);
        Ok(())
    }

    fn is_named(&self) -> bool {
        self.tags.iter().any(|(k, _)| k == "name")
    }
}

struct Enricher<'a, W: Write> {
    writer: Writer<W>,
    service: &'a mut PipService,
    options: &'a EnrichOptions,
    summary: EnrichSummary,
}

impl<'a, W: Write> Enricher<'a, W> {
    fn write(&mut self, event: Event) -> Result<()> {
        self.writer.write_event(event).map_err(output_error)
    }

    /// Root element with our generator replacing the original one
    fn root(&self, e: &BytesStart) -> Result<BytesStart<'static>> {
        let mut root = BytesStart::new(element_name(e));
        for attr in e.attributes().with_checks(false) {
            let attr = attr?;
            if attr.key.as_ref() != b"generator" {
                root.push_attribute(attr);
            }
        }
        root.push_attribute(("generator", self.options.generator.as_str()));
        Ok(root)
    }

    fn finish_node(&mut self, node: PendingNode) -> Result<()> {
        let named = node.is_named();
        let eligible = named
            && (!self.options.stops_only
                || classify_stop(node.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .is_some());

        let names = if eligible {
            let lat = required_lat(&node.start)?;
            let lon = required_lon(&node.start)?;
            Some(self.service.lookup(lat, lon))
        } else {
            None
        };

        if named {
            self.summary.named += 1;
        }
        self.write(Event::Start(node.start))?;

        if let Some(names) = names.filter(|n| !n.is_empty()) {
            self.summary.enriched += 1;
            for (key, value) in names.tags() {
                let tag = BytesStart::new("tag").with_attributes([("k", key), ("v", value)]);
                self.write(Event::Empty(tag))?;
                self.summary.tags_added += 1;
            }
        }

        for child in node.children {
            self.write(child)?;
        }
        self.write(Event::End(BytesEnd::new("node")))
    }
}

fn second_root() -> TaggerError {
    TaggerError::Structure("content after the root element".into())
}

/// Writer failures are output I/O errors, not malformed input
fn output_error(error: quick_xml::Error) -> TaggerError {
    match error {
        quick_xml::Error::Io(e) => TaggerError::Io(
            Arc::try_unwrap(e).unwrap_or_else(|e| io::Error::new(e.kind(), e.to_string())),
        ),
        other => other.into(),
    }
}

/// Stream `input` to `output`, adding `is_in:*` tags to named nodes.
///
/// Malformed XML is fatal; whatever was written to `output` by then must be
/// discarded by the caller.
pub fn enrich<R: BufRead, W: Write>(
    input: R,
    service: &mut PipService,
    output: W,
    options: &EnrichOptions,
) -> Result<EnrichSummary> {
    info!("Enriching target dataset...");

    let mut reader = xml_reader(input);
    let mut enricher = Enricher {
        writer: Writer::new_with_indent(output, b' ', 2),
        service,
        options,
        summary: EnrichSummary::default(),
    };
    enricher.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut pending: Option<PendingNode> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| TaggerError::from(e).at(reader.buffer_position()))?;

        match event {
            Event::Eof => break,
            // Replaced by our own declaration
            Event::Decl(_) => {}
            Event::Start(e) => {
                if depth == 0 && seen_root {
                    return Err(second_root());
                }
                depth += 1;
                if let Some(node) = pending.as_mut() {
                    node.push(Event::Start(e.into_owned()))?;
                } else if !seen_root {
                    seen_root = true;
                    let root = enricher.root(&e)?;
                    enricher.write(Event::Start(root))?;
                } else if e.name().as_ref() == b"node" {
                    enricher.summary.nodes += 1;
                    pending = Some(PendingNode::new(e.into_owned(), depth));
                } else {
                    enricher.write(Event::Start(e))?;
                }
            }
            Event::Empty(e) => {
                if depth == 0 && seen_root {
                    return Err(second_root());
                }
                if let Some(node) = pending.as_mut() {
                    node.push(Event::Empty(e.into_owned()))?;
                } else if !seen_root {
                    seen_root = true;
                    let root = enricher.root(&e)?;
                    enricher.write(Event::Empty(root))?;
                } else {
                    // A self-closing node has no tags and passes through
                    if e.name().as_ref() == b"node" {
                        enricher.summary.nodes += 1;
                    }
                    enricher.write(Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                let closes_pending = pending.as_ref().map_or(false, |node| node.depth == depth);
                depth = depth.saturating_sub(1);

                if closes_pending {
                    if let Some(node) = pending.take() {
                        enricher.finish_node(node)?;
                    }
                } else if let Some(node) = pending.as_mut() {
                    node.push(Event::End(e.into_owned()))?;
                } else {
                    enricher.write(Event::End(e))?;
                }
            }
            other => {
                if let Some(node) = pending.as_mut() {
                    node.push(other.into_owned())?;
                } else {
                    enricher.write(other)?;
                }
            }
        }
        buf.clear();
    }

    if !seen_root {
        return Err(TaggerError::Structure("document has no root element".into()));
    }
    if depth != 0 {
        return Err(TaggerError::Structure(format!(
            "document ended with {} unclosed element(s)",
            depth
        )));
    }

    let mut output = enricher.writer.into_inner();
    output.write_all(b"\n")?;
    output.flush()?;

    let summary = enricher.summary;
    info!(
        "Processed {} nodes: {} named, {} enriched, {} tags added",
        summary.nodes, summary.named, summary.enriched, summary.tags_added
    );
    Ok(summary)
}

/// Output document staged in a temporary file next to its final path.
///
/// The staged file is renamed into place only once the whole document was
/// written, so a failed run never leaves a partial document behind.
pub struct OutputFile {
    temp: NamedTempFile,
    path: PathBuf,
}

impl OutputFile {
    /// Create the staging file, failing when the output directory is not writable.
    ///
    /// The file gets the mode a plain create would (0o666 less the umask), or
    /// the mode of the file it replaces.
    pub fn create(path: &Path) -> Result<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut builder = Builder::new();
        builder.prefix(".admin-tagger").suffix(".tmp");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let temp = builder.tempfile_in(dir)?;

        if let Ok(existing) = fs::metadata(path) {
            temp.as_file().set_permissions(existing.permissions())?;
        }
        debug!("Staging output in {}", temp.path().display());

        Ok(Self {
            temp,
            path: path.to_path_buf(),
        })
    }

    /// Enrich `input` into the staging file and move it into place
    pub fn write<R: BufRead>(
        mut self,
        input: R,
        service: &mut PipService,
        options: &EnrichOptions,
    ) -> Result<EnrichSummary> {
        let summary = enrich(input, service, BufWriter::new(self.temp.as_file_mut()), options)?;
        self.temp
            .persist(&self.path)
            .map_err(|e| TaggerError::Io(e.error))?;
        Ok(summary)
    }
}
