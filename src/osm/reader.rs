//! Opening OSM XML inputs.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use indicatif::ProgressBar;
use quick_xml::Reader;

use crate::error::Result;

/// Open an OSM XML file, decompressing `*.gz` on the fly.
///
/// The progress bar tracks bytes read from disk, so for compressed inputs it
/// advances by compressed size.
pub fn open_input(path: &Path, progress: &ProgressBar) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    progress.set_length(file.metadata()?.len());
    let file = progress.clone().wrap_read(file);

    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(Box::new(BufReader::new(reader)))
}

/// Event reader configured the same way for both input datasets.
pub fn xml_reader<R: BufRead>(input: R) -> Reader<R> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    reader
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const DOC: &str = r#"<osm><node id="1" lat="1.0" lon="2.0"/></osm>"#;

    #[test]
    fn test_open_plain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.osm");
        std::fs::write(&path, DOC).unwrap();

        let mut content = String::new();
        open_input(&path, &ProgressBar::hidden())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, DOC);
    }

    #[test]
    fn test_open_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boundaries.osm.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(DOC.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let mut content = String::new();
        open_input(&path, &ProgressBar::hidden())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, DOC);
    }

    #[test]
    fn test_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_input(&dir.path().join("nope.osm"), &ProgressBar::hidden()).is_err());
    }
}
