//! OSM XML ingest.
//!
//! Reads boundary datasets into identifier-keyed tables and provides the
//! attribute helpers shared with the streaming enricher.

mod ingest;
mod reader;

pub use ingest::{ingest, ingest_str};
pub use reader::{open_input, xml_reader};

use std::str::FromStr;

use quick_xml::events::BytesStart;

use crate::error::{Result, TaggerError};

/// Element name as an owned string, for diagnostics
pub(crate) fn element_name(event: &BytesStart) -> String {
    String::from_utf8_lossy(event.name().as_ref()).into_owned()
}

/// Get an unescaped attribute value
pub(crate) fn attr_value(event: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in event.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Get an attribute that must be present
pub(crate) fn required_attr(event: &BytesStart, key: &'static str) -> Result<String> {
    attr_value(event, key.as_bytes())?.ok_or_else(|| TaggerError::MissingAttribute {
        element: element_name(event),
        attribute: key,
    })
}

/// Get a required attribute and parse it as a number
pub(crate) fn required_number<T: FromStr>(event: &BytesStart, key: &'static str) -> Result<T> {
    let value = required_attr(event, key)?;
    value
        .trim()
        .parse()
        .map_err(|_| TaggerError::InvalidNumber {
            element: element_name(event),
            attribute: key,
            value,
        })
}

/// Get a required coordinate, rejecting non-finite or out-of-range values
fn required_coordinate(event: &BytesStart, key: &'static str, limit: f64) -> Result<f64> {
    let value: f64 = required_number(event, key)?;
    if value.is_finite() && value.abs() <= limit {
        Ok(value)
    } else {
        Err(TaggerError::InvalidNumber {
            element: element_name(event),
            attribute: key,
            value: value.to_string(),
        })
    }
}

/// Node `lat` attribute, within [-90, 90]
pub(crate) fn required_lat(event: &BytesStart) -> Result<f64> {
    required_coordinate(event, "lat", 90.0)
}

/// Node `lon` attribute, within [-180, 180]
pub(crate) fn required_lon(event: &BytesStart) -> Result<f64> {
    required_coordinate(event, "lon", 180.0)
}
