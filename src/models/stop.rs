//! Classification of public transport stops, stations and places.

/// Kind of a stop-like node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    Stop,
    Station,
    Place,
}

/// Determine the stop kind from a node's tags.
///
/// The first matching tag wins.
pub fn classify_stop<'a, I>(tags: I) -> Option<StopKind>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter().find_map(|(key, value)| stop_kind(key, value))
}

fn stop_kind(key: &str, value: &str) -> Option<StopKind> {
    match (key, value) {
        (
            "place",
            "city" | "town" | "village" | "hamlet" | "isolated_dwelling" | "locality",
        ) => Some(StopKind::Place),
        ("amenity", "bus_station") => Some(StopKind::Station),
        ("public_transport", "stop" | "stop_position" | "stop_area") => Some(StopKind::Stop),
        ("public_transport", "station") => Some(StopKind::Station),
        ("highway", "bus_stop") => Some(StopKind::Stop),
        ("railway", "halt") => Some(StopKind::Stop),
        ("railway", "station") => Some(StopKind::Station),
        _ => None,
    }
}
