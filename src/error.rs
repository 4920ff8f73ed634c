use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaggerError>;

#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{element}> attribute '{attribute}' is not a valid number: {value}")]
    InvalidNumber {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("Malformed document: {0}")]
    Structure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for TaggerError {
    fn from(source: quick_xml::Error) -> Self {
        TaggerError::Xml {
            position: 0,
            source,
        }
    }
}

impl TaggerError {
    /// Attach the reader position to an XML error.
    pub fn at(self, position: usize) -> Self {
        match self {
            TaggerError::Xml { source, .. } => TaggerError::Xml { position, source },
            other => other,
        }
    }
}
