use crate::inspect::TemplateInspectError;
use std::fmt;

#[derive(Debug)]
pub enum StampError {
    Pdf(String),
    Template(TemplateInspectError),
    InvalidConfiguration(String),
    Records(String),
    Io(std::io::Error),
}

impl fmt::Display for StampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StampError::Pdf(message) => write!(f, "pdf error: {}", message),
            StampError::Template(err) => write!(f, "template rejected: {}", err),
            StampError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            StampError::Records(message) => write!(f, "records error: {}", message),
            StampError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for StampError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StampError::Template(err) => Some(err),
            StampError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StampError {
    fn from(value: std::io::Error) -> Self {
        StampError::Io(value)
    }
}

impl From<TemplateInspectError> for StampError {
    fn from(value: TemplateInspectError) -> Self {
        StampError::Template(value)
    }
}

impl From<csv::Error> for StampError {
    fn from(value: csv::Error) -> Self {
        StampError::Records(value.to_string())
    }
}

pub(crate) fn lopdf_err(err: lopdf::Error) -> StampError {
    StampError::Pdf(err.to_string())
}
