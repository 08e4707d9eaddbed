use std::{error::Error, fmt};

/// Market data retrieval failures.
#[derive(Debug)]
pub enum SourceError {
    Http(reqwest::Error),
    UnknownSymbol(String),
    Malformed(String),
    InvalidBaseUrl { url: String, reason: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Http(e) => write!(f, "market data request failed: {e}"),
            SourceError::UnknownSymbol(symbol) => write!(f, "no market data for symbol {symbol}"),
            SourceError::Malformed(reason) => write!(f, "malformed market data: {reason}"),
            SourceError::InvalidBaseUrl { url, reason } => {
                write!(f, "invalid market data url {url:?}: {reason}")
            }
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SourceError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}
