use std::{error::Error, fmt, io, path::PathBuf};

/// Reading or writing a persisted artifact failed.
#[derive(Debug)]
pub enum ArtifactError {
    NotFound(PathBuf),
    Io { path: PathBuf, source: io::Error },
    Decode { path: PathBuf, source: serde_json::Error },
    Encode(serde_json::Error),
    InvalidBestLoss { path: PathBuf, value: String },
    WindowMismatch { expected: usize, got: usize },
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactError::NotFound(path) => write!(f, "artifact {} not found", path.display()),
            ArtifactError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            ArtifactError::Decode { path, source } => {
                write!(f, "could not decode {}: {source}", path.display())
            }
            ArtifactError::Encode(e) => write!(f, "could not encode artifact: {e}"),
            ArtifactError::InvalidBestLoss { path, value } => {
                write!(f, "{} holds {value:?}, expected a loss", path.display())
            }
            ArtifactError::WindowMismatch { expected, got } => write!(
                f,
                "the stored model takes {got} prices per prediction, the service is configured for {expected}"
            ),
        }
    }
}

impl Error for ArtifactError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ArtifactError::Io { source, .. } => Some(source),
            ArtifactError::Decode { source, .. } => Some(source),
            ArtifactError::Encode(e) => Some(e),
            _ => None,
        }
    }
}
