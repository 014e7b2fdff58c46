use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    InvalidDirectoryName { name: String, message: String },
    IdentifierCollision {
        identifier: String,
        existing: String,
        incoming: String,
    },
    InvalidInput { file: PathBuf, message: String },
    ExternalTool { tool: String, message: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::InvalidDirectoryName { name, message } => {
                write!(f, "invalid route directory name '{}': {}", name, message)
            }
            Error::IdentifierCollision {
                identifier,
                existing,
                incoming,
            } => write!(
                f,
                "operation identifier '{}' is derived from both {} and {}",
                identifier, existing, incoming
            ),
            Error::InvalidInput { file, message } => {
                write!(f, "invalid traffic input {}: {}", file.display(), message)
            }
            Error::ExternalTool { tool, message } => {
                write!(f, "external tool '{}' failed: {}", tool, message)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}
