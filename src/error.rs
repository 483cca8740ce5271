use miette::Diagnostic;
use thiserror::Error;

/// Main error type for particraft operations
#[derive(Error, Diagnostic, Debug)]
pub enum CraftError {
    #[error("IO error: {0}")]
    #[diagnostic(code(particraft::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(particraft::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Parse error: {message}")]
    #[diagnostic(code(particraft::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Format error: {message}")]
    #[diagnostic(code(particraft::format))]
    Format {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Size error: {message}")]
    #[diagnostic(code(particraft::size))]
    Size { message: String },

    #[error("Validation error: {message}")]
    #[diagnostic(code(particraft::validate))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Font error: {message}")]
    #[diagnostic(code(particraft::font))]
    Font { message: String },

    #[error("Identity registry error: {message}")]
    #[diagnostic(code(particraft::registry))]
    Registry {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CraftError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<std::path::PathBuf>, context: &str, err: std::io::Error) -> Self {
        CraftError::Io {
            path: path.into(),
            message: format!("{}: {}", context, err),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        CraftError::Format {
            message: message.into(),
            help: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CraftError::Validation {
            message: message.into(),
            help: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CraftError>;
