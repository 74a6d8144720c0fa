use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing request parameters.
    #[error("Invalid parameter: {0}")]
    Parameter(String),

    /// The catalog had no data for a table or field.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Tokenizer or similarity model failure.
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid detector registry or matcher settings. Fatal at startup.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
