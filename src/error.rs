//! Error types for loading documents, probing audio and reading config

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid analysis document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Track '{track}' is not a mapping of feature name to series: {source}")]
    Track {
        track: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not probe {}: {reason}", path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
