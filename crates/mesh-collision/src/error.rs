use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by shape capabilities that a shape kind does not provide
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollisionError {
    #[error("Ray tests are not supported for {0} shapes")]
    RayTestUnsupported(&'static str),

    #[error("{0} shapes have no children to query")]
    NotACompound(&'static str),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {msg}")]
    Invalid { field: &'static str, msg: String },
}
