use std::path::PathBuf;

use crate::bus::MenuId;

/// Errors surfaced to the embedding application.
///
/// Routing misses, redundant transitions and unmeasurable boxes are not
/// errors; they are logged and recovered from where they happen.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("menu `{0}` is already registered; unmount it before mounting another")]
    AlreadyRegistered(MenuId),

    #[error("failed to schedule menu task: {0}")]
    Schedule(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
