use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- workspace errors ------------------------------------------
    #[error("no workspace folder is open, output logging is paused")]
    NoWorkspace,

    // --------------------------------- file system errors ----------------------------------------
    #[error("create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("log directory for {} is not ensured", path.display())]
    DirNotEnsured { path: PathBuf },
    #[error("truncate log file {}: {source}", path.display())]
    Truncate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("append to log file {}: {source}", path.display())]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },

    // --------------------------------- configuration errors --------------------------------------
    #[error("invalid {field} `{value}`: must be a single plain path component")]
    InvalidComponent { field: &'static str, value: String },
    #[error("read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

