use std::path::PathBuf;

pub(crate) type DataverResult<T> = Result<T, DataverError>;

macro_rules! bail {
    ($($arg:tt)*) => {{
        return Err(DataverError::Other(format!($($arg)*)));
    }};
}

pub(crate) use bail;

#[derive(Debug, thiserror::Error)]
pub(crate) enum DataverError {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("corrupt manifest: {0}")]
    CorruptManifest(String),

    #[error(
        "version directory {0:?} already exists (use `--force` to \
            overwrite it)"
    )]
    VersionExists(PathBuf),

    #[error("{0}")]
    Other(String),
}

impl DataverError {
    #[inline]
    pub(crate) fn source_unavailable<T: ToString>(s: T) -> Self {
        Self::SourceUnavailable(s.to_string())
    }

    #[inline]
    pub(crate) fn invalid_config<T: ToString>(s: T) -> Self {
        Self::InvalidConfig(s.to_string())
    }

    #[inline]
    pub(crate) fn corrupt<T: ToString>(s: T) -> Self {
        Self::CorruptManifest(s.to_string())
    }

    #[inline]
    pub(crate) fn other<T: ToString>(s: T) -> Self {
        Self::Other(s.to_string())
    }
}
