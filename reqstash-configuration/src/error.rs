use reqstash_core::StorageError;

/// Error raised while loading or applying a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid YAML for [`ConfigCache`](crate::ConfigCache).
    #[error("invalid configuration document: {0}")]
    Parse(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A field holds a value the cache cannot use.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// The configured store could not be opened.
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
}
