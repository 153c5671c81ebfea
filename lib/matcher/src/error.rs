use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatcherError>;

/// Load-time failures; per-query problems are never errors
#[derive(Error, Debug)]
pub enum MatcherError {
    #[error(transparent)]
    Schema(#[from] tabx_schema::SchemaError),

    #[error(transparent)]
    Storage(#[from] tabx_storage::StorageError),

    #[error(transparent)]
    Template(#[from] tabx_templates::TemplateError),
}
