use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table error: {0}")]
    Table(#[from] tabx_core::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] tabx_schema::SchemaError),

    #[error("CSV file has no header row: {0}")]
    MissingHeader(String),
}

impl<E> From<atomicwrites::Error<E>> for StorageError
where
    E: Into<StorageError>,
{
    fn from(err: atomicwrites::Error<E>) -> Self {
        match err {
            atomicwrites::Error::Internal(e) => StorageError::Io(e),
            atomicwrites::Error::User(e) => e.into(),
        }
    }
}
