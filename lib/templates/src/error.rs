use thiserror::Error;

pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template '{id}' has embedding dimension {actual}, expected {expected}")]
    InvalidDimension {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate template id: {0}")]
    DuplicateId(String),
}
