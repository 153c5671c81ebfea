use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Row {row} has {actual} cells, expected {expected}")]
    RowWidth { row: usize, expected: usize, actual: usize },
}
