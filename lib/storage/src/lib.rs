pub mod error;
pub mod ingest;
pub mod row_store;
pub mod cache;
pub mod artifacts;

pub use error::{Result, StorageError};
pub use ingest::{clean_column_name, load_csv, read_csv, CsvOptions};
pub use row_store::{Row, RowStore, TableStore};
pub use cache::{MemoryCache, ResultCache};
pub use artifacts::ArtifactStore;
