// dbfacade Engine - Core module structure
pub mod adapter;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod nosql;
pub mod tabular;

pub use config::Config;
pub use database::RelationalStoreClient;
pub use error::{EntityKind, StoreError};
pub use nosql::{DocumentFetchResult, DocumentStoreClient, FetchMode};
pub use tabular::{Record, TabularResult};
