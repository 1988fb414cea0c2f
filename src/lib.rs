//! dbfacade - Thin facades over a document store and a relational store
//!
//! - [`DocumentStoreClient`] wraps a cluster/bucket document database
//! - [`RelationalStoreClient`] wraps a relational connection and returns
//!   [`TabularResult`]s
//! - [`TabularResult`] turns column names plus row tuples into JSON records

pub mod engine;

pub use engine::{
    DocumentFetchResult, DocumentStoreClient, FetchMode, Record, RelationalStoreClient,
    StoreError, TabularResult,
};
