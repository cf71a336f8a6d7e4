//! Embedded, single-process vector-and-document store.
//!
//! A [Dataset] is a named collection of records living under one directory.
//! Each record carries a data blob, a meta blob, an optional fixed-dimension
//! float vector, zero or more tags, and an optional `(group, place)`
//! membership. Records are addressed by a dense `i64` id assigned on
//! [Dataset::append] and stay stable until [Dataset::compact] renumbers
//! survivors after deletions.
//!
//! ```no_run
//! use vekton::{Dataset, DatasetConfig, Item};
//!
//! # fn main() -> vekton::Result<()> {
//! let mut config = DatasetConfig::default();
//! config.vector_dim = 3;
//! let mut ds = Dataset::create(std::path::Path::new("/tmp/vekton-demo"), "docs", config)?;
//!
//! let id = ds.append(Item {
//!     data: b"hello world".to_vec(),
//!     vector: Some(vec![0.1, 0.2, 0.3]),
//!     ..Default::default()
//! })?;
//! ds.flush()?;
//! assert_eq!(ds.read(id, vekton::selector::ALL)?.data, b"hello world");
//! # Ok(())
//! # }
//! ```

mod blob_heap;
mod config;
mod dataset;
mod error;
mod file;
mod group_directory;
mod index;
mod record;
pub mod selector;
mod tag_index;
mod util;
mod vector_store;

pub use config::DatasetConfig;
pub use dataset::{Dataset, Item, Record};
pub use error::{Error, Result};
pub use record::Descriptor;
pub use vector_store::{Metric, SortOrder};
