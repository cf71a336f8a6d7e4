//! Dataset configuration: dimension and append-buffer sizes, persisted as
//! JSON alongside the dataset's files.

use serde::{Deserialize, Serialize};

use crate::{err_at, file::File, Error, Result};

fn default_append_buffer() -> usize {
    1024
}

fn default_vector_buffer() -> usize {
    1024
}

/// Per-dataset tunables. Fields map 1:1 onto the on-disk JSON names; absent
/// fields in the JSON fall back to the engine defaults above.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(rename = "vector_size", default)]
    pub vector_dim: usize,

    #[serde(rename = "max_index_append_buffer_size", default = "default_append_buffer")]
    pub max_index_append_buffer: usize,

    #[serde(rename = "max_vector_buffer_size", default = "default_vector_buffer")]
    pub max_vector_buffer: usize,

    #[serde(rename = "max_vector_append_buffer_size", default = "default_append_buffer")]
    pub max_vector_append_buffer: usize,

    #[serde(rename = "max_data_append_buffer_size", default = "default_append_buffer")]
    pub max_data_append_buffer: usize,

    #[serde(rename = "max_meta_data_append_buffer_size", default = "default_append_buffer")]
    pub max_meta_append_buffer: usize,
}

impl Default for DatasetConfig {
    fn default() -> DatasetConfig {
        DatasetConfig {
            vector_dim: 0,
            max_index_append_buffer: default_append_buffer(),
            max_vector_buffer: default_vector_buffer(),
            max_vector_append_buffer: default_append_buffer(),
            max_data_append_buffer: default_append_buffer(),
            max_meta_append_buffer: default_append_buffer(),
        }
    }
}

impl DatasetConfig {
    pub fn save<P: Into<std::ffi::OsString>>(&self, loc: P) -> Result<()> {
        let text = err_at!(FailConvert, serde_json::to_string_pretty(self))?;
        let file = File::new(loc);
        file.create_empty()?;
        let mut appender = file.appender()?;
        appender.append(text.as_bytes())?;
        appender.close()
    }

    pub fn load<P: Into<std::ffi::OsString>>(loc: P) -> Result<DatasetConfig> {
        let file = File::new(loc);
        let len = file.len()?;
        let mut reader = file.reader(0)?;
        let bytes = reader.read_n(len as usize)?;
        err_at!(FailConvert, serde_json::from_slice(&bytes))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
