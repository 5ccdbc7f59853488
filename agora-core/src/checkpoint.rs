//! Tagged, versioned checkpoint envelope.
//!
//! Design §9: a tagged, versioned serialization per component rather than
//! a single shared format — only a stable schema per component is
//! required. Every checkpointable
//! component (the manager, each opted-in controller, the gatherer's running
//! stats) writes one [`Checkpoint`] file under `OUTPUT/<run>/CHECKPOINT/`;
//! correctness only requires writer and reader of a given component to agree
//! on `schema_version`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint {component} schema mismatch: file has v{found}, reader expects v{expected}")]
    SchemaMismatch {
        component: String,
        found: u16,
        expected: u16,
    },
    #[error("failed to (de)serialize checkpoint for {component}: {source}")]
    Serde {
        component: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A self-describing checkpoint blob. The `payload` is opaque to everyone but
/// the component that wrote it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub schema_version: u16,
    pub component: String,
    pub payload: serde_json::Value,
}

impl Checkpoint {
    pub fn new(component: impl Into<String>, schema_version: u16, payload: serde_json::Value) -> Self {
        Self {
            schema_version,
            component: component.into(),
            payload,
        }
    }

    /// Serialize `value` into a checkpoint for `component` at `schema_version`
    /// and write it to `path`.
    pub fn save<T: Serialize>(
        path: &Path,
        component: &str,
        schema_version: u16,
        value: &T,
    ) -> Result<(), CheckpointError> {
        let payload = serde_json::to_value(value).map_err(|source| CheckpointError::Serde {
            component: component.to_string(),
            source,
        })?;
        let checkpoint = Checkpoint::new(component, schema_version, payload);
        let bytes =
            serde_json::to_vec_pretty(&checkpoint).map_err(|source| CheckpointError::Serde {
                component: component.to_string(),
                source,
            })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CheckpointError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, bytes).map_err(|source| CheckpointError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and validate a checkpoint written by [`Checkpoint::save`],
    /// deserializing the payload into `T`. Fails with
    /// [`CheckpointError::SchemaMismatch`] if the on-disk schema version
    /// doesn't match `expected_schema_version`.
    pub fn load<T: for<'de> Deserialize<'de>>(
        path: &Path,
        component: &str,
        expected_schema_version: u16,
    ) -> Result<T, CheckpointError> {
        let bytes = std::fs::read(path).map_err(|source| CheckpointError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let checkpoint: Checkpoint =
            serde_json::from_slice(&bytes).map_err(|source| CheckpointError::Serde {
                component: component.to_string(),
                source,
            })?;
        if checkpoint.schema_version != expected_schema_version {
            return Err(CheckpointError::SchemaMismatch {
                component: component.to_string(),
                found: checkpoint.schema_version,
                expected: expected_schema_version,
            });
        }
        serde_json::from_value(checkpoint.payload).map_err(|source| CheckpointError::Serde {
            component: component.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        step: u64,
        note: String,
    }

    #[test]
    fn round_trip_reproduces_the_same_state() {
        let dir = tempdir();
        let path = dir.join("sample.json");
        let original = Sample {
            step: 50,
            note: "resume me".into(),
        };
        Checkpoint::save(&path, "sample", 1, &original).unwrap();
        let loaded: Sample = Checkpoint::load(&path, "sample", 1).unwrap();
        assert_eq!(loaded, original);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let dir = tempdir();
        let path = dir.join("sample.json");
        Checkpoint::save(&path, "sample", 2, &Sample { step: 1, note: "x".into() }).unwrap();
        let result: Result<Sample, _> = Checkpoint::load(&path, "sample", 1);
        assert!(matches!(result, Err(CheckpointError::SchemaMismatch { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("agora-checkpoint-test-{}", uuid::Uuid::new_v4()));
        dir
    }
}
