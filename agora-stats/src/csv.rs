//! Thin CSV writer: one file per tracker, first column the step number,
//! remaining columns the tracker-specific metrics named in a header row.
//! The exact per-tracker column sets are a tracker concern (file formats
//! themselves are external) — this only implements the
//! mechanism.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct CsvWriter {
    path: PathBuf,
    file: BufWriter<File>,
}

impl CsvWriter {
    /// Create (or truncate) `path` and write `header` as the first row,
    /// prefixed with `step`.
    pub fn create(path: impl AsRef<Path>, header: &[&str]) -> Result<Self, CsvError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CsvError::Open {
                path: path.clone(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| CsvError::Open {
            path: path.clone(),
            source,
        })?;
        let mut file = BufWriter::new(file);
        let mut line = String::from("step");
        for column in header {
            line.push(',');
            line.push_str(column);
        }
        line.push('\n');
        file.write_all(line.as_bytes())
            .map_err(|source| CsvError::Write { path: path.clone(), source })?;
        Ok(Self { path, file })
    }

    /// Write one `step,field,field,...` row.
    pub fn write_row(&mut self, step: u64, fields: &[String]) -> Result<(), CsvError> {
        let mut line = step.to_string();
        for field in fields {
            line.push(',');
            line.push_str(field);
        }
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .map_err(|source| CsvError::Write {
                path: self.path.clone(),
                source,
            })
    }

    pub fn flush(&mut self) -> Result<(), CsvError> {
        self.file.flush().map_err(|source| CsvError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
