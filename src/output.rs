//! Per-station output files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::format::OutputFormat;

const RAW_SUFFIX: &str = "_response.xml";

/// Where one station's output goes. Files are always truncated on open, so a
/// re-run overwrites the previous results instead of appending to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    directory: PathBuf,
    base_name: String,
    format: OutputFormat,
}

impl OutputTarget {
    pub fn new(directory: impl Into<PathBuf>, station: &str, format: OutputFormat) -> Self {
        Self {
            directory: directory.into(),
            base_name: station.to_string(),
            format,
        }
    }

    /// `<dir>/<station>.<ext>`
    pub fn path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.base_name, self.format.extension()))
    }

    /// `<dir>/<station>_response.xml`
    pub fn raw_path(&self) -> PathBuf {
        self.directory.join(format!("{}{}", self.base_name, RAW_SUFFIX))
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Writes the untouched response body.
    pub fn write_raw(&self, body: &str) -> Result<PathBuf> {
        let path = self.raw_path();
        std::fs::write(&path, body)?;
        Ok(path)
    }

    pub fn create(&self) -> Result<OutputFile> {
        let path = self.path();
        let file = File::create(&path)?;
        Ok(OutputFile {
            path,
            out: BufWriter::new(file),
            lines: 0,
        })
    }
}

/// An open output file for one station.
pub struct OutputFile {
    path: PathBuf,
    out: BufWriter<File>,
    lines: usize,
}

impl OutputFile {
    pub fn write_record(&mut self, record: &str) -> Result<()> {
        self.out.write_all(record.as_bytes())?;
        self.lines += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and closes the file, returning the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.out.flush()?;
        Ok(self.lines)
    }
}
