//! Station list loading.
//!
//! The delimited format is one record per line with the station id as the
//! first comma-separated field:
//!
//! ```text
//! 8454000, Providence RI
//! 8518750,The Battery NY
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, TideError};

/// Layout of the station list file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    #[default]
    Delimited,
    /// Declared for parity with the output formats; loading it is unsupported.
    Structured,
}

/// A station list on disk.
///
/// Each call to [`StationList::iter`] re-opens the file, so the sequence can
/// be walked any number of times.
#[derive(Debug, Clone)]
pub struct StationList {
    path: PathBuf,
    format: InputFormat,
}

impl StationList {
    pub fn open(path: impl Into<PathBuf>, format: InputFormat) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(TideError::FileNotFound { path });
        }
        if format == InputFormat::Structured {
            return Err(TideError::UnsupportedFormat {
                kind: "input",
                format: "XML",
            });
        }
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> InputFormat {
        self.format
    }

    pub fn iter(&self) -> Result<StationIds> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TideError::FileNotFound {
                path: self.path.clone(),
            },
            _ => TideError::Io(e),
        })?;
        Ok(StationIds {
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_no: 0,
        })
    }
}

/// Lazy sequence of station ids read from a delimited file.
///
/// Lines are decoded lossily, so a stray Latin-1 byte only affects its own
/// line. The sequence ends early only on a real read failure.
pub struct StationIds {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_no: usize,
}

impl Iterator for StationIds {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("station list read failed after line {}: {}", self.line_no, e);
                    return None;
                }
            }
            self.line_no += 1;

            let line = String::from_utf8_lossy(&self.buf);
            match parse_station_line(&line) {
                Some(id) => return Some(id),
                None => debug!("skipping malformed station list line {}: {:?}", self.line_no, line),
            }
        }
    }
}

/// Extracts the station id from one delimited line.
///
/// All whitespace is removed before splitting, and the first field must
/// parse as an integer. The original digits are kept so leading zeros survive.
pub fn parse_station_line(line: &str) -> Option<String> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let first = compact.split(',').next()?;
    first.parse::<i64>().ok()?;
    Some(first.to_string())
}

/// Reads every station id in the file, in order.
pub fn load_station_ids(path: impl Into<PathBuf>, format: InputFormat) -> Result<Vec<String>> {
    let list = StationList::open(path, format)?;
    let ids: Vec<String> = list.iter()?.collect();
    debug!("station ids: {}", ids.join(","));
    Ok(ids)
}
