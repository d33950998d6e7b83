//! Batch and endpoint configuration.
//!
//! [`RunConfig`] is built once, validated, and then only read. The endpoint
//! settings come from explicit arguments, the environment, or a
//! `.tidesoaprc` file, in that order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Months, NaiveDateTime, Utc};
use tracing::debug;

use crate::datum::Datum;
use crate::error::{Result, TideError};
use crate::format::OutputFormat;
use crate::stations::InputFormat;

pub const DEFAULT_URL: &str =
    "https://opendap.co-ops.nos.noaa.gov/axis/services/WaterLevelVerifiedMonthly";
pub const DEFAULT_START: &str = "19500101 00:00";
pub const DEFAULT_INPUT: &str = "stationlist.dat";
pub const DEFAULT_OUTPUT_DIR: &str = "./";
/// Request timestamp layout, always GMT.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_MAX: usize = 3;

/// Which files are written per station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFlags {
    pub files: bool,
    pub raw: bool,
}

impl Default for OutputFlags {
    fn default() -> Self {
        Self {
            files: true,
            raw: false,
        }
    }
}

/// Which diagnostics are echoed to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleFlags {
    pub metadata: bool,
    pub observations: bool,
    pub progress: bool,
}

/// Validated, read-only configuration shared by every station in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    pub datum: Datum,
    pub start: String,
    pub end: String,
    pub outputs: OutputFlags,
    pub console: ConsoleFlags,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    output_dir: Option<PathBuf>,
    input_format: InputFormat,
    output_format: OutputFormat,
    datum: Datum,
    start: Option<String>,
    months: Option<u32>,
    end: Option<String>,
    outputs: OutputFlags,
    console: ConsoleFlags,
}

impl RunConfigBuilder {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_input_format(mut self, format: InputFormat) -> Self {
        self.input_format = format;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_datum(mut self, datum: Datum) -> Self {
        self.datum = datum;
        self
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Start `months` calendar months before now. Takes precedence over
    /// [`with_start`](Self::with_start).
    pub fn with_months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_outputs(mut self, outputs: OutputFlags) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_console(mut self, console: ConsoleFlags) -> Self {
        self.console = console;
        self
    }

    /// Validates the settings and prepares the output directory.
    ///
    /// Nothing touches the network before this succeeds.
    pub fn build(self) -> Result<RunConfig> {
        let now = Utc::now().naive_utc();

        let start = match (self.months, self.start) {
            (Some(months), _) => months_before(now, months)?,
            (None, Some(raw)) => parse_timestamp("start", &raw)?,
            (None, None) => parse_timestamp("start", DEFAULT_START)?,
        };
        let end = match self.end {
            Some(raw) => parse_timestamp("end", &raw)?,
            None => now,
        };
        if start > end {
            return Err(TideError::Config(format!(
                "start {} is after end {}",
                start.format(TIMESTAMP_FORMAT),
                end.format(TIMESTAMP_FORMAT)
            )));
        }

        if self.outputs.files && self.output_format == OutputFormat::Structured {
            return Err(TideError::UnsupportedFormat {
                kind: "output",
                format: "XML",
            });
        }

        let output_dir = self
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        if self.outputs.files || self.outputs.raw {
            prepare_output_dir(&output_dir)?;
        }

        Ok(RunConfig {
            output_dir,
            input_format: self.input_format,
            output_format: self.output_format,
            datum: self.datum,
            start: start.format(TIMESTAMP_FORMAT).to_string(),
            end: end.format(TIMESTAMP_FORMAT).to_string(),
            outputs: self.outputs,
            console: self.console,
        })
    }
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(TideError::Config(format!(
                "output path {} is an existing file, not a directory",
                dir.display()
            )));
        }
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        TideError::Config(format!(
            "failed to create output directory {}: {}",
            dir.display(),
            e
        ))
    })
}

/// Normalizes user input: whitespace runs collapse to one space and a bare
/// `YYYYMMDD` gets a `00:00` time of day.
pub fn clean_timestamp(raw: &str) -> String {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.len() == 8 && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        format!("{cleaned} 00:00")
    } else {
        cleaned
    }
}

/// Cleans and checks a `YYYYMMDD HH:MM` timestamp.
///
/// This is a textual check only; dates far in the past or future are accepted.
pub fn parse_timestamp(which: &str, raw: &str) -> Result<NaiveDateTime> {
    let cleaned = clean_timestamp(raw);
    NaiveDateTime::parse_from_str(&cleaned, TIMESTAMP_FORMAT).map_err(|_| {
        TideError::Config(format!(
            "{which} date '{raw}' is not a valid timestamp (expected YYYYMMDD HH:MM)"
        ))
    })
}

pub fn months_before(now: NaiveDateTime, months: u32) -> Result<NaiveDateTime> {
    if months == 0 {
        return Err(TideError::Config(
            "month count must be a natural number (1, 2, 3, ...)".into(),
        ));
    }
    now.checked_sub_months(Months::new(months))
        .ok_or_else(|| TideError::Config(format!("{months} months before now is out of range")))
}

/// Where and how to reach the SOAP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub url: String,
    pub timeout: Duration,
    pub retry_max: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_max: DEFAULT_RETRY_MAX,
        }
    }
}

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    timeout: Option<u64>,
    retry_max: Option<usize>,
}

/// Resolves endpoint settings from (in order of precedence) the explicit
/// arguments, `TIDESOAP_URL` / `TIDESOAP_TIMEOUT`, the first rc file found,
/// and the built-in defaults.
pub fn load_endpoint(url: Option<String>, timeout_secs: Option<u64>) -> Result<EndpointConfig> {
    let mut url = url.or_else(|| std::env::var("TIDESOAP_URL").ok());
    let mut timeout_secs = match timeout_secs {
        Some(t) => Some(t),
        None => match std::env::var("TIDESOAP_TIMEOUT") {
            Ok(v) => Some(v.trim().parse::<u64>().map_err(|_| {
                TideError::Config(format!("TIDESOAP_TIMEOUT is not a number of seconds: {v}"))
            })?),
            Err(_) => None,
        },
    };
    let mut retry_max = None;

    for rc_path in rc_candidates() {
        if rc_path.is_file() {
            debug!("reading endpoint configuration from {}", rc_path.display());
            let text = std::fs::read_to_string(&rc_path).map_err(|e| {
                TideError::Config(format!(
                    "failed to read configuration file {}: {}",
                    rc_path.display(),
                    e
                ))
            })?;
            let rc = parse_rc(&text)
                .map_err(|e| TideError::Config(format!("{}: {}", rc_path.display(), e)))?;
            url = url.or(rc.url);
            timeout_secs = timeout_secs.or(rc.timeout);
            retry_max = rc.retry_max;
            break;
        }
    }

    let defaults = EndpointConfig::default();
    let timeout = match timeout_secs {
        Some(0) => return Err(TideError::Config("timeout must be at least one second".into())),
        Some(secs) => Duration::from_secs(secs),
        None => defaults.timeout,
    };

    Ok(EndpointConfig {
        url: url.unwrap_or(defaults.url),
        timeout,
        retry_max: retry_max.unwrap_or(defaults.retry_max),
    })
}

/// Parses `key: value` lines. Blank lines and `#` comments are ignored, as
/// are unknown keys.
fn parse_rc(text: &str) -> std::result::Result<RcConfig, String> {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        let v = strip_quotes(v.trim());
        match k.trim() {
            "url" if !v.is_empty() => cfg.url = Some(v.to_string()),
            "timeout" => {
                cfg.timeout = Some(
                    v.parse()
                        .map_err(|_| format!("timeout is not a number of seconds: {v}"))?,
                )
            }
            "retry_max" => {
                cfg.retry_max = Some(v.parse().map_err(|_| format!("retry_max is not a count: {v}"))?)
            }
            _ => {}
        }
    }

    Ok(cfg)
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) TIDESOAP_RC (explicit)
    // 2) ./.tidesoaprc
    // 3) ~/.tidesoaprc
    if let Ok(p) = std::env::var("TIDESOAP_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".tidesoaprc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".tidesoaprc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn timestamps_are_cleaned() {
        assert_eq!(clean_timestamp("20200101"), "20200101 00:00");
        assert_eq!(clean_timestamp("  20200101   12:30 "), "20200101 12:30");
        assert_eq!(parse_timestamp("start", "20200101").unwrap(), at(2020, 1, 1));
    }

    #[test]
    fn bad_timestamps_are_config_errors() {
        for raw in ["2020-01-01 00:00", "20201301 00:00", "yesterday", ""] {
            assert!(
                matches!(parse_timestamp("start", raw), Err(TideError::Config(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn months_before_uses_calendar_months() {
        assert_eq!(months_before(at(2024, 3, 31), 1).unwrap(), at(2024, 2, 29));
        assert_eq!(months_before(at(2024, 3, 1), 12).unwrap(), at(2023, 3, 1));
        assert!(months_before(at(2024, 3, 1), 0).is_err());
    }

    #[test]
    fn build_formats_range_and_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let cfg = RunConfig::builder()
            .with_output_dir(&out)
            .with_start("20200101")
            .with_end("20201231 23:59")
            .with_datum(Datum::Mllw)
            .build()
            .unwrap();
        assert!(out.is_dir());
        assert_eq!(cfg.start, "20200101 00:00");
        assert_eq!(cfg.end, "20201231 23:59");
        assert_eq!(cfg.datum, Datum::Mllw);
        assert!(cfg.outputs.files);
        assert!(!cfg.outputs.raw);
    }

    #[test]
    fn output_path_that_is_a_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = RunConfig::builder()
            .with_output_dir(file.path())
            .build()
            .unwrap_err();
        assert!(matches!(err, TideError::Config(_)));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::builder()
            .with_output_dir(dir.path())
            .with_start("20210101")
            .with_end("20200101")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("is after end"));
    }

    #[test]
    fn structured_output_files_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::builder()
            .with_output_dir(dir.path())
            .with_output_format(OutputFormat::Structured)
            .build()
            .unwrap_err();
        assert!(matches!(err, TideError::UnsupportedFormat { kind: "output", .. }));

        // Console-only runs never render, so the format does not matter.
        let cfg = RunConfig::builder()
            .with_output_dir(dir.path())
            .with_output_format(OutputFormat::Structured)
            .with_outputs(OutputFlags {
                files: false,
                raw: false,
            })
            .build();
        assert!(cfg.is_ok());
    }

    #[test]
    fn rc_file_parsing() {
        let rc = parse_rc(
            "# endpoint\nurl: \"http://localhost:8080/soap\"\ntimeout: 5\nretry_max: 1\nother: x\n",
        )
        .unwrap();
        assert_eq!(rc.url.as_deref(), Some("http://localhost:8080/soap"));
        assert_eq!(rc.timeout, Some(5));
        assert_eq!(rc.retry_max, Some(1));

        assert!(parse_rc("timeout: soon").is_err());
    }
}
