//! Command-line front end.
//!
//! [`Args`] maps one-to-one onto [`RunConfig`] and [`EndpointConfig`]; all
//! validation happens in the configuration layer so the library and the
//! binary reject the same inputs.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::{
    ConsoleFlags, DEFAULT_INPUT, DEFAULT_OUTPUT_DIR, EndpointConfig, OutputFlags, RunConfig,
    load_endpoint,
};
use crate::datum::Datum;
use crate::error::Result;
use crate::format::OutputFormat;
use crate::stations::InputFormat;

/// File format named on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    #[default]
    Csv,
    Xml,
}

impl From<FormatArg> for InputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => InputFormat::Delimited,
            FormatArg::Xml => InputFormat::Structured,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Xml => OutputFormat::Structured,
        }
    }
}

/// Fetch verified monthly water levels for a list of NOAA tide stations.
///
/// Each station id in the input file is queried in turn; successful
/// responses are written to `<output>/<station>.dat` as
/// `<timestamp>, <value>` lines for the selected datum.
#[derive(Debug, Clone, Parser)]
#[command(name = "tidesoap", version)]
pub struct Args {
    /// Station list, one station per line (first comma-separated field)
    #[arg(value_name = "INPUT", default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Directory for the per-station output files
    #[arg(value_name = "OUTPUT", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Tidal datum to extract (MHHW, MHW, DTL, MTL, MSL, MLW, MLLW, GT, MN, DHQ, DLQ, HWI, LWI)
    #[arg(long, value_name = "DATUM", default_value = "MSL")]
    pub datum: Datum,

    /// Start of the range, "YYYYMMDD HH:MM" or "YYYYMMDD" (GMT)
    #[arg(long = "from", value_name = "TIMESTAMP", conflicts_with = "months")]
    pub from: Option<String>,

    /// End of the range, "YYYYMMDD HH:MM" or "YYYYMMDD" (GMT); defaults to now
    #[arg(long = "to", value_name = "TIMESTAMP")]
    pub to: Option<String>,

    /// Start the range N calendar months before now
    #[arg(long, value_name = "N")]
    pub months: Option<u32>,

    /// Station list format
    #[arg(long, value_enum, ignore_case = true, default_value_t = FormatArg::Csv)]
    pub inpf: FormatArg,

    /// Output file format
    #[arg(long, value_enum, ignore_case = true, default_value_t = FormatArg::Csv)]
    pub outf: FormatArg,

    /// Echo station metadata and every observation to stdout
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Quiet stdout and progress logging; errors and warnings still go to stderr
    #[arg(long)]
    pub suppress_console: bool,

    /// Silence all log output
    #[arg(long)]
    pub suppress_errors: bool,

    /// Also save each raw response as <station>_response.xml
    #[arg(long)]
    pub raw: bool,

    /// Save only the raw responses, no data files
    #[arg(long)]
    pub raw_only: bool,

    /// Write no files at all, raw responses included
    #[arg(long)]
    pub suppress_files: bool,

    /// Show a progress spinner while stations are processed
    #[arg(long)]
    pub progress: bool,

    /// Service endpoint (overrides TIDESOAP_URL and .tidesoaprc)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl Args {
    pub fn output_flags(&self) -> OutputFlags {
        OutputFlags {
            files: !(self.suppress_files || self.raw_only),
            raw: (self.raw || self.raw_only) && !self.suppress_files,
        }
    }

    pub fn console_flags(&self) -> ConsoleFlags {
        let echo = self.verbose && !self.suppress_console;
        ConsoleFlags {
            metadata: echo,
            observations: echo,
            progress: self.progress,
        }
    }

    /// Builds and validates the batch configuration. Creates the output
    /// directory when needed.
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut builder = RunConfig::builder()
            .with_output_dir(&self.output)
            .with_input_format(self.inpf.into())
            .with_output_format(self.outf.into())
            .with_datum(self.datum)
            .with_outputs(self.output_flags())
            .with_console(self.console_flags());
        if let Some(months) = self.months {
            builder = builder.with_months(months);
        }
        if let Some(from) = &self.from {
            builder = builder.with_start(from);
        }
        if let Some(to) = &self.to {
            builder = builder.with_end(to);
        }
        builder.build()
    }

    pub fn endpoint(&self) -> Result<EndpointConfig> {
        load_endpoint(self.url.clone(), self.timeout)
    }

    /// Default filter directive for the log subscriber.
    pub fn log_level(&self) -> &'static str {
        if self.suppress_errors {
            "off"
        } else if self.suppress_console {
            "warn"
        } else if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over the flags.
pub fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidesoap={}", args.log_level())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tidesoap").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.input, PathBuf::from("stationlist.dat"));
        assert_eq!(args.output, PathBuf::from("./"));
        assert_eq!(args.datum, Datum::Msl);
        assert_eq!(args.inpf, FormatArg::Csv);
        assert_eq!(args.output_flags(), OutputFlags::default());
        assert_eq!(args.console_flags(), ConsoleFlags::default());
        assert_eq!(args.log_level(), "info");
    }

    #[test]
    fn values_are_case_insensitive() {
        let args = parse(&["--datum", "mllw", "--outf", "XML", "--inpf", "Csv"]);
        assert_eq!(args.datum, Datum::Mllw);
        assert_eq!(args.outf, FormatArg::Xml);
        assert_eq!(args.inpf, FormatArg::Csv);
    }

    #[test]
    fn unknown_datum_is_rejected() {
        let argv = ["tidesoap", "--datum", "XYZ"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn raw_only_disables_data_files() {
        let flags = parse(&["--raw-only"]).output_flags();
        assert!(flags.raw);
        assert!(!flags.files);
    }

    #[test]
    fn suppress_files_also_drops_raw_output() {
        let flags = parse(&["--raw", "--suppress-files"]).output_flags();
        assert_eq!(
            flags,
            OutputFlags {
                files: false,
                raw: false
            }
        );
        let flags = parse(&["--raw-only", "--suppress-files"]).output_flags();
        assert!(!flags.raw);
    }

    #[test]
    fn suppress_console_wins_over_verbose() {
        assert!(parse(&["--verbose"]).console_flags().metadata);
        let console = parse(&["--verbose", "--suppress-console"]).console_flags();
        assert!(!console.metadata);
        assert!(!console.observations);
    }

    #[test]
    fn log_level_flags() {
        assert_eq!(parse(&["--debug"]).log_level(), "debug");
        assert_eq!(parse(&["--debug", "--suppress-errors"]).log_level(), "off");
        assert_eq!(parse(&["--debug", "--suppress-console"]).log_level(), "warn");
        assert_eq!(parse(&["--suppress-console", "--suppress-errors"]).log_level(), "off");
    }

    #[test]
    fn from_and_months_conflict() {
        let argv = ["tidesoap", "--from", "20200101", "--months", "3"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn positional_paths_feed_run_config() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let out_str = out.to_str().unwrap();
        let args = parse(&[
            "stations.txt",
            out_str,
            "--from",
            "20200101",
            "--to",
            "20200201 12:00",
        ]);
        let cfg = args.run_config().unwrap();
        assert_eq!(cfg.output_dir, out);
        assert_eq!(cfg.start, "20200101 00:00");
        assert_eq!(cfg.end, "20200201 12:00");
        assert!(out.is_dir());
    }
}
