//! A batch client for the NOAA CO-OPS verified monthly water level service.
//!
//! This crate implements a simple per-station flow:
//! read a list of station ids, send one SOAP request per station, then write
//! the observations for the chosen tidal datum to `<station>.dat`.
//!
//! ## Quick start
//! - The endpoint defaults to the public NOAA service. Override it with
//!   `TIDESOAP_URL` / `TIDESOAP_TIMEOUT` or a `.tidesoaprc` file (current
//!   directory or home directory).
//! - Build a [`RunConfig`], then hand a [`SoapClient`] to a [`Runner`].
//!
//! ```no_run
//! use anyhow::Result;
//! use tidesoap::{Datum, InputFormat, RunConfig, Runner, SoapClient, StationList};
//!
//! fn main() -> Result<()> {
//!     let config = RunConfig::builder()
//!         .with_output_dir("tides")
//!         .with_datum(Datum::Mllw)
//!         .with_start("20200101 00:00")
//!         .with_end("20201231 23:59")
//!         .build()?;
//!
//!     let stations = StationList::open("stationlist.dat", InputFormat::Delimited)?;
//!     let runner = Runner::new(&config, SoapClient::from_env()?);
//!     let summary = runner.run(stations.iter()?);
//!     summary.log();
//!     Ok(())
//! }
//! ```
//!
//! For the command-line tool, see `tidesoap --help`.

#![forbid(unsafe_code)]

pub mod cli;
mod client;
mod config;
pub mod console;
mod datum;
mod error;
pub mod format;
mod observation;
mod output;
mod request;
pub mod response;
mod runner;
mod stations;
mod util;

pub use client::{SoapClient, Transport};
pub use config::{
    ConsoleFlags, DEFAULT_INPUT, DEFAULT_OUTPUT_DIR, DEFAULT_START, DEFAULT_URL, EndpointConfig,
    OutputFlags, RunConfig, RunConfigBuilder, TIMESTAMP_FORMAT, clean_timestamp, load_endpoint,
    months_before, parse_timestamp,
};
pub use datum::{Datum, Reading};
pub use error::{Result, TideError};
pub use format::{MISSING_TIMESTAMP, OutputFormat, render};
pub use observation::{Metadata, MetadataField, Observation};
pub use output::{OutputFile, OutputTarget};
pub use request::{OPERATION, Request, SOAP_ACTION, WATER_NS};
pub use response::{Fault, ResponseEnvelope, Success, classify};
pub use runner::{RunSummary, Runner, StationOutcome};
pub use stations::{InputFormat, StationIds, StationList, load_station_ids, parse_station_line};
