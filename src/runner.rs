//! Sequential per-station pipeline.
//!
//! Every station goes through request, transport, classification and
//! output on its own. A failure at any step is logged and recorded in the
//! [`RunSummary`]; the batch always moves on to the next station.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::client::Transport;
use crate::config::RunConfig;
use crate::console;
use crate::error::TideError;
use crate::format;
use crate::output::{OutputFile, OutputTarget};
use crate::request::Request;
use crate::response::{Fault, ResponseEnvelope, Success, classify};

/// Terminal state of one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationOutcome {
    Succeeded { records: usize, skipped: usize },
    Faulted(Fault),
    TransportFailed(String),
    /// The envelope could not be parsed, or broke off partway through the
    /// observations. Anything already written is kept.
    Malformed { reason: String, records: usize },
    WriteFailed(String),
}

/// Counters for a whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub faulted: usize,
    pub transport_failed: usize,
    pub malformed: usize,
    pub write_failed: usize,
    /// Individual observations skipped across all stations.
    pub skipped_records: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &StationOutcome) {
        self.attempted += 1;
        match outcome {
            StationOutcome::Succeeded { skipped, .. } => {
                self.succeeded += 1;
                self.skipped_records += skipped;
            }
            StationOutcome::Faulted(_) => self.faulted += 1,
            StationOutcome::TransportFailed(_) => self.transport_failed += 1,
            StationOutcome::Malformed { .. } => self.malformed += 1,
            StationOutcome::WriteFailed(_) => self.write_failed += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn log(&self) {
        let message = format!(
            "batch complete: {}/{} stations succeeded ({} faulted, {} transport failures, {} malformed, {} write failures, {} records skipped)",
            self.succeeded,
            self.attempted,
            self.faulted,
            self.transport_failed,
            self.malformed,
            self.write_failed,
            self.skipped_records
        );
        if self.failed() == 0 {
            info!("{message}");
        } else if self.succeeded == 0 {
            error!("{message}");
        } else {
            warn!("{message}");
        }
    }
}

pub struct Runner<'c, T> {
    config: &'c RunConfig,
    transport: T,
}

impl<'c, T: Transport> Runner<'c, T> {
    pub fn new(config: &'c RunConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Processes every station in order.
    pub fn run<I, S>(&self, stations: I) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pb = if self.config.console.progress {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} stations {msg}")
            {
                pb.set_style(style);
            }
            Some(pb)
        } else {
            None
        };

        let mut summary = RunSummary::default();
        for station in stations {
            let station = station.as_ref();
            if let Some(pb) = &pb {
                pb.set_message(station.to_string());
            }

            let outcome = self.process_station(station);
            summary.record(&outcome);

            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        summary
    }

    pub fn process_station(&self, station: &str) -> StationOutcome {
        let cfg = self.config;
        let request = Request::new(station, cfg.start.as_str(), cfg.end.as_str(), cfg.datum);
        info!(station, "querying {request}");

        let raw = match self.transport.call(&request) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(station, "transport failure: {e}");
                return StationOutcome::TransportFailed(e.to_string());
            }
        };

        let target = OutputTarget::new(&cfg.output_dir, station, cfg.output_format);

        // Raw capture happens before parsing so it survives a bad envelope.
        if cfg.outputs.raw {
            match target.write_raw(&raw) {
                Ok(path) => debug!(station, "raw response written to {}", path.display()),
                Err(e) => error!(station, "failed to write raw response: {e}"),
            }
        }

        match classify(&raw) {
            Ok(ResponseEnvelope::Fault(fault)) => {
                error!(station, "{}", fault.clone().into_error());
                StationOutcome::Faulted(fault)
            }
            Ok(ResponseEnvelope::Success(success)) => self.write_success(station, &target, success),
            Err(e) => {
                error!(station, "{e}");
                StationOutcome::Malformed {
                    reason: e.to_string(),
                    records: 0,
                }
            }
        }
    }

    fn write_success(&self, station: &str, target: &OutputTarget, success: Success<'_>) -> StationOutcome {
        let cfg = self.config;
        if cfg.console.metadata {
            console::print_metadata(station, &success.metadata);
        }

        let mut file: Option<OutputFile> = None;
        if cfg.outputs.files {
            match target.create() {
                Ok(f) => file = Some(f),
                Err(e) => {
                    error!(station, "failed to create {}: {e}", target.path().display());
                    return StationOutcome::WriteFailed(e.to_string());
                }
            }
        }

        let mut records = 0usize;
        let mut skipped = 0usize;
        let mut broken: Option<String> = None;

        for item in success.observations {
            let observation = match item {
                Ok(observation) => observation,
                Err(TideError::MalformedRecord(reason)) => {
                    debug!(station, "skipping observation: {reason}");
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(station, "response broke off after {records} records: {e}");
                    broken = Some(e.to_string());
                    break;
                }
            };

            if cfg.console.observations {
                console::print_observation(&observation);
            }

            if let Some(out) = file.as_mut() {
                let line = match format::render(&observation, cfg.datum, cfg.output_format) {
                    Ok(line) => line,
                    Err(e) => {
                        debug!(station, "skipping observation: {e}");
                        skipped += 1;
                        continue;
                    }
                };
                if let Err(e) = out.write_record(&line) {
                    error!(station, "failed to write {}: {e}", out.path().display());
                    return StationOutcome::WriteFailed(e.to_string());
                }
            }
            records += 1;
        }

        if let Some(out) = file {
            let path = out.path().to_path_buf();
            match out.finish() {
                Ok(lines) => info!(station, "wrote {lines} records to {}", path.display()),
                Err(e) => {
                    error!(station, "failed to write {}: {e}", path.display());
                    return StationOutcome::WriteFailed(e.to_string());
                }
            }
        }

        match broken {
            Some(reason) => StationOutcome::Malformed { reason, records },
            None => StationOutcome::Succeeded { records, skipped },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_outcome() {
        let mut summary = RunSummary::default();
        summary.record(&StationOutcome::Succeeded {
            records: 3,
            skipped: 1,
        });
        summary.record(&StationOutcome::Faulted(Fault::default()));
        summary.record(&StationOutcome::TransportFailed("timeout".into()));
        summary.record(&StationOutcome::Malformed {
            reason: "bad".into(),
            records: 0,
        });

        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.faulted, 1);
        assert_eq!(summary.transport_failed, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.skipped_records, 1);
        assert_eq!(summary.failed(), 3);
    }
}
