use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the tide station pipeline.
///
/// Only [`TideError::Config`], [`TideError::FileNotFound`] and
/// [`TideError::UnsupportedFormat`] raised while loading the station list
/// stop a batch. Everything else is scoped to one station or one record.
#[derive(Error, Debug)]
pub enum TideError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("unsupported {kind} format: {format}")]
    UnsupportedFormat {
        kind: &'static str,
        format: &'static str,
    },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("{}", format_fault(code, message, actor.as_deref()))]
    RemoteFault {
        code: String,
        message: String,
        actor: Option<String>,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl From<reqwest::Error> for TideError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TideError::Transport(format!("request timed out: {err}"))
        } else {
            TideError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, TideError>;

/// Renders a SOAP fault for logs.
///
/// The service reports unknown stations and bad datums as plain server
/// faults, so a hint is appended when the message looks like one of those.
pub(crate) fn format_fault(code: &str, message: &str, actor: Option<&str>) -> String {
    let mut out = format!("service fault {code}: {message}");
    if let Some(actor) = actor.filter(|a| !a.is_empty()) {
        out.push_str(&format!(" (actor: {actor})"));
    }

    let lower = message.to_lowercase();
    if lower.contains("station") && (lower.contains("not found") || lower.contains("invalid")) {
        out.push_str(
            "\nhint: check the station id against https://tidesandcurrents.noaa.gov/stations.html",
        );
    } else if lower.contains("datum") {
        out.push_str(
            "\nhint: see https://tidesandcurrents.noaa.gov/datum_options.html for valid datums",
        );
    }
    out
}
