//! Rendering of observations into output records.

use crate::datum::Datum;
use crate::error::{Result, TideError};
use crate::observation::Observation;

/// Written in place of a timestamp the record did not carry, so that row
/// counts stay aligned with the number of records the service returned.
pub const MISSING_TIMESTAMP: &str = "missing_timestamp";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    /// XML output. Declared, not implemented.
    Structured,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "dat",
            OutputFormat::Structured => "xml",
        }
    }
}

/// Renders one observation for the requested datum.
pub fn render(observation: &Observation, datum: Datum, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Csv => Ok(render_csv(observation, datum)),
        OutputFormat::Structured => Err(TideError::UnsupportedFormat {
            kind: "output",
            format: "XML",
        }),
    }
}

/// `<timestamp>, <value>\n`, or `<timestamp>,\n` when the datum is absent.
pub fn render_csv(observation: &Observation, datum: Datum) -> String {
    let timestamp = observation.timestamp().unwrap_or(MISSING_TIMESTAMP);
    match observation.value(datum) {
        Some(value) => format!("{timestamp}, {value}\n"),
        None => format!("{timestamp},\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Reading;

    #[test]
    fn csv_line() {
        let obs = Observation::new()
            .with_timestamp("2020/01/01 00:00")
            .with_reading(Reading::Datum(Datum::Msl), "1.234")
            .with_reading(Reading::Datum(Datum::Mllw), "0.100");
        assert_eq!(
            render(&obs, Datum::Msl, OutputFormat::Csv).unwrap(),
            "2020/01/01 00:00, 1.234\n"
        );
        assert_eq!(render_csv(&obs, Datum::Mllw), "2020/01/01 00:00, 0.100\n");
    }

    #[test]
    fn missing_timestamp_is_substituted() {
        let obs = Observation::new().with_reading(Reading::Datum(Datum::Msl), "1.5");
        assert_eq!(render_csv(&obs, Datum::Msl), "missing_timestamp, 1.5\n");
    }

    #[test]
    fn missing_value_leaves_empty_field() {
        let obs = Observation::new().with_timestamp("2020/01/01 00:00");
        assert_eq!(render_csv(&obs, Datum::Mhw), "2020/01/01 00:00,\n");
        assert_eq!(render_csv(&Observation::new(), Datum::Mhw), "missing_timestamp,\n");
    }

    #[test]
    fn structured_is_unsupported() {
        let err = render(&Observation::new(), Datum::Msl, OutputFormat::Structured).unwrap_err();
        assert!(matches!(err, TideError::UnsupportedFormat { kind: "output", .. }));
    }

    #[test]
    fn extensions() {
        assert_eq!(OutputFormat::Csv.extension(), "dat");
        assert_eq!(OutputFormat::Structured.extension(), "xml");
    }
}
