//! Human-readable console rendering of metadata and observations.

use crate::datum::{Datum, Reading};
use crate::observation::{Metadata, MetadataField, Observation};

pub fn metadata_label(field: MetadataField) -> &'static str {
    match field {
        MetadataField::StationId => "Station ID       : ",
        MetadataField::StationName => "Station Name     : ",
        MetadataField::Latitude => "Latitude         : ",
        MetadataField::Longitude => "Longitude        : ",
        MetadataField::State => "State            : ",
        MetadataField::DataSource => "Data Source      : ",
        MetadataField::BeginDate => "Begin Date       : ",
        MetadataField::EndDate => "End Date         : ",
        MetadataField::Datum => "Datum            : ",
        MetadataField::Unit => "Unit             : ",
        MetadataField::TimeZone => "Time Zone        : ",
    }
}

pub fn reading_label(reading: Reading) -> &'static str {
    match reading {
        Reading::Datum(Datum::Mhhw) => "MHHW      : ",
        Reading::Datum(Datum::Mhw) => "MHW       : ",
        Reading::Datum(Datum::Dtl) => "DTL       : ",
        Reading::Datum(Datum::Mtl) => "MTL       : ",
        Reading::Datum(Datum::Msl) => "MSL       : ",
        Reading::Datum(Datum::Mlw) => "MLW       : ",
        Reading::Datum(Datum::Mllw) => "MLLW      : ",
        Reading::Datum(Datum::Gt) => "GT        : ",
        Reading::Datum(Datum::Mn) => "MN        : ",
        Reading::Datum(Datum::Dhq) => "DHQ       : ",
        Reading::Datum(Datum::Dlq) => "DLQ       : ",
        Reading::Datum(Datum::Hwi) => "HWI       : ",
        Reading::Datum(Datum::Lwi) => "LWI       : ",
        Reading::Highest => "Highest Tide  : ",
        Reading::Lowest => "Lowest Tide   : ",
        Reading::Inferred => "Inferred Tide : ",
    }
}

/// Labelled lines for a raw metadata tag; unrecognized tags give nothing.
pub fn metadata_tag_line(tag: &str, value: &str) -> Option<String> {
    MetadataField::from_tag(tag).map(|f| format!("{}{}", metadata_label(f), value))
}

pub fn metadata_lines(metadata: &Metadata) -> Vec<String> {
    metadata
        .iter()
        .map(|(field, value)| format!("{}{}", metadata_label(field), value))
        .collect()
}

pub fn observation_lines(observation: &Observation) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(ts) = observation.timestamp() {
        lines.push(format!("Time Stamp: {ts}"));
    }
    lines.extend(
        observation
            .readings()
            .map(|(reading, value)| format!("{}{}", reading_label(reading), value)),
    );
    lines
}

pub fn print_metadata(station: &str, metadata: &Metadata) {
    println!("Metadata for station {station}");
    for line in metadata_lines(metadata) {
        println!("{line}");
    }
    println!();
}

pub fn print_observation(observation: &Observation) {
    for line in observation_lines(observation) {
        println!("{line}");
    }
}
