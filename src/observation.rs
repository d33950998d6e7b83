//! Typed contents of a successful response.

use std::collections::BTreeMap;

use crate::datum::{Datum, Reading};

/// Element name carrying the observation time.
pub const TIME_STAMP_TAG: &str = "timeStamp";

/// Metadata tags the service is known to send, in the order it sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    StationId,
    StationName,
    Latitude,
    Longitude,
    State,
    DataSource,
    BeginDate,
    EndDate,
    Datum,
    Unit,
    TimeZone,
}

impl MetadataField {
    pub const ALL: [MetadataField; 11] = [
        MetadataField::StationId,
        MetadataField::StationName,
        MetadataField::Latitude,
        MetadataField::Longitude,
        MetadataField::State,
        MetadataField::DataSource,
        MetadataField::BeginDate,
        MetadataField::EndDate,
        MetadataField::Datum,
        MetadataField::Unit,
        MetadataField::TimeZone,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            MetadataField::StationId => "stationId",
            MetadataField::StationName => "stationName",
            MetadataField::Latitude => "latitude",
            MetadataField::Longitude => "longitude",
            MetadataField::State => "state",
            MetadataField::DataSource => "dataSource",
            MetadataField::BeginDate => "beginDate",
            MetadataField::EndDate => "endDate",
            MetadataField::Datum => "datum",
            MetadataField::Unit => "unit",
            MetadataField::TimeZone => "timeZone",
        }
    }

    /// Case-sensitive. Unknown tags are not an error, just not metadata.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.tag() == tag)
    }
}

/// Recognized station metadata from a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    fields: BTreeMap<MetadataField, String>,
}

impl Metadata {
    pub fn insert(&mut self, field: MetadataField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Fields in the service's canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataField, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// One timestamped record from the `data` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    timestamp: Option<String>,
    readings: BTreeMap<Reading, String>,
}

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_reading(mut self, reading: Reading, value: impl Into<String>) -> Self {
        self.set_reading(reading, value);
        self
    }

    pub fn set_timestamp(&mut self, timestamp: impl Into<String>) {
        self.timestamp = Some(timestamp.into());
    }

    /// The first value seen for a tag wins; later duplicates are ignored.
    pub fn set_reading(&mut self, reading: Reading, value: impl Into<String>) {
        self.readings.entry(reading).or_insert_with(|| value.into());
    }

    /// `None` when the record had no `timeStamp` element.
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn reading(&self, reading: Reading) -> Option<&str> {
        self.readings.get(&reading).map(String::as_str)
    }

    pub fn value(&self, datum: Datum) -> Option<&str> {
        self.reading(Reading::Datum(datum))
    }

    pub fn readings(&self) -> impl Iterator<Item = (Reading, &str)> {
        self.readings.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_iterates_in_canonical_order() {
        let mut md = Metadata::default();
        md.insert(MetadataField::TimeZone, "GMT");
        md.insert(MetadataField::StationId, "8454000");
        md.insert(MetadataField::Datum, "MSL");
        let tags: Vec<_> = md.iter().map(|(f, _)| f.tag()).collect();
        assert_eq!(tags, ["stationId", "datum", "timeZone"]);
    }

    #[test]
    fn first_reading_wins() {
        let obs = Observation::new()
            .with_reading(Reading::Datum(Datum::Msl), "1.0")
            .with_reading(Reading::Datum(Datum::Msl), "2.0");
        assert_eq!(obs.value(Datum::Msl), Some("1.0"));
        assert_eq!(obs.value(Datum::Mllw), None);
        assert_eq!(obs.timestamp(), None);
    }
}
