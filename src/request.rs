//! Outbound SOAP request construction.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::datum::Datum;
use crate::error::{Result, TideError};

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const WATER_NS: &str =
    "http://opendap.co-ops.nos.noaa.gov/axis/webservices/waterlevelverifiedmonthly/wsdl";
/// Value of the `SOAPAction` header expected by the service.
pub const SOAP_ACTION: &str = WATER_NS;
pub const OPERATION: &str = "getWLVerifiedMonthlyAndMetadata";

// Both constants are "0": metric units, GMT. Any timezone conversion is done locally.
const UNIT_METRIC: &str = "0";
const TIME_ZONE_GMT: &str = "0";

/// One station query. Built once per station from the batch-wide range and datum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    station: String,
    start: String,
    end: String,
    datum: Datum,
}

impl Request {
    /// No validation happens here; the configuration layer already checked
    /// the timestamps and the datum.
    pub fn new(
        station: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        datum: Datum,
    ) -> Self {
        Self {
            station: station.into(),
            start: start.into(),
            end: end.into(),
            datum,
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn datum(&self) -> Datum {
        self.datum
    }

    /// Body fields in wire order. The service binds parameters positionally.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("stationId", self.station.as_str()),
            ("beginDate", self.start.as_str()),
            ("endDate", self.end.as_str()),
            ("datum", self.datum.code()),
            ("unit", UNIT_METRIC),
            ("timeZone", TIME_ZONE_GMT),
        ]
    }

    /// Serializes the request as a SOAP 1.1 envelope.
    pub fn to_envelope(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(
            BytesStart::new("soapenv:Envelope")
                .with_attributes([("xmlns:soapenv", SOAP_ENV_NS), ("xmlns:water", WATER_NS)]),
        ))?;
        writer.write_event(Event::Empty(BytesStart::new("soapenv:Header")))?;
        writer.write_event(Event::Start(BytesStart::new("soapenv:Body")))?;

        let operation = format!("water:{OPERATION}");
        writer.write_event(Event::Start(BytesStart::new(operation.as_str())))?;
        for (name, value) in self.fields() {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(operation.as_str())))?;

        writer.write_event(Event::End(BytesEnd::new("soapenv:Body")))?;
        writer.write_event(Event::End(BytesEnd::new("soapenv:Envelope")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| TideError::Xml(quick_xml::Error::NonDecodable(Some(e.utf8_error()))))
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "station {} datum {} from {} to {}",
            self.station, self.datum, self.start, self.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Request {
        Request::new("8454000", "20200101 00:00", "20201231 23:59", Datum::Mllw)
    }

    #[test]
    fn fields_are_in_wire_order() {
        let names: Vec<_> = sample().fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            ["stationId", "beginDate", "endDate", "datum", "unit", "timeZone"]
        );
    }

    #[test]
    fn envelope_contains_ordered_body() {
        let xml = sample().to_envelope().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:water=\"http://opendap.co-ops.nos.noaa.gov/"));
        assert!(xml.contains(
            "<water:getWLVerifiedMonthlyAndMetadata>\
             <stationId>8454000</stationId>\
             <beginDate>20200101 00:00</beginDate>\
             <endDate>20201231 23:59</endDate>\
             <datum>MLLW</datum>\
             <unit>0</unit>\
             <timeZone>0</timeZone>\
             </water:getWLVerifiedMonthlyAndMetadata>"
        ));
    }

    #[test]
    fn station_text_is_escaped() {
        let req = Request::new("1<2", "a", "b", Datum::Msl);
        let xml = req.to_envelope().unwrap();
        assert!(xml.contains("<stationId>1&lt;2</stationId>"));
    }

    #[test]
    fn non_ascii_station_text_encodes() {
        let req = Request::new("São Juan", "a", "b", Datum::Msl);
        let xml = req.to_envelope().unwrap();
        assert!(xml.contains("<stationId>São Juan</stationId>"));
    }
}
