//! Classification and walking of SOAP response envelopes.
//!
//! A successful response has this shape below the SOAP `Body`:
//!
//! ```text
//! getWLVerifiedMonthlyAndMetadataResponse      level 1, wrapper
//!   stationId, stationName, ..., timeZone      level 2, metadata
//!   data                                       level 2
//!     item                                     level 3, one observation
//!       timeStamp, MSL, MLLW, highest, ...     level 4, field/value pairs
//! ```
//!
//! Metadata is read eagerly. Observations are read lazily from the same
//! reader, so they can only be walked once.

use std::fmt;
use std::iter::Peekable;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::datum::Reading;
use crate::error::{Result, TideError};
use crate::observation::{Metadata, MetadataField, Observation, TIME_STAMP_TAG};

const BODY_TAG: &str = "Body";
const FAULT_TAG: &str = "Fault";
const DATA_TAG: &str = "data";

/// A classified response.
#[derive(Debug)]
pub enum ResponseEnvelope<'a> {
    Fault(Fault),
    Success(Success<'a>),
}

/// A SOAP fault reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fault {
    pub code: String,
    pub message: String,
    pub actor: Option<String>,
}

impl Fault {
    pub fn into_error(self) -> TideError {
        TideError::RemoteFault {
            code: self.code,
            message: self.message,
            actor: self.actor,
        }
    }
}

#[derive(Debug)]
pub struct Success<'a> {
    pub metadata: Metadata,
    pub observations: Observations<'a>,
}

/// Events produced while walking the payload below the wrapper element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    MetadataField { tag: String, value: String },
    ObservationStart,
    FieldValue { tag: String, value: String },
    ObservationEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Wrapper,
    Data,
    Container,
    Done,
}

/// Depth-tracking walker over the children of the wrapper element.
///
/// A field inside a container that cannot be read yields
/// `Err(MalformedRecord)` and the walk continues. A syntax error or
/// truncated document yields one `Err(MalformedResponse)` and ends the walk.
pub struct Walker<'a> {
    reader: Reader<&'a [u8]>,
    level: Level,
    pending: Option<WalkEvent>,
}

impl<'a> Walker<'a> {
    fn new(reader: Reader<&'a [u8]>) -> Self {
        Self {
            reader,
            level: Level::Wrapper,
            pending: None,
        }
    }

    fn finished() -> Self {
        Self {
            reader: Reader::from_str(""),
            level: Level::Done,
            pending: None,
        }
    }

    fn fail(&mut self, reason: impl Into<String>) -> Option<Result<WalkEvent>> {
        self.abort(TideError::MalformedResponse(reason.into()))
    }

    fn abort(&mut self, err: TideError) -> Option<Result<WalkEvent>> {
        self.level = Level::Done;
        Some(Err(err))
    }
}

impl Iterator for Walker<'_> {
    type Item = Result<WalkEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.take() {
            return Some(Ok(event));
        }

        loop {
            if self.level == Level::Done {
                return None;
            }

            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    let pos = self.reader.buffer_position();
                    return self.fail(format!("XML error at byte {pos}: {e}"));
                }
            };

            match (self.level, event) {
                (_, Event::Eof) => return self.fail("document ended before the payload was closed"),

                (Level::Wrapper, Event::Start(e)) => {
                    let tag = local_name(&e);
                    if tag == DATA_TAG {
                        self.level = Level::Data;
                        continue;
                    }
                    match read_leaf(&mut self.reader) {
                        Ok(Leaf::Text(value)) => return Some(Ok(WalkEvent::MetadataField { tag, value })),
                        Ok(Leaf::Nested) => debug!("skipping nested element <{tag}> in payload"),
                        Ok(Leaf::Undecodable(reason)) => debug!("skipping <{tag}>: {reason}"),
                        Err(e) => return self.abort(e),
                    }
                }
                (Level::Wrapper, Event::Empty(e)) => {
                    let tag = local_name(&e);
                    if tag != DATA_TAG {
                        return Some(Ok(WalkEvent::MetadataField {
                            tag,
                            value: String::new(),
                        }));
                    }
                }
                (Level::Wrapper, Event::End(_)) => {
                    self.level = Level::Done;
                    return None;
                }

                (Level::Data, Event::Start(_)) => {
                    self.level = Level::Container;
                    return Some(Ok(WalkEvent::ObservationStart));
                }
                (Level::Data, Event::Empty(_)) => {
                    self.pending = Some(WalkEvent::ObservationEnd);
                    return Some(Ok(WalkEvent::ObservationStart));
                }
                (Level::Data, Event::End(_)) => self.level = Level::Wrapper,

                (Level::Container, Event::Start(e)) => {
                    let tag = local_name(&e);
                    match read_leaf(&mut self.reader) {
                        Ok(Leaf::Text(value)) => return Some(Ok(WalkEvent::FieldValue { tag, value })),
                        Ok(Leaf::Nested) => {
                            return Some(Err(TideError::MalformedRecord(format!(
                                "field <{tag}> contains nested elements"
                            ))));
                        }
                        Ok(Leaf::Undecodable(reason)) => {
                            return Some(Err(TideError::MalformedRecord(format!(
                                "field <{tag}>: {reason}"
                            ))));
                        }
                        Err(e) => return self.abort(e),
                    }
                }
                (Level::Container, Event::Empty(e)) => {
                    return Some(Ok(WalkEvent::FieldValue {
                        tag: local_name(&e),
                        value: String::new(),
                    }));
                }
                (Level::Container, Event::End(_)) => {
                    self.level = Level::Data;
                    return Some(Ok(WalkEvent::ObservationEnd));
                }

                _ => {}
            }
        }
    }
}

/// Lazy, single-pass sequence of observations from a successful response.
pub struct Observations<'a> {
    events: Peekable<Walker<'a>>,
}

impl fmt::Debug for Observations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observations").finish_non_exhaustive()
    }
}

impl Observations<'_> {
    fn read_one(&mut self) -> Result<Observation> {
        let mut observation = Observation::new();
        let mut problem: Option<String> = None;

        loop {
            match self.events.next() {
                None => {
                    return Err(TideError::MalformedResponse(
                        "document ended inside an observation".into(),
                    ));
                }
                Some(Ok(WalkEvent::FieldValue { tag, value })) => {
                    if tag == TIME_STAMP_TAG {
                        observation.set_timestamp(value);
                    } else if let Some(reading) = Reading::from_tag(&tag) {
                        observation.set_reading(reading, value);
                    } else {
                        debug!("ignoring unrecognized observation field <{tag}>");
                    }
                }
                Some(Ok(WalkEvent::ObservationEnd)) => break,
                Some(Ok(_)) => {}
                Some(Err(TideError::MalformedRecord(reason))) => {
                    problem.get_or_insert(reason);
                }
                Some(Err(e)) => return Err(e),
            }
        }

        match problem {
            Some(reason) => Err(TideError::MalformedRecord(reason)),
            None => Ok(observation),
        }
    }
}

impl Iterator for Observations<'_> {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.events.next()? {
                Ok(WalkEvent::ObservationStart) => return Some(self.read_one()),
                Ok(WalkEvent::MetadataField { tag, .. }) => {
                    debug!("ignoring <{tag}> after the data section");
                }
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Classifies a raw SOAP response.
///
/// Returns `Err(MalformedResponse)` when the envelope has no readable body
/// or breaks before any observation is reached.
pub fn classify(raw: &str) -> Result<ResponseEnvelope<'_>> {
    let mut reader = Reader::from_str(raw);
    reader.trim_text(true);

    // Find the SOAP body.
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(&e) == BODY_TAG => break,
            Ok(Event::Empty(e)) if local_name(&e) == BODY_TAG => return Ok(empty_success()),
            Ok(Event::Eof) => {
                return Err(TideError::MalformedResponse("no SOAP Body element".into()));
            }
            Ok(_) => {}
            Err(e) => return Err(malformed(&reader, e)),
        }
    }

    // First child of the body: a fault, the wrapper, or nothing.
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(&e) == FAULT_TAG => {
                return read_fault(&mut reader).map(ResponseEnvelope::Fault);
            }
            Ok(Event::Empty(e)) if local_name(&e) == FAULT_TAG => {
                return Ok(ResponseEnvelope::Fault(Fault::default()));
            }
            Ok(Event::Start(_)) => break,
            Ok(Event::Empty(_)) | Ok(Event::End(_)) => return Ok(empty_success()),
            Ok(Event::Eof) => {
                return Err(TideError::MalformedResponse("SOAP Body is not closed".into()));
            }
            Ok(_) => {}
            Err(e) => return Err(malformed(&reader, e)),
        }
    }

    let mut events = Walker::new(reader).peekable();
    let mut metadata = Metadata::default();

    while let Some(event) = events.peek() {
        match event {
            Ok(WalkEvent::MetadataField { tag, value }) => {
                if let Some(field) = MetadataField::from_tag(tag) {
                    metadata.insert(field, value.clone());
                }
                events.next();
            }
            Err(TideError::MalformedResponse(_)) => {
                if let Some(Err(e)) = events.next() {
                    return Err(e);
                }
            }
            _ => break,
        }
    }

    Ok(ResponseEnvelope::Success(Success {
        metadata,
        observations: Observations { events },
    }))
}

fn empty_success<'a>() -> ResponseEnvelope<'a> {
    ResponseEnvelope::Success(Success {
        metadata: Metadata::default(),
        observations: Observations {
            events: Walker::finished().peekable(),
        },
    })
}

fn read_fault(reader: &mut Reader<&[u8]>) -> Result<Fault> {
    let mut fault = Fault::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = local_name(&e);
                let value = match read_leaf(reader)? {
                    Leaf::Text(value) => value,
                    Leaf::Nested | Leaf::Undecodable(_) => continue,
                };
                match tag.as_str() {
                    "faultcode" => fault.code = value,
                    "faultstring" => fault.message = value,
                    "faultactor" => fault.actor = Some(value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => return Ok(fault),
            Ok(Event::Eof) => {
                return Err(TideError::MalformedResponse("SOAP Fault is not closed".into()));
            }
            Ok(_) => {}
            Err(e) => return Err(malformed(reader, e)),
        }
    }
}

enum Leaf {
    Text(String),
    Nested,
    Undecodable(String),
}

/// Reads the content of an element whose start tag was just consumed,
/// leaving the reader after its end tag.
fn read_leaf(reader: &mut Reader<&[u8]>) -> Result<Leaf> {
    let mut text = String::new();
    let mut nested = false;
    let mut undecodable: Option<String> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) if depth == 0 => match t.unescape() {
                Ok(s) => text.push_str(&s),
                Err(e) => {
                    undecodable.get_or_insert(e.to_string());
                }
            },
            Ok(Event::CData(c)) if depth == 0 => match std::str::from_utf8(&c) {
                Ok(s) => text.push_str(s),
                Err(e) => {
                    undecodable.get_or_insert(e.to_string());
                }
            },
            Ok(Event::Start(_)) => {
                nested = true;
                depth += 1;
            }
            Ok(Event::Empty(_)) => nested = true,
            Ok(Event::End(_)) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Ok(Event::Eof) => {
                return Err(TideError::MalformedResponse(
                    "document ended inside an element".into(),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(malformed(reader, e)),
        }
    }

    Ok(if nested {
        Leaf::Nested
    } else if let Some(reason) = undecodable {
        Leaf::Undecodable(reason)
    } else {
        Leaf::Text(text)
    })
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn malformed(reader: &Reader<&[u8]>, e: quick_xml::Error) -> TideError {
    TideError::MalformedResponse(format!(
        "XML error at byte {}: {}",
        reader.buffer_position(),
        e
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Datum;

    fn envelope(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
             <soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"
        )
    }

    fn success(payload: &str) -> String {
        envelope(&format!(
            "<ns1:getWLVerifiedMonthlyAndMetadataResponse xmlns:ns1=\"urn:x\">{payload}\
             </ns1:getWLVerifiedMonthlyAndMetadataResponse>"
        ))
    }

    fn expect_success<'a>(env: ResponseEnvelope<'a>) -> Success<'a> {
        match env {
            ResponseEnvelope::Success(s) => s,
            ResponseEnvelope::Fault(f) => panic!("unexpected fault: {f:?}"),
        }
    }

    #[test]
    fn fault_is_classified() {
        let raw = envelope(
            "<soapenv:Fault><faultcode>soapenv:Server</faultcode>\
             <faultstring>Station ID is invalid</faultstring>\
             <faultactor>WaterLevelVerifiedMonthly</faultactor>\
             <detail><stack>trace</stack></detail></soapenv:Fault>",
        );
        match classify(&raw).unwrap() {
            ResponseEnvelope::Fault(f) => {
                assert_eq!(f.code, "soapenv:Server");
                assert_eq!(f.message, "Station ID is invalid");
                assert_eq!(f.actor.as_deref(), Some("WaterLevelVerifiedMonthly"));
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn fault_without_actor() {
        let raw = envelope("<Fault><faultcode>Client</faultcode><faultstring>bad</faultstring></Fault>");
        match classify(&raw).unwrap() {
            ResponseEnvelope::Fault(f) => assert_eq!(f.actor, None),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_is_empty_success() {
        let raw = envelope("");
        let s = expect_success(classify(&raw).unwrap());
        assert!(s.metadata.is_empty());
        assert_eq!(s.observations.count(), 0);

        let raw = success("");
        let s = expect_success(classify(&raw).unwrap());
        assert!(s.metadata.is_empty());
        assert_eq!(s.observations.count(), 0);
    }

    #[test]
    fn metadata_and_observations_are_separated() {
        let raw = success(
            "<stationId>8454000</stationId><stationName>Providence</stationName>\
             <futureField>x</futureField><timeZone>GMT</timeZone>\
             <data>\
               <item><timeStamp>2020/01/01 00:00</timeStamp><MSL>1.234</MSL><highest>2.5</highest></item>\
               <item><timeStamp>2020/02/01 00:00</timeStamp><MSL>1.300</MSL><bogus>1</bogus></item>\
             </data>",
        );
        let s = expect_success(classify(&raw).unwrap());
        assert_eq!(s.metadata.len(), 3);
        assert_eq!(s.metadata.get(MetadataField::StationName), Some("Providence"));
        assert_eq!(s.metadata.get(MetadataField::TimeZone), Some("GMT"));

        let obs: Vec<_> = s.observations.collect::<Result<_>>().unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].timestamp(), Some("2020/01/01 00:00"));
        assert_eq!(obs[0].value(Datum::Msl), Some("1.234"));
        assert_eq!(obs[0].reading(Reading::Highest), Some("2.5"));
        assert_eq!(obs[1].readings().count(), 1);
    }

    #[test]
    fn metadata_tags_are_case_sensitive() {
        let raw = success("<StationId>1</StationId><stationId>2</stationId><data/>");
        let s = expect_success(classify(&raw).unwrap());
        assert_eq!(s.metadata.len(), 1);
        assert_eq!(s.metadata.get(MetadataField::StationId), Some("2"));
    }

    #[test]
    fn missing_timestamp_is_kept_as_none() {
        let raw = success("<data><item><MLLW>0.5</MLLW></item></data>");
        let s = expect_success(classify(&raw).unwrap());
        let obs: Vec<_> = s.observations.collect::<Result<_>>().unwrap();
        assert_eq!(obs[0].timestamp(), None);
        assert_eq!(obs[0].value(Datum::Mllw), Some("0.5"));
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let raw = success(
            "<data>\
               <item><timeStamp>a</timeStamp><MSL><x>1</x></MSL></item>\
               <item><timeStamp>b</timeStamp><MSL>2</MSL></item>\
             </data>",
        );
        let s = expect_success(classify(&raw).unwrap());
        let results: Vec<_> = s.observations.collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(TideError::MalformedRecord(_))));
        assert_eq!(results[1].as_ref().unwrap().timestamp(), Some("b"));
    }

    #[test]
    fn truncated_payload_ends_stream_with_error() {
        let raw = "<Envelope><Body><resp><data><item><timeStamp>a</timeStamp><MSL>1</MSL></item><item><MSL>2";
        let s = expect_success(classify(raw).unwrap());
        let results: Vec<_> = s.observations.collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(TideError::MalformedResponse(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            classify("not xml at all"),
            Err(TideError::MalformedResponse(_))
        ));
        assert!(matches!(
            classify("<Envelope><Header/></Envelope>"),
            Err(TideError::MalformedResponse(_))
        ));
    }

    #[test]
    fn walker_emits_typed_events() {
        let raw = success("<unit>0</unit><data><item><MSL>1</MSL></item><item/></data>");
        let mut reader = Reader::from_str(&raw);
        reader.trim_text(true);
        loop {
            if let Ok(Event::Start(e)) = reader.read_event() {
                if local_name(&e) == "getWLVerifiedMonthlyAndMetadataResponse" {
                    break;
                }
            }
        }
        let events: Vec<_> = Walker::new(reader).collect::<Result<_>>().unwrap();
        assert_eq!(
            events,
            vec![
                WalkEvent::MetadataField {
                    tag: "unit".into(),
                    value: "0".into()
                },
                WalkEvent::ObservationStart,
                WalkEvent::FieldValue {
                    tag: "MSL".into(),
                    value: "1".into()
                },
                WalkEvent::ObservationEnd,
                WalkEvent::ObservationStart,
                WalkEvent::ObservationEnd,
            ]
        );
    }
}
