use std::path::Path;

use log::{debug, info};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::error::ItineraryError;
use crate::route_types::{Route, UNNAMED_ROUTE, Waypoint, WaypointBuilder};

type Result<T> = std::result::Result<T, ItineraryError>;

/// Read a GPX file fully into memory and parse it.
pub fn parse_gpx_file(path: impl AsRef<Path>) -> Result<Route> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    info!("read {} bytes of GPX from {}", bytes.len(), path.display());
    parse_gpx(&bytes)
}

/// Parse GPX bytes into a [`Route`] in a single streaming pass.
///
/// Every `<wpt>` and `<rtept>` becomes a waypoint, in document order. A
/// `<name>` outside any waypoint names the route. Missing or unparsable
/// `lat`/`lon`/`ele` values become 0. Text is decoded with the encoding the
/// XML declaration names. Any XML syntax error, undecodable text, undeclared
/// entity or content outside the single root element rejects the whole
/// document.
pub fn parse_gpx(bytes: &[u8]) -> Result<Route> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut state = ParseState::default();
    let mut open_elements: Vec<String> = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if saw_root && open_elements.is_empty() {
                    return Err(ItineraryError::ContentOutsideRoot);
                }
                state.flush_text();
                saw_root = true;
                open_elements.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                state.start_element(&e)?;
            }
            Ok(Event::Empty(e)) => {
                if saw_root && open_elements.is_empty() {
                    return Err(ItineraryError::ContentOutsideRoot);
                }
                state.flush_text();
                saw_root = true;
                state.start_element(&e)?;
                state.end_element(e.local_name().as_ref());
            }
            Ok(Event::End(e)) => {
                state.flush_text();
                open_elements.pop();
                state.end_element(e.local_name().as_ref());
            }
            Ok(Event::Text(e)) => {
                let text = e.decode().map_err(|e| ItineraryError::XmlParse(e.into()))?;
                if open_elements.is_empty() {
                    if !text.trim().is_empty() {
                        return Err(ItineraryError::ContentOutsideRoot);
                    }
                } else {
                    state.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if open_elements.is_empty() {
                    return Err(ItineraryError::ContentOutsideRoot);
                }
                let text = e.decode().map_err(|e| ItineraryError::XmlParse(e.into()))?;
                state.text.push_str(&text);
            }
            Ok(Event::GeneralRef(e)) => {
                if open_elements.is_empty() {
                    return Err(ItineraryError::ContentOutsideRoot);
                }
                push_reference(&mut state.text, &e)?;
            }
            Ok(Event::Eof) => {
                state.flush_text();
                if let Some(name) = open_elements.pop() {
                    return Err(ItineraryError::UnclosedElement { name });
                }
                if !saw_root {
                    return Err(ItineraryError::EmptyDocument);
                }
                break;
            }
            Err(e) => {
                debug!("GPX rejected at byte {}: {e}", reader.buffer_position());
                return Err(ItineraryError::XmlParse(e));
            }
            _ => {}
        }
        buf.clear();
    }

    let route = state.finish();
    debug!(
        "parsed route '{}' with {} waypoints",
        route.name(),
        route.len()
    );
    Ok(route)
}

/// Element whose text content is being collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum TextTarget {
    Name,
    Elevation,
    #[default]
    Ignored,
}

#[derive(Debug, Default)]
struct ParseState {
    /// Set by the most recently opened element, never reset on close.
    target: TextTarget,
    open_waypoint: Option<WaypointBuilder>,
    waypoints: Vec<Waypoint>,
    route_name: Option<String>,
    text: String,
}

impl ParseState {
    fn start_element(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let local = e.local_name();
        self.target = match local.as_ref() {
            b"name" => TextTarget::Name,
            b"ele" => TextTarget::Elevation,
            _ => TextTarget::Ignored,
        };
        if is_waypoint_element(local.as_ref()) {
            let (lat, lon) = lenient_lat_lon(e)?;
            self.open_waypoint = Some(WaypointBuilder::new(lat, lon));
        }
        Ok(())
    }

    fn end_element(&mut self, local_name: &[u8]) {
        if is_waypoint_element(local_name) {
            if let Some(builder) = self.open_waypoint.take() {
                self.waypoints.push(builder.build());
            }
        }
    }

    /// Route collected character data to the field named by the last opened
    /// element. Whitespace-only text is dropped.
    fn flush_text(&mut self) {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            match (self.target, self.open_waypoint.as_mut()) {
                (TextTarget::Name, Some(builder)) => {
                    builder.name(trimmed);
                }
                (TextTarget::Name, None) => self.route_name = Some(trimmed.to_string()),
                (TextTarget::Elevation, Some(builder)) => {
                    builder.elevation(lenient_f64(trimmed));
                }
                _ => {}
            }
        }
        self.text.clear();
    }

    fn finish(self) -> Route {
        let name = self.route_name.unwrap_or_else(|| UNNAMED_ROUTE.to_string());
        Route::new(name, self.waypoints)
    }
}

/// Append the character an entity or character reference stands for. GPX
/// has no DTD, so only the five predefined entities are known.
fn push_reference(text: &mut String, e: &BytesRef<'_>) -> Result<()> {
    if let Some(ch) = e.resolve_char_ref()? {
        text.push(ch);
        return Ok(());
    }
    let name = e.decode().map_err(|e| ItineraryError::XmlParse(e.into()))?;
    match resolve_predefined_entity(&name) {
        Some(value) => {
            text.push_str(value);
            Ok(())
        }
        None => Err(ItineraryError::UnknownEntity {
            name: name.into_owned(),
        }),
    }
}

fn is_waypoint_element(local_name: &[u8]) -> bool {
    matches!(local_name, b"wpt" | b"rtept")
}

/// Read `lat`/`lon` from a waypoint start tag. Absent or malformed values
/// become 0; only a structurally broken attribute list is an error.
fn lenient_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat = 0.0;
    let mut lon = 0.0;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| ItineraryError::XmlParse(e.into()))?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match attr.key.local_name().as_ref() {
            b"lat" => lat = lenient_f64(val),
            b"lon" => lon = lenient_f64(val),
            _ => {}
        }
    }

    Ok((lat, lon))
}

fn lenient_f64(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<Route> {
        parse_gpx(xml.as_bytes())
    }

    #[test]
    fn test_three_route_points() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <rte>
    <name>Ridge Walk</name>
    <rtept lat="0" lon="0"><ele>0</ele><name>A</name></rtept>
    <rtept lat="0" lon="0.001"><ele>10</ele><name>B</name></rtept>
    <rtept lat="0" lon="0.002"><ele>5</ele><name>C</name></rtept>
  </rte>
</gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.name(), "Ridge Walk");
        let names: Vec<&str> = route.waypoints().iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        let eles: Vec<f64> = route.waypoints().iter().map(|w| w.elevation()).collect();
        assert_eq!(eles, vec![0.0, 10.0, 5.0]);
        assert_eq!(route.waypoints()[2].longitude(), 0.002);
    }

    #[test]
    fn test_wpt_elements() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.6762" lon="139.6503"><name>Tokyo Tower</name><ele>40.5</ele></wpt>
  <wpt lat="35.7101" lon="139.8107"><name>Skytree</name></wpt>
</gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.len(), 2);
        let first = &route.waypoints()[0];
        assert_eq!(first.name(), "Tokyo Tower");
        assert_eq!(first.latitude(), 35.6762);
        assert_eq!(first.longitude(), 139.6503);
        assert_eq!(first.elevation(), 40.5);
        assert_eq!(route.waypoints()[1].elevation(), 0.0);
    }

    #[test]
    fn test_self_closing_waypoint() {
        let xml = r#"<gpx><wpt lat="1.5" lon="2.5"/><wpt lat="3" lon="4"/></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route.waypoints()[0].latitude(), 1.5);
        assert_eq!(route.waypoints()[0].name(), "");
    }

    #[test]
    fn test_lenient_bad_latitude() {
        let xml = r#"<gpx><wpt lat="bad" lon="7.25"><name>X</name></wpt></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].latitude(), 0.0);
        assert_eq!(route.waypoints()[0].longitude(), 7.25);
    }

    #[test]
    fn test_lenient_missing_coordinates() {
        let xml = r#"<gpx><wpt><name>Nowhere</name></wpt></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route.waypoints()[0].latitude(), 0.0);
        assert_eq!(route.waypoints()[0].longitude(), 0.0);
        assert_eq!(route.waypoints()[0].name(), "Nowhere");
    }

    #[test]
    fn test_lenient_bad_elevation() {
        let xml = r#"<gpx><wpt lat="1" lon="1"><ele>high</ele></wpt></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].elevation(), 0.0);
    }

    #[test]
    fn test_non_finite_coordinate_defaults_to_zero() {
        let xml = r#"<gpx><wpt lat="NaN" lon="inf"/></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].latitude(), 0.0);
        assert_eq!(route.waypoints()[0].longitude(), 0.0);
    }

    #[test]
    fn test_default_route_name() {
        let xml = r#"<gpx><wpt lat="1" lon="1"><name>Only</name></wpt></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.name(), UNNAMED_ROUTE);
    }

    #[test]
    fn test_metadata_name_is_route_name() {
        let xml = r#"<gpx><metadata><name>Day Out</name></metadata>
<wpt lat="1" lon="1"><name>Start</name></wpt></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.name(), "Day Out");
        assert_eq!(route.waypoints()[0].name(), "Start");
    }

    #[test]
    fn test_empty_gpx() {
        let route = parse(r#"<?xml version="1.0"?><gpx version="1.1"></gpx>"#).unwrap();
        assert!(route.is_empty());
        assert_eq!(route.name(), UNNAMED_ROUTE);
    }

    #[test]
    fn test_whitespace_text_ignored() {
        let xml = "<gpx><wpt lat=\"1\" lon=\"1\"><name>Hut</name>\n    \n</wpt></gpx>";
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].name(), "Hut");
    }

    #[test]
    fn test_name_text_trimmed() {
        let xml = "<gpx><wpt lat=\"1\" lon=\"1\"><name>\n  Col du Lac  \n</name></wpt></gpx>";
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].name(), "Col du Lac");
    }

    #[test]
    fn test_other_children_ignored() {
        let xml = r#"<gpx><wpt lat="1" lon="1">
  <desc>Not a name</desc>
  <time>2025-01-01T00:00:00Z</time>
  <extensions><gpxx:Depth xmlns:gpxx="urn:x">12</gpxx:Depth></extensions>
  <name>Lake</name>
</wpt></gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].name(), "Lake");
        assert_eq!(route.waypoints()[0].elevation(), 0.0);
    }

    #[test]
    fn test_namespaced_elements() {
        let xml = r#"<gpx:gpx xmlns:gpx="http://www.topografix.com/GPX/1/1">
  <gpx:wpt lat="2" lon="3"><gpx:name>NS</gpx:name><gpx:ele>12</gpx:ele></gpx:wpt>
</gpx:gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].name(), "NS");
        assert_eq!(route.waypoints()[0].elevation(), 12.0);
    }

    #[test]
    fn test_cdata_and_entities() {
        let xml = r#"<gpx>
  <wpt lat="1" lon="1"><name><![CDATA[Café & Bar]]></name></wpt>
  <wpt lat="1" lon="1"><name>Fish &amp; Chips &#60;3</name></wpt>
</gpx>"#;
        let route = parse(xml).unwrap();
        assert_eq!(route.waypoints()[0].name(), "Café & Bar");
        assert_eq!(route.waypoints()[1].name(), "Fish & Chips <3");
    }

    #[test]
    fn test_declared_encoding_is_honoured() {
        let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<gpx><wpt lat=\"1\" lon=\"1\"><name>Caf\xe9</name></wpt></gpx>";
        let route = parse_gpx(xml).unwrap();
        assert_eq!(route.waypoints()[0].name(), "Caf\u{e9}");
    }

    #[test]
    fn test_invalid_utf8_text_fails() {
        let xml = b"<gpx><wpt lat=\"1\" lon=\"1\"><name>Caf\xe9</name></wpt></gpx>";
        let err = parse_gpx(xml).unwrap_err();
        assert!(err.is_parse_failure(), "got {err:?}");
    }

    #[test]
    fn test_undeclared_entity_fails() {
        let err = parse(r#"<gpx><wpt lat="1" lon="1"><name>A&nbsp;B</name></wpt></gpx>"#)
            .unwrap_err();
        assert!(err.is_parse_failure());
        assert!(matches!(err, ItineraryError::UnknownEntity { name } if name == "nbsp"));
    }

    #[test]
    fn test_all_predefined_entities() {
        let xml = r#"<gpx><rte><name>&lt;&gt;&amp;&quot;&apos;&#x41;</name></rte></gpx>"#;
        assert_eq!(parse(xml).unwrap().name(), "<>&\"'A");
    }

    #[test]
    fn test_content_after_root_fails() {
        let xml = r#"<gpx></gpx><wpt lat="1" lon="2"><name>Extra</name></wpt>"#;
        let err = parse(xml).unwrap_err();
        assert!(matches!(err, ItineraryError::ContentOutsideRoot));
        assert!(err.is_parse_failure());

        assert!(parse("<gpx/><gpx/>").is_err());
        assert!(parse("<gpx></gpx>trailing").is_err());
        assert!(parse("stray<gpx></gpx>").is_err());
    }

    #[test]
    fn test_whitespace_and_comments_around_root_allowed() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- exported -->\n<gpx><wpt lat=\"1\" lon=\"1\"/></gpx>\n<!-- end -->\n";
        assert_eq!(parse(xml).unwrap().len(), 1);
    }

    #[test]
    fn test_unterminated_element_fails() {
        let err = parse(r#"<gpx><wpt lat="1" lon="1"><name>A</name>"#).unwrap_err();
        assert!(err.is_parse_failure(), "got {err:?}");
    }

    #[test]
    fn test_unterminated_tag_fails() {
        let err = parse(r#"<gpx><wpt lat="1" lon="1""#).unwrap_err();
        assert!(err.is_parse_failure(), "got {err:?}");
    }

    #[test]
    fn test_mismatched_end_tag_fails() {
        let err = parse(r#"<gpx><wpt lat="1" lon="1"></rtept></gpx>"#).unwrap_err();
        assert!(matches!(err, ItineraryError::XmlParse(_)));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(parse(""), Err(ItineraryError::EmptyDocument)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = parse_gpx_file("/nonexistent/dir/route.gpx").unwrap_err();
        assert!(matches!(err, ItineraryError::Io(_)));
        assert!(!err.is_parse_failure());
    }
}
