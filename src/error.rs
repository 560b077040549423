use wasm_bindgen::JsValue;

#[derive(Debug)]
pub enum ItineraryError {
    XmlParse(quick_xml::Error),
    UnclosedElement {
        name: String,
    },
    EmptyDocument,
    ContentOutsideRoot,
    UnknownEntity {
        name: String,
    },
    Io(std::io::Error),
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    InvalidOption {
        name: &'static str,
        value: String,
    },
    InvalidSpeed {
        speed_kmh: f64,
    },
    TimeOverflow {
        seconds: f64,
    },
    TimeFormat(time::error::Format),
}

impl ItineraryError {
    /// True for the failures that mean the GPX document itself was rejected.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::XmlParse(_)
                | Self::UnclosedElement { .. }
                | Self::EmptyDocument
                | Self::ContentOutsideRoot
                | Self::UnknownEntity { .. }
        )
    }
}

impl std::fmt::Display for ItineraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XmlParse(e) => write!(f, "XML parse error: {e}"),
            Self::UnclosedElement { name } => {
                write!(f, "Document ended before <{name}> was closed")
            }
            Self::EmptyDocument => write!(f, "Document has no root element"),
            Self::ContentOutsideRoot => {
                write!(f, "Markup or text found outside the root element")
            }
            Self::UnknownEntity { name } => write!(f, "Undeclared entity '&{name};'"),
            Self::Io(e) => write!(f, "Could not read GPX file: {e}"),
            Self::IndexOutOfRange { index, len } => write!(
                f,
                "Waypoint index {index} out of range for route with {len} waypoints"
            ),
            Self::InvalidOption { name, value } => {
                write!(f, "Invalid value '{value}' for option '{name}'")
            }
            Self::InvalidSpeed { speed_kmh } => {
                write!(f, "Walking speed must be positive and finite, got {speed_kmh} km/h")
            }
            Self::TimeOverflow { seconds } => {
                write!(f, "Walking time of {seconds} s is outside the representable range")
            }
            Self::TimeFormat(e) => write!(f, "Time format error: {e}"),
        }
    }
}

impl std::error::Error for ItineraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::XmlParse(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::TimeFormat(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for ItineraryError {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParse(e)
    }
}

impl From<std::io::Error> for ItineraryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<time::error::Format> for ItineraryError {
    fn from(e: time::error::Format) -> Self {
        Self::TimeFormat(e)
    }
}

impl From<ItineraryError> for JsValue {
    fn from(e: ItineraryError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
