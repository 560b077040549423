use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use time::OffsetDateTime;

/// Name given to a route whose GPX carries no top-level `<name>`.
pub const UNNAMED_ROUTE: &str = "Unnamed Route";

static NEXT_WAYPOINT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local waypoint identity. Unique within a process run, carries no
/// meaning across parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WaypointId(u64);

impl WaypointId {
    fn next() -> Self {
        Self(NEXT_WAYPOINT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A single named point of a route (`<wpt>` or `<rtept>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    id: WaypointId,
    name: String,
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            id: WaypointId::next(),
            name: name.into(),
            latitude,
            longitude,
            elevation,
        }
    }

    pub fn id(&self) -> WaypointId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Meters; 0 when the source had no usable `<ele>`.
    pub fn elevation(&self) -> f64 {
        self.elevation
    }
}

/// Mutable accumulator for a waypoint whose element is still open in the
/// parser. Finalized into an immutable [`Waypoint`] with [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct WaypointBuilder {
    name: String,
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

impl WaypointBuilder {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn elevation(&mut self, elevation: f64) -> &mut Self {
        self.elevation = elevation;
        self
    }

    pub fn build(self) -> Waypoint {
        Waypoint::new(self.name, self.latitude, self.longitude, self.elevation)
    }
}

/// A named, ordered sequence of waypoints. Order is traversal order and is
/// fixed once the route is constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    name: String,
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(name: impl Into<String>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            name: name.into(),
            waypoints,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Consecutive waypoint pairs; `max(len - 1, 0)` of them.
    pub fn legs(&self) -> impl ExactSizeIterator<Item = Leg<'_>> + '_ {
        self.waypoints.windows(2).map(|w| Leg {
            from: &w[0],
            to: &w[1],
        })
    }

    pub fn leg_count(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }
}

/// Traversal segment between two adjacent waypoints.
#[derive(Debug, Clone, Copy)]
pub struct Leg<'a> {
    pub from: &'a Waypoint,
    pub to: &'a Waypoint,
}

/// Progress classification of one waypoint against the latest fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WaypointStatus {
    #[default]
    NotReached,
    Approaching,
    Reached,
    Passed,
}

/// A position sample from the location provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: Option<OffsetDateTime>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
