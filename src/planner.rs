use std::path::Path;
use std::sync::Arc;

use geojson::FeatureCollection;
use log::{info, warn};

use crate::converter::to_feature_collection;
use crate::error::ItineraryError;
use crate::itinerary::Itinerary;
use crate::options::PlanOptions;
use crate::parser::{parse_gpx, parse_gpx_file};
use crate::route_types::{Fix, Route, WaypointStatus};
use crate::tracker::ProximityTracker;

type Result<T> = std::result::Result<T, ItineraryError>;

/// One planning session: the currently loaded route and the latest progress
/// snapshot against it.
///
/// A failed load leaves the previously loaded route in place. The loaded
/// route is never mutated and can be handed out to other readers.
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    options: PlanOptions,
    route: Option<Arc<Route>>,
    tracker: ProximityTracker,
}

impl RoutePlanner {
    pub fn new(options: PlanOptions) -> Result<Self> {
        options.validate()?;
        let tracker = ProximityTracker::new(options.proximity_radius_m);
        Ok(Self {
            options,
            route: None,
            tracker,
        })
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn statuses(&self) -> &[WaypointStatus] {
        self.tracker.statuses()
    }

    /// Parse `bytes` and make the result the current route.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<Arc<Route>> {
        let parsed = parse_gpx(bytes);
        self.accept(parsed)
    }

    /// Read and parse a GPX file and make the result the current route.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Arc<Route>> {
        let parsed = parse_gpx_file(path);
        self.accept(parsed)
    }

    fn accept(&mut self, parsed: Result<Route>) -> Result<Arc<Route>> {
        match parsed {
            Ok(route) => {
                info!(
                    "loaded route '{}' with {} waypoints",
                    route.name(),
                    route.len()
                );
                let route = Arc::new(route);
                self.route = Some(Arc::clone(&route));
                self.tracker.reset();
                Ok(route)
            }
            Err(e) => {
                warn!("route load rejected, keeping current route: {e}");
                Err(e)
            }
        }
    }

    /// Classify the loaded route against a new fix. Without a route the fix
    /// is dropped and the snapshot stays empty.
    pub fn update_position(&mut self, fix: Fix) -> &[WaypointStatus] {
        match &self.route {
            Some(route) => self.tracker.update(route, fix),
            None => {
                warn!("position fix received with no route loaded");
                self.tracker.statuses()
            }
        }
    }

    /// Itinerary for the loaded route with the latest statuses, if a route
    /// is loaded.
    pub fn itinerary(&self) -> Result<Option<Itinerary>> {
        let Some(route) = self.route.as_deref() else {
            return Ok(None);
        };
        let mut itinerary = Itinerary::build(route, self.tracker.statuses(), &self.options)?;
        itinerary.last_fix_time = self.tracker.last_fix().and_then(|fix| fix.timestamp);
        Ok(Some(itinerary))
    }

    pub fn to_geojson(&self) -> Result<Option<FeatureCollection>> {
        self.route
            .as_deref()
            .map(|route| {
                to_feature_collection(
                    route,
                    self.tracker.statuses(),
                    self.options.speed_model,
                    self.options.include_elevation,
                )
            })
            .transpose()
    }
}
