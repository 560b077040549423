//! Proximity classification of waypoints against the latest position fix.
//!
//! Classification is a pure function of one fix. It has no memory of earlier
//! fixes and no notion of travel direction, so walking away from a waypoint
//! and back again can move its status backwards.

use log::debug;

use crate::geodesic::ground_distance_m;
use crate::route_types::{Fix, Route, Waypoint, WaypointStatus};

/// Default proximity radius in meters.
pub const DEFAULT_PROXIMITY_RADIUS_M: f64 = 20.0;

fn within_radius(fix: &Fix, waypoint: &Waypoint, radius_m: f64) -> bool {
    ground_distance_m(fix.latitude, fix.longitude, waypoint) <= radius_m
}

/// Classify every waypoint against `fix`; one status per waypoint, same order.
///
/// * within `radius_m` of the waypoint: `Approaching`
/// * else within `radius_m` of the previous waypoint: `Reached`
/// * else, for any waypoint after the first: `Passed`
/// * else: `NotReached`
pub fn classify(fix: &Fix, waypoints: &[Waypoint], radius_m: f64) -> Vec<WaypointStatus> {
    waypoints
        .iter()
        .enumerate()
        .map(|(index, waypoint)| {
            if within_radius(fix, waypoint, radius_m) {
                return WaypointStatus::Approaching;
            }
            let Some(previous) = index.checked_sub(1).map(|i| &waypoints[i]) else {
                return WaypointStatus::NotReached;
            };
            if within_radius(fix, previous, radius_m) {
                WaypointStatus::Reached
            } else {
                WaypointStatus::Passed
            }
        })
        .collect()
}

/// Holds the status snapshot for the most recent fix.
///
/// The snapshot is empty until the first fix arrives; after that it always
/// has one entry per waypoint of the route it was computed against.
#[derive(Debug, Clone)]
pub struct ProximityTracker {
    radius_m: f64,
    last_fix: Option<Fix>,
    statuses: Vec<WaypointStatus>,
}

impl ProximityTracker {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            last_fix: None,
            statuses: Vec::new(),
        }
    }

    pub fn last_fix(&self) -> Option<&Fix> {
        self.last_fix.as_ref()
    }

    pub fn statuses(&self) -> &[WaypointStatus] {
        &self.statuses
    }

    /// Status of waypoint `index`, `NotReached` when no fix has been seen.
    pub fn status(&self, index: usize) -> WaypointStatus {
        self.statuses.get(index).copied().unwrap_or_default()
    }

    /// Replace the snapshot with a classification of `fix` against `route`.
    pub fn update(&mut self, route: &Route, fix: Fix) -> &[WaypointStatus] {
        self.statuses = classify(&fix, route.waypoints(), self.radius_m);
        self.last_fix = Some(fix);
        debug!(
            "fix ({:.6}, {:.6}) at {:?} classified against {} waypoints",
            fix.latitude,
            fix.longitude,
            fix.timestamp,
            self.statuses.len()
        );
        &self.statuses
    }

    /// Forget the snapshot, e.g. when a different route is loaded.
    pub fn reset(&mut self) {
        self.last_fix = None;
        self.statuses.clear();
    }
}

impl Default for ProximityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_RADIUS_M)
    }
}
