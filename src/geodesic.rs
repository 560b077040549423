//! Pure great-circle and hiking-time functions over pairs of waypoints.

use serde::{Deserialize, Serialize};

use crate::error::ItineraryError;
use crate::route_types::Waypoint;

type Result<T> = std::result::Result<T, ItineraryError>;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Flat average walking speed in km/h.
pub const DEFAULT_WALKING_SPEED_KMH: f64 = 5.0;

/// Multiplier applied to Tobler's walking time.
const TOBLER_TIME_FACTOR: f64 = 1.4;

/// Floor for Tobler's speed, which underflows to zero on cliff-like slopes.
pub const MIN_TOBLER_SPEED_KMH: f64 = 0.1;

/// How traversal time is derived from a leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SpeedModel {
    /// Constant speed regardless of slope.
    #[serde(rename_all = "camelCase")]
    Flat {
        #[serde(default = "default_speed_kmh")]
        speed_kmh: f64,
    },
    /// Tobler's hiking function: `6 * exp(-3.5 * |slope + 0.05|)` km/h, with
    /// the resulting time scaled by 1.4.
    Tobler,
}

impl Default for SpeedModel {
    fn default() -> Self {
        Self::Flat {
            speed_kmh: DEFAULT_WALKING_SPEED_KMH,
        }
    }
}

fn default_speed_kmh() -> f64 {
    DEFAULT_WALKING_SPEED_KMH
}

/// Haversine distance between two coordinates in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two waypoints in kilometers.
pub fn distance_km(a: &Waypoint, b: &Waypoint) -> f64 {
    haversine_km(a.latitude(), a.longitude(), b.latitude(), b.longitude())
}

/// Ground distance in meters between a raw coordinate and a waypoint.
/// Elevation is ignored.
pub fn ground_distance_m(latitude: f64, longitude: f64, waypoint: &Waypoint) -> f64 {
    haversine_km(latitude, longitude, waypoint.latitude(), waypoint.longitude()) * 1000.0
}

/// Signed elevation change from `a` to `b` in meters.
pub fn elevation_delta(a: &Waypoint, b: &Waypoint) -> f64 {
    b.elevation() - a.elevation()
}

/// Initial true bearing from `a` towards `b`, degrees in `[0, 360)`.
pub fn initial_bearing(a: &Waypoint, b: &Waypoint) -> f64 {
    let phi1 = a.latitude().to_radians();
    let phi2 = b.latitude().to_radians();
    let dlon = (b.longitude() - a.longitude()).to_radians();

    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Traversal time from `a` to `b` in seconds. Zero iff the leg has zero length.
///
/// A flat speed that is not strictly positive and finite is rejected, as is a
/// leg whose time does not fit in an `f64`.
pub fn travel_time(a: &Waypoint, b: &Waypoint, model: &SpeedModel) -> Result<f64> {
    if let SpeedModel::Flat { speed_kmh } = *model {
        if !(speed_kmh.is_finite() && speed_kmh > 0.0) {
            return Err(ItineraryError::InvalidSpeed { speed_kmh });
        }
    }

    let distance = distance_km(a, b);
    if distance == 0.0 {
        return Ok(0.0);
    }

    let seconds = match *model {
        SpeedModel::Flat { speed_kmh } => distance / speed_kmh * 3600.0,
        SpeedModel::Tobler => {
            let slope = elevation_delta(a, b) / (distance * 1000.0);
            let speed_kmh = tobler_speed_kmh(slope).max(MIN_TOBLER_SPEED_KMH);
            distance / speed_kmh * TOBLER_TIME_FACTOR * 3600.0
        }
    };
    if !seconds.is_finite() {
        return Err(ItineraryError::TimeOverflow { seconds });
    }
    Ok(seconds)
}

/// Tobler's hiking function for a slope given as rise over run.
pub fn tobler_speed_kmh(slope: f64) -> f64 {
    6.0 * (-3.5 * (slope + 0.05).abs()).exp()
}
