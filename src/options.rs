use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::error::ItineraryError;
use crate::geodesic::SpeedModel;
use crate::tracker::DEFAULT_PROXIMITY_RADIUS_M;

/// Trip start used when none is configured: 2024-07-31T15:00:00Z.
pub const DEFAULT_START_TIME_UNIX: i64 = 1_722_438_000;

/// Options for planning an itinerary and tracking progress along it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOptions {
    /// How leg times are estimated (default: flat 5 km/h)
    #[serde(default)]
    pub speed_model: SpeedModel,

    /// Distance in meters within which a fix counts as at a waypoint (default: 20)
    #[serde(default = "default_radius")]
    pub proximity_radius_m: f64,

    /// Trip start as Unix seconds (default: 2024-07-31T15:00:00Z)
    #[serde(default = "default_start_time")]
    pub start_time_unix: i64,

    /// Offset from UTC used when showing times of day (default: 0)
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Include elevation as the 3rd GeoJSON coordinate value (default: true)
    #[serde(default = "default_true")]
    pub include_elevation: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            speed_model: SpeedModel::default(),
            proximity_radius_m: DEFAULT_PROXIMITY_RADIUS_M,
            start_time_unix: DEFAULT_START_TIME_UNIX,
            utc_offset_minutes: 0,
            include_elevation: true,
        }
    }
}

impl PlanOptions {
    /// Reject values that would make every downstream number meaningless.
    pub fn validate(&self) -> Result<(), ItineraryError> {
        if !self.proximity_radius_m.is_finite() || self.proximity_radius_m < 0.0 {
            return Err(ItineraryError::InvalidOption {
                name: "proximityRadiusM",
                value: self.proximity_radius_m.to_string(),
            });
        }
        if let SpeedModel::Flat { speed_kmh } = self.speed_model {
            if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
                return Err(ItineraryError::InvalidOption {
                    name: "speedKmh",
                    value: speed_kmh.to_string(),
                });
            }
        }
        self.start_time()?;
        self.utc_offset()?;
        Ok(())
    }

    pub fn start_time(&self) -> Result<OffsetDateTime, ItineraryError> {
        OffsetDateTime::from_unix_timestamp(self.start_time_unix).map_err(|_| {
            ItineraryError::InvalidOption {
                name: "startTimeUnix",
                value: self.start_time_unix.to_string(),
            }
        })
    }

    pub fn utc_offset(&self) -> Result<UtcOffset, ItineraryError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(|secs| UtcOffset::from_whole_seconds(secs).ok())
            .ok_or_else(|| ItineraryError::InvalidOption {
                name: "utcOffsetMinutes",
                value: self.utc_offset_minutes.to_string(),
            })
    }
}

fn default_radius() -> f64 {
    DEFAULT_PROXIMITY_RADIUS_M
}

fn default_start_time() -> i64 {
    DEFAULT_START_TIME_UNIX
}

fn default_true() -> bool {
    true
}
