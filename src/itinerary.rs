//! Per-leg itinerary rows as read by the presentation layer.

use serde::Serialize;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::ItineraryError;
use crate::geodesic::{distance_km, elevation_delta, initial_bearing};
use crate::options::PlanOptions;
use crate::route_types::{Route, WaypointStatus};
use crate::schedule::{Schedule, total_ascent, total_descent, total_distance};

type Result<T> = std::result::Result<T, ItineraryError>;

/// Whole-route summary plus one row per leg.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub route_name: String,
    pub waypoint_count: usize,
    pub total_distance_km: f64,
    pub total_ascent_m: f64,
    pub total_descent_m: f64,
    pub total_time_s: f64,
    pub total_time: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// When the fix behind the leg statuses was taken, if it was timestamped.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_fix_time: Option<OffsetDateTime>,
    pub legs: Vec<LegSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegSummary {
    pub index: usize,
    pub from_name: String,
    pub to_name: String,
    pub distance_km: f64,
    pub elevation_delta_m: f64,
    pub bearing_deg: f64,
    pub leg_time_s: f64,
    pub leg_time: String,
    #[serde(with = "time::serde::rfc3339")]
    pub eta: OffsetDateTime,
    pub eta_time_of_day: String,
    pub remaining_time_s: f64,
    pub remaining_time: String,
    pub status: WaypointStatus,
}

impl Itinerary {
    /// Build the itinerary for `route`.
    ///
    /// Leg `k` runs from waypoint `k` to `k + 1`; its ETA and remaining time
    /// are measured at waypoint `k + 1` and it carries the status of
    /// waypoint `k`. An empty `statuses` slice means no fix yet.
    pub fn build(route: &Route, statuses: &[WaypointStatus], opts: &PlanOptions) -> Result<Self> {
        let schedule = Schedule::new(route, opts.speed_model);
        let start = opts.start_time()?;
        let offset = opts.utc_offset()?;

        let mut legs = Vec::with_capacity(route.leg_count());
        for (index, (leg, leg_time)) in route.legs().zip(schedule.leg_times()).enumerate() {
            let leg_time = leg_time?;
            let eta = schedule.estimated_arrival(start, index + 1)?;
            let remaining = schedule.remaining_time(index + 1)?;
            legs.push(LegSummary {
                index,
                from_name: leg.from.name().to_string(),
                to_name: leg.to.name().to_string(),
                distance_km: distance_km(leg.from, leg.to),
                elevation_delta_m: elevation_delta(leg.from, leg.to),
                bearing_deg: initial_bearing(leg.from, leg.to),
                leg_time_s: leg_time,
                leg_time: format_duration(leg_time),
                eta,
                eta_time_of_day: format_time_of_day(eta, offset)?,
                remaining_time_s: remaining,
                remaining_time: format_duration(remaining),
                status: statuses.get(index).copied().unwrap_or_default(),
            });
        }

        let total_time = schedule.total_time()?;
        Ok(Self {
            route_name: route.name().to_string(),
            waypoint_count: route.len(),
            total_distance_km: total_distance(route),
            total_ascent_m: total_ascent(route),
            total_descent_m: total_descent(route),
            total_time_s: total_time,
            total_time: format_duration(total_time),
            start_time: start,
            last_fix_time: None,
            legs,
        })
    }
}

/// `HH:MM` for a duration in seconds. Hours do not wrap at 24; partial
/// minutes are truncated.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds as i64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    format!("{hours:02}:{minutes:02}")
}

/// Wall-clock `HH:MM` of `instant` in the given UTC offset.
pub fn format_time_of_day(instant: OffsetDateTime, offset: UtcOffset) -> Result<String> {
    let local = instant.to_offset(offset);
    Ok(local.format(format_description!("[hour]:[minute]"))?)
}
