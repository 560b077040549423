//! Route totals and the cumulative/remaining time schedule.
//!
//! Nothing here is cached: every total is a fresh fold over the route's legs
//! in traversal order, so totals always equal the leg-by-leg sums.

use time::{Duration, OffsetDateTime};

use crate::error::ItineraryError;
use crate::geodesic::{SpeedModel, distance_km, elevation_delta, travel_time};
use crate::route_types::Route;

type Result<T> = std::result::Result<T, ItineraryError>;

/// Sum of leg distances in kilometers.
pub fn total_distance(route: &Route) -> f64 {
    route
        .legs()
        .fold(0.0, |total, leg| total + distance_km(leg.from, leg.to))
}

/// Sum of positive elevation changes in meters. Descents contribute nothing.
pub fn total_ascent(route: &Route) -> f64 {
    route.legs().fold(0.0, |total, leg| {
        total + elevation_delta(leg.from, leg.to).max(0.0)
    })
}

/// Sum of negative elevation changes in meters, reported as a positive number.
pub fn total_descent(route: &Route) -> f64 {
    route.legs().fold(0.0, |total, leg| {
        total + (-elevation_delta(leg.from, leg.to)).max(0.0)
    })
}

/// Time schedule of a route under one speed model.
#[derive(Debug, Clone, Copy)]
pub struct Schedule<'a> {
    route: &'a Route,
    model: SpeedModel,
}

impl<'a> Schedule<'a> {
    pub fn new(route: &'a Route, model: SpeedModel) -> Self {
        Self { route, model }
    }

    /// Travel time in seconds of each leg, in order.
    pub fn leg_times(&self) -> impl Iterator<Item = Result<f64>> + '_ {
        self.route
            .legs()
            .map(move |leg| travel_time(leg.from, leg.to, &self.model))
    }

    /// Seconds to walk the whole route.
    pub fn total_time(&self) -> Result<f64> {
        self.leg_times().try_fold(0.0, |total, t| Ok(total + t?))
    }

    /// Seconds from the first waypoint to waypoint `index`.
    ///
    /// `index` may range over `0..=len`; `len` yields the total time. Anything
    /// larger is a caller bug and is reported rather than clamped.
    pub fn cumulative_time(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        self.leg_times()
            .take(index)
            .try_fold(0.0, |total, t| Ok(total + t?))
    }

    /// Seconds left from waypoint `index` to the end of the route.
    pub fn remaining_time(&self, index: usize) -> Result<f64> {
        Ok(self.total_time()? - self.cumulative_time(index)?)
    }

    /// Instant of arrival at waypoint `index` when leaving the first waypoint
    /// at `start`. Fails when the arrival falls outside the supported date
    /// range.
    pub fn estimated_arrival(&self, start: OffsetDateTime, index: usize) -> Result<OffsetDateTime> {
        let seconds = self.cumulative_time(index)?;
        Duration::checked_seconds_f64(seconds)
            .and_then(|elapsed| start.checked_add(elapsed))
            .ok_or(ItineraryError::TimeOverflow { seconds })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.route.len();
        if index > len {
            return Err(ItineraryError::IndexOutOfRange { index, len });
        }
        Ok(())
    }
}
