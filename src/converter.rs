use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::ItineraryError;
use crate::geodesic::SpeedModel;
use crate::route_types::{Route, Waypoint, WaypointStatus};
use crate::schedule::{Schedule, total_ascent, total_distance};

/// Convert a route and its latest status snapshot to a GeoJSON
/// FeatureCollection: one Point per waypoint, then the route line.
pub fn to_feature_collection(
    route: &Route,
    statuses: &[WaypointStatus],
    model: SpeedModel,
    include_elevation: bool,
) -> Result<FeatureCollection, ItineraryError> {
    let mut features: Vec<Feature> = route
        .waypoints()
        .iter()
        .enumerate()
        .map(|(index, wpt)| {
            let status = statuses.get(index).copied().unwrap_or_default();
            waypoint_to_feature(wpt, index, status, include_elevation)
        })
        .collect();

    if route.len() >= 2 {
        features.push(route_to_feature(route, model, include_elevation)?);
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn waypoint_to_feature(
    wpt: &Waypoint,
    index: usize,
    status: WaypointStatus,
    include_elevation: bool,
) -> Feature {
    let geometry = Geometry::new(Value::Point(point_coords(wpt, include_elevation)));

    let mut props = Map::new();
    props.insert("kind".to_string(), JsonValue::String("waypoint".to_string()));
    props.insert("index".to_string(), JsonValue::Number(index.into()));
    props.insert("name".to_string(), JsonValue::String(wpt.name().to_string()));
    insert_f64(&mut props, "ele", wpt.elevation());
    props.insert(
        "status".to_string(),
        serde_json::to_value(status).unwrap_or(JsonValue::Null),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::Number(wpt.id().get().into())),
        properties: Some(props),
        foreign_members: None,
    }
}

fn route_to_feature(
    route: &Route,
    model: SpeedModel,
    include_elevation: bool,
) -> Result<Feature, ItineraryError> {
    let coords: Vec<Vec<f64>> = route
        .waypoints()
        .iter()
        .map(|wpt| point_coords(wpt, include_elevation))
        .collect();

    let geometry = Geometry::new(Value::LineString(coords));

    let mut props = Map::new();
    props.insert("kind".to_string(), JsonValue::String("route".to_string()));
    props.insert("name".to_string(), JsonValue::String(route.name().to_string()));
    insert_f64(&mut props, "totalDistanceKm", total_distance(route));
    insert_f64(&mut props, "totalAscentM", total_ascent(route));
    insert_f64(
        &mut props,
        "totalTimeS",
        Schedule::new(route, model).total_time()?,
    );

    Ok(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    })
}

/// GeoJSON position order is `[lon, lat]` or `[lon, lat, ele]`.
fn point_coords(wpt: &Waypoint, include_elevation: bool) -> Vec<f64> {
    if include_elevation {
        vec![wpt.longitude(), wpt.latitude(), wpt.elevation()]
    } else {
        vec![wpt.longitude(), wpt.latitude()]
    }
}

fn insert_f64(props: &mut Map<String, JsonValue>, key: &str, value: f64) {
    if let Some(n) = serde_json::Number::from_f64(value) {
        props.insert(key.to_string(), JsonValue::Number(n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(n: usize) -> Route {
        let waypoints = (0..n)
            .map(|i| Waypoint::new(format!("P{i}"), 45.0, 6.0 + i as f64 * 0.01, 1000.0 + i as f64))
            .collect();
        Route::new("Traverse", waypoints)
    }

    #[test]
    fn test_waypoints_then_route_line() {
        let fc = to_feature_collection(&route(3), &[], SpeedModel::default(), true).unwrap();
        assert_eq!(fc.features.len(), 4);

        let kinds: Vec<&str> = fc
            .features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["waypoint", "waypoint", "waypoint", "route"]);

        let line = fc.features[3].geometry.as_ref().unwrap();
        if let Value::LineString(coords) = &line.value {
            assert_eq!(coords.len(), 3);
            assert_eq!(coords[1], vec![6.0 + 1.0 * 0.01, 45.0, 1001.0]);
        } else {
            panic!("Expected LineString");
        }
    }

    #[test]
    fn test_single_waypoint_has_no_line() {
        let fc = to_feature_collection(&route(1), &[], SpeedModel::default(), true).unwrap();
        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        assert!(matches!(&geom.value, Value::Point(_)));
    }

    #[test]
    fn test_empty_route() {
        let fc = to_feature_collection(&route(0), &[], SpeedModel::default(), true).unwrap();
        assert!(fc.features.is_empty());
    }

    #[test]
    fn test_status_and_coordinates() {
        let statuses = [WaypointStatus::Passed, WaypointStatus::Approaching];
        let fc = to_feature_collection(&route(2), &statuses, SpeedModel::default(), false).unwrap();

        let props = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(props["status"], "approaching");
        assert_eq!(props["name"], "P1");
        assert_eq!(props["index"], 1);

        let geom = fc.features[0].geometry.as_ref().unwrap();
        if let Value::Point(coords) = &geom.value {
            assert_eq!(coords, &vec![6.0, 45.0]);
        } else {
            panic!("Expected Point");
        }
    }

    #[test]
    fn test_missing_statuses_default_to_not_reached() {
        let fc = to_feature_collection(&route(2), &[], SpeedModel::default(), true).unwrap();
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["status"], "notReached");
    }

    #[test]
    fn test_invalid_speed_fails_route_line() {
        let model = SpeedModel::Flat { speed_kmh: 0.0 };
        assert!(to_feature_collection(&route(2), &[], model, true).is_err());
        // a lone waypoint has no line to time
        assert!(to_feature_collection(&route(1), &[], model, true).is_ok());
    }
}
