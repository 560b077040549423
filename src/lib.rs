pub mod converter;
pub mod error;
pub mod geodesic;
pub mod itinerary;
pub mod options;
pub mod parser;
pub mod planner;
pub mod route_types;
pub mod schedule;
pub mod tracker;

use time::OffsetDateTime;
use wasm_bindgen::prelude::*;

use crate::options::PlanOptions;
use crate::route_types::Fix;

/// Parse GPX bytes and return the itinerary as a JS object.
#[wasm_bindgen(js_name = planItinerary)]
pub fn plan_itinerary(gpx: &[u8], options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    opts.validate()?;
    let route = parser::parse_gpx(gpx)?;
    let itinerary = itinerary::Itinerary::build(&route, &[], &opts)?;
    serde_wasm_bindgen::to_value(&itinerary).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse GPX bytes and return the route as a GeoJSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(gpx: &[u8], options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    opts.validate()?;
    let route = parser::parse_gpx(gpx)?;
    let fc = converter::to_feature_collection(
        &route,
        &[],
        opts.speed_model,
        opts.include_elevation,
    )?;
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Session handle for the presentation layer: load a route, feed it position
/// fixes, read back the itinerary.
#[wasm_bindgen(js_name = RoutePlanner)]
pub struct JsRoutePlanner {
    inner: planner::RoutePlanner,
}

#[wasm_bindgen(js_class = RoutePlanner)]
impl JsRoutePlanner {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<JsRoutePlanner, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        Ok(Self {
            inner: planner::RoutePlanner::new(opts)?,
        })
    }

    /// Load GPX bytes. On failure the previous route stays loaded.
    #[wasm_bindgen(js_name = loadGpx)]
    pub fn load_gpx(&mut self, gpx: &[u8]) -> Result<(), JsValue> {
        self.inner.load_bytes(gpx)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = routeName)]
    pub fn route_name(&self) -> Option<String> {
        self.inner.route().map(|r| r.name().to_string())
    }

    /// Feed a position fix; returns the status list, one entry per waypoint.
    #[wasm_bindgen(js_name = updatePosition)]
    pub fn update_position(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp_ms: Option<f64>,
    ) -> Result<JsValue, JsValue> {
        let mut fix = Fix::new(latitude, longitude);
        let ms = timestamp_ms.unwrap_or_else(js_sys::Date::now);
        if let Ok(at) = OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000) {
            fix = fix.at(at);
        }
        let statuses = self.inner.update_position(fix);
        serde_wasm_bindgen::to_value(statuses).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Itinerary of the loaded route, or `undefined` when none is loaded.
    pub fn itinerary(&self) -> Result<JsValue, JsValue> {
        match self.inner.itinerary()? {
            Some(itinerary) => serde_wasm_bindgen::to_value(&itinerary)
                .map_err(|e| JsValue::from_str(&e.to_string())),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    #[wasm_bindgen(js_name = toGeoJsonString)]
    pub fn to_geojson_string(&self) -> Result<Option<String>, JsValue> {
        self.inner
            .to_geojson()?
            .map(|fc| serde_json::to_string(&fc))
            .transpose()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn parse_options(options: JsValue) -> Result<PlanOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(PlanOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
