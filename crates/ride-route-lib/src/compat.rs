//! Compatibility adapter for loosely-typed routing responses
//!
//! The path endpoint has returned coordinates under several field names over time, and
//! as either `[lat, lon]` or `[lon, lat]` pairs. Everything that guesses at that shape
//! lives here; the rest of the crate only ever sees [`LatLon`].

use crate::utils::{LatLon, is_latitude};
use crate::{Result, RouteError};
use serde_json::Value;

/// Field names searched, in order, for the coordinate list
pub const COORDINATE_FIELDS: [&str; 5] = [
    "coordinates",
    "coords",
    "path_coordinates",
    "route_coordinates",
    "geometry",
];

/// Extract the coordinate list of a single-segment response.
///
/// A body carrying `success: false` is a rejection. A missing, empty or partly
/// unreadable list is malformed.
pub fn segment_coordinates(body: &Value) -> Result<Vec<LatLon>> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("no path");
        return Err(RouteError::Rejected(message.to_string()));
    }

    let list = COORDINATE_FIELDS
        .iter()
        .find_map(|field| body.get(*field).filter(|v| v.is_array()))
        .ok_or_else(|| RouteError::Malformed("no coordinate list in response".to_string()))?;

    let coordinates = coordinate_list(list)?;
    if coordinates.is_empty() {
        return Err(RouteError::Malformed("empty coordinate list".to_string()));
    }
    Ok(coordinates)
}

/// Parse a JSON array of coordinates; fails on the first unreadable entry
pub fn coordinate_list(value: &Value) -> Result<Vec<LatLon>> {
    let entries = value
        .as_array()
        .ok_or_else(|| RouteError::Malformed("coordinates are not a list".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            coordinate(entry)
                .ok_or_else(|| RouteError::Malformed(format!("unreadable coordinate at {index}")))
        })
        .collect()
}

/// Parse one coordinate: a `{lat, lon|lng}` object or a two-number array.
///
/// Array axis order is decided per point: a first value within [-90, 90] is taken as the
/// latitude, anything else as the longitude and the pair is swapped. Pairs where both
/// values are valid latitudes cannot be told apart and are read as `[lat, lon]`.
pub fn coordinate(value: &Value) -> Option<LatLon> {
    let (lat, lon) = match value {
        Value::Array(pair) if pair.len() >= 2 => {
            let a = pair[0].as_f64()?;
            let b = pair[1].as_f64()?;
            if is_latitude(a) { (a, b) } else { (b, a) }
        }
        Value::Object(map) => {
            let lat = map.get("lat")?.as_f64()?;
            let lon = map.get("lon").or_else(|| map.get("lng"))?.as_f64()?;
            (lat, lon)
        }
        _ => return None,
    };

    (lat.is_finite() && lon.is_finite() && is_latitude(lat)).then_some(LatLon::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lat_lon_pairs() {
        let body = json!({ "path": [1, 2], "distance": 1.2, "coordinates": [[37.5, 127.0], [37.51, 127.01]] });
        let coords = segment_coordinates(&body).unwrap();
        assert_eq!(coords, vec![LatLon::new(37.5, 127.0), LatLon::new(37.51, 127.01)]);
    }

    #[test]
    fn test_lon_lat_pairs_are_swapped_per_point() {
        let body = json!({ "coords": [[127.0, 37.5], [37.51, 127.01]] });
        let coords = segment_coordinates(&body).unwrap();
        assert_eq!(coords[0], LatLon::new(37.5, 127.0));
        assert_eq!(coords[1], LatLon::new(37.51, 127.01));
    }

    #[test]
    fn test_alternate_field_and_object_entries() {
        let body = json!({ "route_coordinates": [{ "lat": 37.5, "lng": 127.0 }, { "lat": 37.6, "lon": 127.1 }] });
        assert_eq!(segment_coordinates(&body).unwrap().len(), 2);
    }

    #[test]
    fn test_field_priority() {
        let body = json!({ "coords": [[1.0, 2.0]], "coordinates": [[3.0, 4.0]] });
        assert_eq!(segment_coordinates(&body).unwrap(), vec![LatLon::new(3.0, 4.0)]);
    }

    #[test]
    fn test_missing_or_empty_is_malformed() {
        assert!(matches!(
            segment_coordinates(&json!({ "path": [1, 2] })),
            Err(RouteError::Malformed(_))
        ));
        assert!(matches!(
            segment_coordinates(&json!({ "coordinates": [] })),
            Err(RouteError::Malformed(_))
        ));
        assert!(matches!(
            segment_coordinates(&json!({ "coordinates": [[37.5, 127.0], ["x", 1]] })),
            Err(RouteError::Malformed(_))
        ));
    }

    #[test]
    fn test_explicit_failure_is_rejected() {
        let body = json!({ "success": false, "message": "no path found" });
        match segment_coordinates(&body) {
            Err(RouteError::Rejected(message)) => assert_eq!(message, "no path found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_pair() {
        assert!(coordinate(&json!([200.0, 300.0])).is_none());
        assert!(coordinate(&json!([37.5])).is_none());
        assert!(coordinate(&json!("37.5,127.0")).is_none());
    }
}
