//! GeoJSON export: a `FeatureCollection` with one `LineString` per track, or one
//! `Point` per observation carrying its timestamp and AF values.
use camino::Utf8Path;
use serde_json::{json, Map, Value};

use crate::collection::TrackCollection;
use crate::track::{FeatureValue, Track};
use crate::track_errors::TrackError;

use super::geodetic_copy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    LineString,
    Point,
}

fn number(v: f64) -> Value {
    // NaN and infinities have no JSON representation
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

fn position(track: &Track, i: usize) -> Result<Value, TrackError> {
    let p = track.get_obs(i)?.position;
    Ok(json!([number(p.x()), number(p.y()), number(p.z())]))
}

fn track_features(track: &Track, kind: GeometryKind) -> Result<Vec<Value>, TrackError> {
    let geo = geodetic_copy(track)?;
    match kind {
        GeometryKind::LineString => {
            let coords = (0..geo.size()).map(|i| position(&geo, i)).collect::<Result<Vec<_>, _>>()?;
            Ok(vec![json!({
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": coords },
                "properties": { "uid": geo.uid, "tid": geo.tid, "size": geo.size() },
            })])
        }
        GeometryKind::Point => (0..geo.size())
            .map(|i| {
                let obs = geo.get_obs(i)?;
                let mut props = Map::new();
                props.insert("uid".into(), json!(geo.uid));
                props.insert("idx".into(), json!(i));
                props.insert("timestamp".into(), json!(obs.timestamp.format_with("4Y-2M-2DT2h:2m:2s1Z")));
                for (name, value) in geo.feature_names().iter().zip(&obs.features) {
                    let v = match value {
                        FeatureValue::Num(v) => number(*v),
                        FeatureValue::Text(s) => json!(s),
                    };
                    props.insert(name.clone(), v);
                }
                Ok(json!({
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": position(&geo, i)? },
                    "properties": props,
                }))
            })
            .collect(),
    }
}

/// GeoJSON document of a collection.
pub fn to_geojson(collection: &TrackCollection, kind: GeometryKind) -> Result<Value, TrackError> {
    let mut features = Vec::new();
    for track in collection {
        features.extend(track_features(track, kind)?);
    }
    Ok(json!({ "type": "FeatureCollection", "features": features }))
}

pub fn write_geojson(collection: &TrackCollection, path: &Utf8Path, kind: GeometryKind) -> Result<(), TrackError> {
    let doc = to_geojson(collection, kind)?;
    let text = serde_json::to_string_pretty(&doc).map_err(|e| TrackError::ParseError(e.to_string()))?;
    std::fs::write(path, text)?;
    Ok(())
}
