use serde_json::{Value, json};

/// Roughly 1 km x 1 km square at the equator, as a GeoJSON Feature.
pub fn square_feature() -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [0.0, 0.0],
                [0.0, 0.009],
                [0.009, 0.009],
                [0.009, 0.0],
                [0.0, 0.0]
            ]]
        },
        "properties": {}
    })
}

pub fn square_payload() -> String {
    square_feature().to_string()
}

/// A Polygon whose only ring is empty.
pub fn empty_polygon_payload() -> String {
    json!({
        "type": "Feature",
        "geometry": { "type": "Polygon", "coordinates": [[]] },
        "properties": {}
    })
    .to_string()
}
