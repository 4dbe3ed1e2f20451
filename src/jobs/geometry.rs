// src/jobs/geometry.rs

//! Minimal GeoJSON polygon handling for the geometry jobs.

use serde_json::Value;

use crate::errors::JobError;

/// Mean earth radius used for the ring area, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

pub const INVALID_POLYGON: &str = "Invalid GeoJSON: Expected a Polygon geometry";

/// `[longitude, latitude]` in degrees.
pub type Position = [f64; 2];

/// A validated polygon: the outer ring first, then holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    rings: Vec<Vec<Position>>,
}

impl Polygon {
    /// Parse a GeoJSON `Feature` whose geometry is a `Polygon`, or a bare
    /// `Polygon` geometry.
    ///
    /// The outer ring must hold at least 4 positions (a closed triangle).
    pub fn parse(geo_json: &str) -> Result<Self, JobError> {
        let doc: Value = serde_json::from_str(geo_json)
            .map_err(|e| JobError::InvalidGeometry(format!("{INVALID_POLYGON} ({e})")))?;

        let geometry = if doc.get("type").and_then(Value::as_str) == Some("Feature") {
            doc.get("geometry").ok_or_else(invalid)?
        } else {
            &doc
        };
        if geometry.get("type").and_then(Value::as_str) != Some("Polygon") {
            return Err(invalid());
        }

        let rings = geometry
            .get("coordinates")
            .and_then(Value::as_array)
            .ok_or_else(invalid)?
            .iter()
            .map(parse_ring)
            .collect::<Result<Vec<_>, _>>()?;

        match rings.first() {
            Some(outer) if outer.len() >= 4 => Ok(Self { rings }),
            _ => Err(invalid()),
        }
    }

    pub fn outer(&self) -> &[Position] {
        &self.rings[0]
    }

    pub fn holes(&self) -> &[Vec<Position>] {
        &self.rings[1..]
    }

    /// Outer ring without its closing position, when the ring is closed.
    pub fn vertices(&self) -> &[Position] {
        let outer = self.outer();
        match (outer.first(), outer.last()) {
            (Some(first), Some(last)) if first == last => &outer[..outer.len() - 1],
            _ => outer,
        }
    }

    /// Area in square meters: outer ring minus holes.
    pub fn area(&self) -> f64 {
        let outer = ring_area(self.outer()).abs();
        let holes: f64 = self.holes().iter().map(|h| ring_area(h).abs()).sum();
        outer - holes
    }
}

fn invalid() -> JobError {
    JobError::InvalidGeometry(INVALID_POLYGON.to_string())
}

fn parse_ring(ring: &Value) -> Result<Vec<Position>, JobError> {
    ring.as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|pos| {
            let coords = pos.as_array().ok_or_else(invalid)?;
            match (
                coords.first().and_then(Value::as_f64),
                coords.get(1).and_then(Value::as_f64),
            ) {
                (Some(lon), Some(lat)) => Ok([lon, lat]),
                _ => Err(invalid()),
            }
        })
        .collect()
}

/// Signed area of a ring on a sphere.
///
/// Chamberlain & Duquette, "Some Algorithms for Polygons on a Sphere",
/// JPL Publication 07-03.
pub fn ring_area(ring: &[Position]) -> f64 {
    let n = ring.len();
    if n <= 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        let (lower, middle, upper) = if i == n - 2 {
            (n - 2, n - 1, 0)
        } else if i == n - 1 {
            (n - 1, 0, 1)
        } else {
            (i, i + 1, i + 2)
        };
        let p1 = ring[lower];
        let p2 = ring[middle];
        let p3 = ring[upper];
        total += (p3[0].to_radians() - p1[0].to_radians()) * p2[1].to_radians().sin();
    }

    total * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0,0],[0,0.009],[0.009,0.009],[0.009,0],[0,0]]]
        },
        "properties": {}
    }"#;

    #[test]
    fn square_kilometer_is_about_one_million_square_meters() {
        let area = Polygon::parse(SQUARE).unwrap().area();
        assert!(area > 900_000.0 && area < 1_100_000.0, "area = {area}");
    }

    #[test]
    fn bare_geometry_is_accepted() {
        let poly = Polygon::parse(
            r#"{"type":"Polygon","coordinates":[[[0,0],[0,1],[1,1],[1,0],[0,0]]]}"#,
        )
        .unwrap();
        assert_eq!(poly.vertices().len(), 4);
    }

    #[test]
    fn hole_is_subtracted() {
        let with_hole = Polygon::parse(
            r#"{"type":"Polygon","coordinates":[
                [[0,0],[0,0.009],[0.009,0.009],[0.009,0],[0,0]],
                [[0.003,0.003],[0.003,0.006],[0.006,0.006],[0.006,0.003],[0.003,0.003]]
            ]}"#,
        )
        .unwrap();
        let solid = Polygon::parse(SQUARE).unwrap();
        assert!(with_hole.area() < solid.area());
    }

    #[test]
    fn short_or_wrong_geometries_are_rejected() {
        for doc in [
            r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[]]},"properties":{}}"#,
            r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[]}}"#,
            r#"{"type":"Polygon","coordinates":[[[0,0],[0,1],[0,0]]]}"#,
            r#"{"type":"Point","coordinates":[0,0]}"#,
            r#"{"type":"Feature","properties":{}}"#,
        ] {
            match Polygon::parse(doc) {
                Err(JobError::InvalidGeometry(msg)) => assert_eq!(msg, INVALID_POLYGON),
                other => panic!("expected invalid geometry for {doc}, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_json_is_invalid_geometry() {
        assert!(matches!(
            Polygon::parse("not json"),
            Err(JobError::InvalidGeometry(_))
        ));
    }
}
