//! GeoJSON reader keeping the third coordinate as Z
//!
//! Accepts a FeatureCollection, a single Feature or a bare Geometry. A
//! feature gets Z values only if every one of its positions has a third
//! element; otherwise `Feature::z` is `None` and the interpolation rejects it.

use std::path::Path;

use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue, Value};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};

/// Read a GeoJSON file
pub fn read_features_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_features_geojson(&text)
}

/// Parse a GeoJSON document into features
pub fn parse_features_geojson(text: &str) -> Result<FeatureCollection> {
    let doc = text
        .parse::<GeoJson>()
        .map_err(|e| Error::GeoJson(e.to_string()))?;

    match doc {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .enumerate()
            .map(|(index, f)| convert_feature(index, f.geometry.map(|g| g.value), f.properties, f.id))
            .collect(),
        GeoJson::Feature(f) => {
            let feature = convert_feature(0, f.geometry.map(|g| g.value), f.properties, f.id)?;
            Ok(std::iter::once(feature).collect())
        }
        GeoJson::Geometry(g) => {
            let feature = convert_feature(0, Some(g.value), None, None)?;
            Ok(std::iter::once(feature).collect())
        }
    }
}

/// Accumulates XY coordinates and Z values in geometry order.
struct ZCollector {
    z: Vec<f64>,
    complete: bool,
    feature: usize,
}

impl ZCollector {
    fn new(feature: usize) -> Self {
        Self {
            z: Vec::new(),
            complete: true,
            feature,
        }
    }

    fn coord(&mut self, pos: &[f64]) -> Result<Coord<f64>> {
        if pos.len() < 2 {
            return Err(Error::GeoJson(format!(
                "feature {}: position needs at least 2 elements, got {}",
                self.feature,
                pos.len()
            )));
        }
        match pos.get(2) {
            Some(&z) => self.z.push(z),
            None => self.complete = false,
        }
        Ok(Coord { x: pos[0], y: pos[1] })
    }

    fn line(&mut self, positions: &[Vec<f64>]) -> Result<LineString<f64>> {
        positions
            .iter()
            .map(|p| self.coord(p))
            .collect::<Result<Vec<_>>>()
            .map(LineString::new)
    }

    /// Rings are closed explicitly so geo-types does not add an
    /// unpaired closing coordinate.
    fn ring(&mut self, positions: &[Vec<f64>]) -> Result<LineString<f64>> {
        let closed = positions.len() > 1 && positions.first() == positions.last();
        let mut ring = self.line(positions)?;
        if !closed {
            if let Some(first) = positions.first() {
                let c = self.coord(first)?;
                ring.0.push(c);
            }
        }
        Ok(ring)
    }

    fn polygon(&mut self, rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
        let mut iter = rings.iter();
        let exterior = match iter.next() {
            Some(r) => self.ring(r)?,
            None => LineString::new(Vec::new()),
        };
        let interiors = iter.map(|r| self.ring(r)).collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    fn geometry(&mut self, value: &Value) -> Result<Geometry<f64>> {
        Ok(match value {
            Value::Point(pos) => Geometry::Point(Point(self.coord(pos)?)),
            Value::MultiPoint(positions) => {
                let points = positions
                    .iter()
                    .map(|p| self.coord(p).map(Point))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiPoint(MultiPoint::new(points))
            }
            Value::LineString(positions) => Geometry::LineString(self.line(positions)?),
            Value::MultiLineString(lines) => {
                let lines = lines
                    .iter()
                    .map(|l| self.line(l))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiLineString(MultiLineString::new(lines))
            }
            Value::Polygon(rings) => Geometry::Polygon(self.polygon(rings)?),
            Value::MultiPolygon(polygons) => {
                let polys = polygons
                    .iter()
                    .map(|p| self.polygon(p))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiPolygon(MultiPolygon::new(polys))
            }
            Value::GeometryCollection(members) => {
                let members = members
                    .iter()
                    .map(|g| self.geometry(&g.value))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::GeometryCollection(GeometryCollection::new_from(members))
            }
        })
    }
}

fn convert_feature(
    index: usize,
    geometry: Option<Value>,
    properties: Option<JsonObject>,
    id: Option<Id>,
) -> Result<Feature> {
    let mut feature = match &geometry {
        Some(value) => {
            let mut zc = ZCollector::new(index);
            let geometry = zc.geometry(value)?;
            let mut f = Feature::new(geometry);
            f.z = zc.complete.then_some(zc.z);
            f
        }
        None => Feature::empty(),
    };

    feature.id = id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    for (key, value) in properties.unwrap_or_default() {
        feature.set_property(key, attribute(value));
    }

    Ok(feature)
}

fn attribute(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}
