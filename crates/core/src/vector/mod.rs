//! Vector features carrying elevation (Z) values
//!
//! `geo-types` geometries are two-dimensional, so each [`Feature`] keeps its
//! Z values alongside the geometry, one per coordinate, in the order the
//! coordinates appear in [`Feature::paths`].

use geo_types::{Coord, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Whether a path is a standalone point or part of a linear structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Isolated point(s): Point or MultiPoint members
    Points,
    /// A connected vertex sequence: line string or polygon ring
    Line,
}

/// One connected coordinate sequence of a feature, with its Z values.
#[derive(Debug, Clone, PartialEq)]
pub struct ZPath {
    pub kind: PathKind,
    pub coords: Vec<Coord<f64>>,
    pub z: Vec<f64>,
}

/// A geographic feature with a 2D geometry, per-coordinate Z values and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    /// Z value per coordinate; `None` when the source had no Z dimension
    pub z: Option<Vec<f64>>,
    pub properties: HashMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    /// Create a feature without Z values
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            z: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with one Z value per coordinate
    pub fn with_z(geometry: impl Into<Geometry<f64>>, z: Vec<f64>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            z: Some(z),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            z: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Whether the feature carries a finite Z value for every coordinate.
    pub fn has_z(&self) -> bool {
        match (&self.geometry, &self.z) {
            (None, _) => true,
            (Some(geom), Some(z)) => {
                z.len() == coordinate_count(geom) && z.iter().all(|v| v.is_finite())
            }
            (Some(_), None) => false,
        }
    }

    /// Split the geometry into connected paths and pair every coordinate
    /// with its Z value.
    ///
    /// `index` is the feature's position in its collection, used in errors.
    pub fn paths(&self, index: usize) -> Result<Vec<ZPath>> {
        let Some(geometry) = &self.geometry else {
            return Ok(Vec::new());
        };
        let z = self.z.as_ref().ok_or(Error::MissingZ { feature: index })?;

        let expected = coordinate_count(geometry);
        if z.len() != expected {
            return Err(Error::ZCountMismatch {
                feature: index,
                expected,
                found: z.len(),
            });
        }
        if z.iter().any(|v| !v.is_finite()) {
            return Err(Error::MissingZ { feature: index });
        }

        let mut parts = Vec::new();
        collect_parts(geometry, index, &mut parts)?;

        let mut offset = 0;
        Ok(parts
            .into_iter()
            .map(|(kind, coords)| {
                let end = offset + coords.len();
                let path = ZPath {
                    kind,
                    z: z[offset..end].to_vec(),
                    coords,
                };
                offset = end;
                path
            })
            .collect())
    }
}

/// Number of coordinates in `paths` order.
pub fn coordinate_count(geometry: &Geometry<f64>) -> usize {
    let mut parts = Vec::new();
    match collect_parts(geometry, 0, &mut parts) {
        Ok(()) => parts.iter().map(|(_, c)| c.len()).sum(),
        Err(_) => 0,
    }
}

fn collect_parts(
    geometry: &Geometry<f64>,
    feature: usize,
    parts: &mut Vec<(PathKind, Vec<Coord<f64>>)>,
) -> Result<()> {
    match geometry {
        Geometry::Point(p) => parts.push((PathKind::Points, vec![p.0])),
        Geometry::MultiPoint(mp) => {
            parts.push((PathKind::Points, mp.0.iter().map(|p| p.0).collect()));
        }
        Geometry::Line(l) => parts.push((PathKind::Line, vec![l.start, l.end])),
        Geometry::LineString(ls) => parts.push((PathKind::Line, ls.0.clone())),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                parts.push((PathKind::Line, ls.0.clone()));
            }
        }
        Geometry::Polygon(poly) => {
            parts.push((PathKind::Line, poly.exterior().0.clone()));
            for ring in poly.interiors() {
                parts.push((PathKind::Line, ring.0.clone()));
            }
        }
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                collect_parts(&Geometry::Polygon(poly.clone()), feature, parts)?;
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_parts(g, feature, parts)?;
            }
        }
        Geometry::Rect(_) | Geometry::Triangle(_) => {
            return Err(Error::UnsupportedGeometry {
                feature,
                reason: "Rect and Triangle carry no vertex order for Z values".into(),
            });
        }
    }
    Ok(())
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Index of the first feature without complete Z values
    pub fn first_without_z(&self) -> Option<usize> {
        self.features.iter().position(|f| !f.has_z())
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
