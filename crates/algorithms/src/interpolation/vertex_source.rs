//! Sample vertex extraction from Z-valued features

use geo_types::Coord;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zgrid_core::vector::{FeatureCollection, PathKind, ZPath};
use zgrid_core::{Error, Extent, Result};

use super::breaklines::BreakSegment;
use super::{Vertex, VertexKind};

/// How the geometries of an input layer are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// Every coordinate is an independent sample
    #[default]
    Points,
    /// Lines whose vertices are samples, kept in path order
    StructureLines,
    /// Lines that are samples and also block interpolation across them
    BreakLines,
}

impl InputType {
    /// Map the selection codes 0 (points), 1 (structure lines), 2 (break lines).
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0 => Ok(InputType::Points),
            1 => Ok(InputType::StructureLines),
            2 => Ok(InputType::BreakLines),
            _ => Err(Error::InvalidParameter {
                name: "layer_type",
                value: index.to_string(),
                reason: "expected 0 (points), 1 (structure lines) or 2 (break lines)".into(),
            }),
        }
    }

    fn vertex_kind(self) -> VertexKind {
        match self {
            InputType::Points => VertexKind::Point,
            InputType::StructureLines => VertexKind::StructureLine,
            InputType::BreakLines => VertexKind::BreakLine,
        }
    }
}

/// One input layer: its features and how to read them.
#[derive(Debug, Clone, Copy)]
pub struct LayerInput<'a> {
    pub features: &'a FeatureCollection,
    pub input_type: InputType,
}

impl<'a> LayerInput<'a> {
    pub fn new(features: &'a FeatureCollection, input_type: InputType) -> Self {
        Self {
            features,
            input_type,
        }
    }
}

/// Extracted sample vertices and the break segments derived from them.
#[derive(Debug, Clone, Default)]
pub struct VertexSet {
    vertices: Vec<Vertex>,
    breaks: Vec<BreakSegment>,
}

impl VertexSet {
    /// Build a set from vertices, deriving break segments from consecutive
    /// `BreakLine` vertices that share a line id.
    pub fn from_vertices(vertices: Vec<Vertex>) -> Self {
        let breaks = vertices
            .windows(2)
            .filter_map(|w| {
                let (a, b) = (&w[0], &w[1]);
                match (a.kind, b.kind, a.line_id, b.line_id) {
                    (VertexKind::BreakLine, VertexKind::BreakLine, Some(la), Some(lb)) if la == lb => {
                        Some(BreakSegment::new(a.x, a.y, b.x, b.y, la))
                    }
                    _ => None,
                }
            })
            .collect();
        Self { vertices, breaks }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn breaks(&self) -> &[BreakSegment] {
        &self.breaks
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Bounding box of the vertices, padded by `pad` on a collapsed axis
    pub fn extent(&self, pad: f64) -> Result<Extent> {
        Extent::enclosing(self.vertices.iter().map(|v| (v.x, v.y)), pad)
    }
}

/// Turns feature layers into a [`VertexSet`].
#[derive(Debug, Clone, Default)]
pub struct VertexSource {
    densify_spacing: Option<f64>,
}

impl VertexSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert interpolated vertices so consecutive line vertices are at
    /// most `spacing` apart. Point layers are unaffected.
    pub fn with_densify_spacing(mut self, spacing: f64) -> Self {
        self.densify_spacing = Some(spacing);
        self
    }

    /// Extract the vertices of a single layer.
    pub fn extract(&self, features: &FeatureCollection, input_type: InputType) -> Result<VertexSet> {
        self.extract_layers(&[LayerInput::new(features, input_type)])
    }

    /// Extract the vertices of several layers into one set.
    ///
    /// Every feature of every layer is checked for Z values before any
    /// vertex is produced. Errors name a feature by its position across
    /// all layers, counted in layer order.
    pub fn extract_layers(&self, layers: &[LayerInput<'_>]) -> Result<VertexSet> {
        if let Some(spacing) = self.densify_spacing {
            if !(spacing.is_finite() && spacing > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "densify_spacing",
                    value: spacing.to_string(),
                    reason: "must be a positive number".into(),
                });
            }
        }

        let features = layers
            .iter()
            .flat_map(|layer| layer.features.iter().map(move |f| (layer.input_type, f)));

        let mut checked: Vec<(InputType, Vec<ZPath>)> = Vec::new();
        for (index, (input_type, feature)) in features.enumerate() {
            let paths = feature.paths(index)?;
            if input_type != InputType::Points && paths.iter().any(|p| p.kind == PathKind::Points) {
                return Err(Error::UnsupportedGeometry {
                    feature: index,
                    reason: "point geometry in a line layer".into(),
                });
            }
            checked.push((input_type, paths));
        }

        let mut vertices = Vec::new();
        let mut breaks = Vec::new();
        let mut next_line: u32 = 0;

        for (input_type, paths) in checked {
            for path in paths {
                match input_type {
                    InputType::Points => {
                        vertices.extend(
                            path.coords
                                .iter()
                                .zip(&path.z)
                                .map(|(c, &z)| Vertex::point(c.x, c.y, z)),
                        );
                    }
                    InputType::StructureLines | InputType::BreakLines => {
                        let line_id = next_line;
                        next_line += 1;
                        self.push_line(&path, input_type, line_id, &mut vertices);
                        if input_type == InputType::BreakLines {
                            breaks.extend(path.coords.windows(2).map(|w| {
                                BreakSegment::new(w[0].x, w[0].y, w[1].x, w[1].y, line_id)
                            }));
                        }
                    }
                }
            }
        }

        debug!(
            "Extracted {} vertices, {} lines, {} break segments",
            vertices.len(),
            next_line,
            breaks.len()
        );

        Ok(VertexSet { vertices, breaks })
    }

    fn push_line(&self, path: &ZPath, input_type: InputType, line_id: u32, out: &mut Vec<Vertex>) {
        let kind = input_type.vertex_kind();
        let vertex = |c: Coord<f64>, z: f64| Vertex::on_line(c.x, c.y, z, kind, line_id);

        let Some((&first, &first_z)) = path.coords.first().zip(path.z.first()) else {
            return;
        };
        out.push(vertex(first, first_z));

        for (w, zw) in path.coords.windows(2).zip(path.z.windows(2)) {
            let (a, b) = (w[0], w[1]);
            if let Some(spacing) = self.densify_spacing {
                let length = (b.x - a.x).hypot(b.y - a.y);
                let steps = (length / spacing).ceil() as usize;
                for i in 1..steps {
                    let t = i as f64 / steps as f64;
                    let c = Coord {
                        x: a.x + t * (b.x - a.x),
                        y: a.y + t * (b.y - a.y),
                    };
                    out.push(vertex(c, zw[0] + t * (zw[1] - zw[0])));
                }
            }
            out.push(vertex(b, zw[1]));
        }
    }
}
