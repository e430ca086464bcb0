//! Mesh gradient description tree and control-point grid builder
//!
//! An `m`-row by `n`-column mesh expands into a `(3m+1)x(3n+1)` grid of cubic
//! Bezier control points plus an `(m+1)x(n+1)` grid of corner colors. Every
//! 4x4 block of points starting at `(3i, 3j)` is one tensor patch; the four
//! interior points of each patch are never part of the source description and
//! are always synthesized from the twelve boundary points.
use crate::{
    parse_transform_list, BBox, Color, EdgePath, Point, Scalar, SvgParserError, Transform,
};
use std::fmt;

/// Coordinate system the gradient geometry is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Units {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "objectBoundingBox"))]
    ObjectBoundingBox,
    #[cfg_attr(feature = "serde", serde(rename = "userSpaceOnUse"))]
    UserSpaceOnUse,
}

/// Mesh gradient description with style values already resolved
///
/// This is the input contract: the embedding layer resolves ids, inherited
/// attributes and computed styles, and hands over plain colors and path
/// strings.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MeshGradient {
    pub id: String,
    /// Mesh origin, the grid point (0, 0)
    pub x: Scalar,
    pub y: Scalar,
    #[cfg_attr(feature = "serde", serde(rename = "gradientUnits"))]
    pub units: Units,
    #[cfg_attr(feature = "serde", serde(rename = "gradientTransform"))]
    pub transform: Option<String>,
    pub rows: Vec<MeshRow>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshRow {
    pub patches: Vec<MeshPatch>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshPatch {
    pub stops: Vec<MeshStop>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MeshStop {
    /// Edge path (`l`/`L`/`c`/`C`), absent for a fully shared edge
    pub path: Option<String>,
    pub color: Option<Color>,
    /// Stop opacity in the `0..=1` range, full opacity when absent
    pub opacity: Option<Scalar>,
}

/// Sides of a patch in stop order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// Stops cover sides in order, rows past the first have no top edge
    fn from_stop(row: usize, stop: usize) -> Option<Side> {
        let side = if row == 0 { stop } else { stop + 1 };
        match side {
            0 => Some(Side::Top),
            1 => Some(Side::Right),
            2 => Some(Side::Bottom),
            3 => Some(Side::Left),
            _ => None,
        }
    }
}

impl MeshGradient {
    /// Find a gradient by id
    ///
    /// A missing id aborts processing of the one shape referencing it, other
    /// gradients in the document are unaffected.
    pub fn find<'a>(gradients: &'a [MeshGradient], id: &str) -> Result<&'a Self, MeshError> {
        gradients
            .iter()
            .find(|gradient| gradient.id == id)
            .ok_or_else(|| MeshError::NotFound { id: id.to_string() })
    }

    /// Build the control-point and corner-color grids
    ///
    /// Best effort: recoverable problems (malformed edge paths, missing
    /// stops, ragged rows) are reported in the error list while the rest of
    /// the mesh is still built. The caller decides whether a partial mesh is
    /// worth painting.
    pub fn build(&self) -> (Mesh, Vec<MeshError>) {
        let mut errors = Vec::new();
        let rows = self.rows.len();
        let cols = self.rows.first().map_or(0, |row| row.patches.len());
        let mut mesh = Mesh::new(rows, cols, Point::new(self.x, self.y));

        for (i, row) in self.rows.iter().enumerate() {
            if row.patches.len() != cols {
                tracing::warn!(
                    row = i,
                    expected = cols,
                    found = row.patches.len(),
                    "ragged mesh row"
                );
                errors.push(MeshError::RaggedRow {
                    row: i,
                    expected: cols,
                    found: row.patches.len(),
                });
            }
            for (j, patch) in row.patches.iter().enumerate().take(cols) {
                self.build_patch(&mut mesh, &mut errors, i, j, patch);
            }
        }

        for i in 0..rows {
            for j in 0..cols {
                if !mesh.patch_is_finite(i, j) {
                    tracing::warn!(row = i, col = j, "degenerate patch, will not be painted");
                    errors.push(MeshError::DegenerateGeometry { row: i, col: j });
                }
            }
        }
        (mesh, errors)
    }

    fn build_patch(
        &self,
        mesh: &mut Mesh,
        errors: &mut Vec<MeshError>,
        i: usize,
        j: usize,
        patch: &MeshPatch,
    ) {
        // first patch of the mesh carries all four edges, later patches share
        // the top edge with the row above and the left edge with the previous
        // patch in the row
        let expected = 4 - usize::from(i > 0) - usize::from(j > 0);
        if patch.stops.len() < expected {
            errors.push(MeshError::MissingStops {
                row: i,
                col: j,
                expected,
                found: patch.stops.len(),
            });
        }

        for (k, stop) in patch.stops.iter().enumerate() {
            let side = match Side::from_stop(i, k) {
                Some(side) => side,
                None => {
                    errors.push(MeshError::UnexpectedStop {
                        row: i,
                        col: j,
                        stop: k,
                    });
                    break;
                }
            };

            let edge = match &stop.path {
                None => None,
                Some(text) => match EdgePath::parse(text) {
                    Ok(edge) => Some(edge),
                    Err(error) => {
                        tracing::warn!(
                            row = i,
                            col = j,
                            stop = k,
                            "bad edge path: {}",
                            error
                        );
                        errors.push(MeshError::EdgePath {
                            row: i,
                            col: j,
                            stop: k,
                            error,
                        });
                        None
                    }
                },
            };
            if let Err(error) = mesh.set_edge(i, j, side, edge) {
                errors.push(error);
            }

            // colors are claimed once per shared corner: the first stop of
            // every patch except the very first one re-traces a corner that
            // is already colored
            if (i == 0 && j == 0) || k > 0 {
                match stop.color {
                    Some(color) => {
                        let color = match stop.opacity {
                            Some(opacity) => color.with_opacity(opacity),
                            None => color,
                        };
                        mesh.set_corner_color(i, j, side, color);
                    }
                    None => errors.push(MeshError::MissingColor {
                        row: i,
                        col: j,
                        stop: k,
                    }),
                }
            }
        }

        mesh.set_tensor_points(i, j);
    }
}

/// Built mesh: dense control-point grid plus corner-color grid
///
/// Built once per gradient reference, optionally moved between coordinate
/// spaces, then consumed read-only by painting.
#[derive(Debug, Clone)]
pub struct Mesh {
    rows: usize,
    cols: usize,
    /// `(3 * rows + 1) x (3 * cols + 1)` Bezier control points, row-major
    nodes: Vec<Point>,
    /// `(rows + 1) x (cols + 1)` corner colors, row-major
    colors: Vec<Color>,
}

impl Mesh {
    fn new(rows: usize, cols: usize, origin: Point) -> Self {
        let node_width = 3 * cols + 1;
        let node_height = 3 * rows + 1;
        let mut nodes = vec![Point::default(); node_width * node_height];
        nodes[0] = origin;
        Self {
            rows,
            cols,
            nodes,
            colors: vec![Color::default(); (rows + 1) * (cols + 1)],
        }
    }

    /// Number of patch rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of patch columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Control point at grid position `(row, col)`
    pub fn node(&self, row: usize, col: usize) -> Point {
        self.nodes[row * (3 * self.cols + 1) + col]
    }

    fn node_mut(&mut self, row: usize, col: usize) -> &mut Point {
        &mut self.nodes[row * (3 * self.cols + 1) + col]
    }

    /// Corner color at color-grid position `(row, col)`
    pub fn color(&self, row: usize, col: usize) -> Color {
        self.colors[row * (self.cols + 1) + col]
    }

    fn set_corner_color(&mut self, i: usize, j: usize, side: Side, color: Color) {
        let (row, col) = match side {
            Side::Top => (i, j),
            Side::Right => (i, j + 1),
            Side::Bottom => (i + 1, j + 1),
            Side::Left => (i + 1, j),
        };
        self.colors[row * (self.cols + 1) + col] = color;
    }

    /// Write one boundary edge of patch `(i, j)` into the grid
    ///
    /// `None` is an implicit straight edge: legal only where both endpoints
    /// are already determined by neighbouring edges.
    fn set_edge(
        &mut self,
        i: usize,
        j: usize,
        side: Side,
        edge: Option<EdgePath>,
    ) -> Result<(), MeshError> {
        // interior control points of a straight edge approximate the line
        // with a cubic
        fn w_avg(p0: Point, p1: Point) -> Point {
            (2.0 / 3.0) * p0 + (1.0 / 3.0) * p1
        }
        let undefined = |stop_side: Side| MeshError::UndefinedEdge {
            row: i,
            col: j,
            side: format!("{:?}", stop_side),
        };
        let (r, c) = (3 * i, 3 * j);

        match side {
            Side::Top => {
                let start = self.node(r, c);
                match edge {
                    Some(EdgePath::Line { relative, point }) => {
                        let end = if relative { point + start } else { point };
                        *self.node_mut(r, c + 3) = end;
                        *self.node_mut(r, c + 1) = w_avg(start, end);
                        *self.node_mut(r, c + 2) = w_avg(end, start);
                    }
                    Some(EdgePath::Cubic { relative, points }) => {
                        let base = if relative { start } else { Point::default() };
                        *self.node_mut(r, c + 1) = points[0] + base;
                        *self.node_mut(r, c + 2) = points[1] + base;
                        *self.node_mut(r, c + 3) = points[2] + base;
                    }
                    None => return Err(undefined(side)),
                }
            }
            Side::Right => {
                let start = self.node(r, c + 3);
                match edge {
                    Some(EdgePath::Line { relative, point }) => {
                        let end = if relative { point + start } else { point };
                        *self.node_mut(r + 3, c + 3) = end;
                        *self.node_mut(r + 1, c + 3) = w_avg(start, end);
                        *self.node_mut(r + 2, c + 3) = w_avg(end, start);
                    }
                    Some(EdgePath::Cubic { relative, points }) => {
                        let base = if relative { start } else { Point::default() };
                        *self.node_mut(r + 1, c + 3) = points[0] + base;
                        *self.node_mut(r + 2, c + 3) = points[1] + base;
                        *self.node_mut(r + 3, c + 3) = points[2] + base;
                    }
                    None => return Err(undefined(side)),
                }
            }
            Side::Bottom => {
                // bottom edge runs right-to-left; its endpoint is only
                // written in the first column, later columns share it with
                // the previous patch
                let start = self.node(r + 3, c + 3);
                match edge {
                    Some(EdgePath::Line { relative, point }) => {
                        if j == 0 {
                            let end = if relative { point + start } else { point };
                            *self.node_mut(r + 3, c) = end;
                        }
                        let (p0, p1) = (self.node(r + 3, c), self.node(r + 3, c + 3));
                        *self.node_mut(r + 3, c + 1) = w_avg(p0, p1);
                        *self.node_mut(r + 3, c + 2) = w_avg(p1, p0);
                    }
                    Some(EdgePath::Cubic { relative, points }) => {
                        let base = if relative { start } else { Point::default() };
                        *self.node_mut(r + 3, c + 2) = points[0] + base;
                        *self.node_mut(r + 3, c + 1) = points[1] + base;
                        if j == 0 {
                            *self.node_mut(r + 3, c) = points[2] + base;
                        }
                    }
                    None => {
                        if j == 0 {
                            return Err(undefined(side));
                        }
                        let (p0, p1) = (self.node(r + 3, c), self.node(r + 3, c + 3));
                        *self.node_mut(r + 3, c + 1) = w_avg(p0, p1);
                        *self.node_mut(r + 3, c + 2) = w_avg(p1, p0);
                    }
                }
            }
            Side::Left => {
                // both endpoints always exist by the time the left edge is
                // reached, only the interior points are written
                let start = self.node(r + 3, c);
                match edge {
                    Some(EdgePath::Cubic { relative, points }) => {
                        let base = if relative { start } else { Point::default() };
                        *self.node_mut(r + 2, c) = points[0] + base;
                        *self.node_mut(r + 1, c) = points[1] + base;
                    }
                    Some(EdgePath::Line { .. }) | None => {
                        let (top, bottom) = (self.node(r, c), self.node(r + 3, c));
                        *self.node_mut(r + 1, c) = w_avg(top, bottom);
                        *self.node_mut(r + 2, c) = w_avg(bottom, top);
                    }
                }
            }
        }
        Ok(())
    }

    /// Synthesize the four interior tensor points of patch `(i, j)`
    ///
    /// Standard Coons-to-tensor-patch conversion; the exact coefficients
    /// matter for visual parity with native renderers.
    fn set_tensor_points(&mut self, i: usize, j: usize) {
        let (r, c) = (3 * i, 3 * j);
        let n = |dr: usize, dc: usize| self.node(r + dr, c + dc);

        let inner11 = (-4.0 * n(0, 0) + 6.0 * (n(0, 1) + n(1, 0)) - 2.0 * (n(0, 3) + n(3, 0))
            + 3.0 * (n(3, 1) + n(1, 3))
            - n(3, 3))
            / 9.0;
        let inner12 = (-4.0 * n(0, 3) + 6.0 * (n(0, 2) + n(1, 3)) - 2.0 * (n(0, 0) + n(3, 3))
            + 3.0 * (n(3, 2) + n(1, 0))
            - n(3, 0))
            / 9.0;
        let inner21 = (-4.0 * n(3, 0) + 6.0 * (n(3, 1) + n(2, 0)) - 2.0 * (n(3, 3) + n(0, 0))
            + 3.0 * (n(0, 1) + n(2, 3))
            - n(0, 3))
            / 9.0;
        let inner22 = (-4.0 * n(3, 3) + 6.0 * (n(3, 2) + n(2, 3)) - 2.0 * (n(3, 0) + n(0, 3))
            + 3.0 * (n(0, 2) + n(2, 0))
            - n(0, 0))
            / 9.0;

        *self.node_mut(r + 1, c + 1) = inner11;
        *self.node_mut(r + 1, c + 2) = inner12;
        *self.node_mut(r + 2, c + 1) = inner21;
        *self.node_mut(r + 2, c + 2) = inner22;
    }

    /// All control points and corner colors of patch `(i, j)` are finite
    pub(crate) fn patch_is_finite(&self, i: usize, j: usize) -> bool {
        let nodes = (0..4).all(|dr| (0..4).all(|dc| self.node(3 * i + dr, 3 * j + dc).is_finite()));
        let colors = (0..2).all(|dr| (0..2).all(|dc| self.color(i + dr, j + dc).is_finite()));
        nodes && colors
    }

    /// Add `delta` to every control point, colors are untouched
    pub fn translate(&mut self, delta: Point) {
        for node in self.nodes.iter_mut() {
            *node = *node + delta;
        }
    }

    /// Multiply every control point component-wise by `factor`
    pub fn scale(&mut self, factor: Point) {
        for node in self.nodes.iter_mut() {
            *node = *node * factor;
        }
    }

    /// Apply an affine transformation to every control point
    pub fn transform(&mut self, tr: Transform) {
        for node in self.nodes.iter_mut() {
            *node = tr.apply(*node);
        }
    }

    /// Move the mesh from gradient coordinate space into raster space
    ///
    /// Fixed policy order: bounding-box scale (objectBoundingBox units only),
    /// then the gradient transform, then translation of user-space
    /// coordinates to the raster origin (userSpaceOnUse units only).
    pub fn to_raster_space(
        &mut self,
        units: Units,
        gradient_transform: Option<&str>,
        bbox: BBox,
    ) -> Vec<SvgParserError> {
        if units == Units::ObjectBoundingBox {
            self.scale(Point::new(bbox.width(), bbox.height()));
        }
        let mut errors = Vec::new();
        if let Some(text) = gradient_transform {
            let (tr, tr_errors) = parse_transform_list(text);
            errors = tr_errors;
            self.transform(tr);
        }
        if units == Units::UserSpaceOnUse {
            self.translate(Point::new(-bbox.x(), -bbox.y()));
        }
        errors
    }

    /// Bounding box of all control points, `None` for an empty mesh
    pub fn bbox(&self) -> Option<BBox> {
        self.nodes
            .iter()
            .filter(|node| node.is_finite())
            .fold(None, |bbox, node| Some(BBox::extend_opt(bbox, *node)))
    }
}

/// Error while building a mesh
#[derive(Debug)]
pub enum MeshError {
    /// Referenced gradient id does not exist
    NotFound { id: String },
    /// Row with a patch count different from the first row
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Patch with fewer stops than its position requires
    MissingStops {
        row: usize,
        col: usize,
        expected: usize,
        found: usize,
    },
    /// Stop past the last edge of its patch
    UnexpectedStop { row: usize, col: usize, stop: usize },
    /// Malformed stop `path` attribute
    EdgePath {
        row: usize,
        col: usize,
        stop: usize,
        error: SvgParserError,
    },
    /// Implicit edge whose endpoint is not determined by earlier edges
    UndefinedEdge {
        row: usize,
        col: usize,
        side: String,
    },
    /// Corner-defining stop without a resolved color
    MissingColor { row: usize, col: usize, stop: usize },
    /// Non-finite control points or colors, the patch is skipped by painting
    DegenerateGeometry { row: usize, col: usize },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::NotFound { id } => write!(f, "mesh gradient not found: {:?}", id),
            MeshError::RaggedRow {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} patches, expected {}",
                row, found, expected
            ),
            MeshError::MissingStops {
                row,
                col,
                expected,
                found,
            } => write!(
                f,
                "patch ({}, {}) has {} stops, expected {}",
                row, col, found, expected
            ),
            MeshError::UnexpectedStop { row, col, stop } => {
                write!(f, "patch ({}, {}) stop {} has no edge to define", row, col, stop)
            }
            MeshError::EdgePath {
                row,
                col,
                stop,
                error,
            } => write!(
                f,
                "patch ({}, {}) stop {} edge path: {}",
                row, col, stop, error
            ),
            MeshError::UndefinedEdge { row, col, side } => write!(
                f,
                "patch ({}, {}) {} edge has no path and no known endpoint",
                row, col, side
            ),
            MeshError::MissingColor { row, col, stop } => {
                write!(f, "patch ({}, {}) stop {} has no color", row, col, stop)
            }
            MeshError::DegenerateGeometry { row, col } => {
                write!(f, "patch ({}, {}) has non-finite geometry", row, col)
            }
        }
    }
}

impl std::error::Error for MeshError {}
